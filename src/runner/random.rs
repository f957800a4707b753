//! Seeded ordering of sibling contexts and tests.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Permutes sibling lists for one run.
///
/// A randomizer built from the same seed yields the same sequence of
/// permutations for the same sequence of inputs.
pub enum Randomizer {
    Identity,
    Seeded(StdRng),
}

impl Randomizer {
    pub fn seeded(seed: u64) -> Self {
        Randomizer::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Randomizer::Identity,
        }
    }

    pub fn permute<T>(&mut self, items: &mut [T]) {
        if let Randomizer::Seeded(rng) = self {
            items.shuffle(rng);
        }
    }
}

/// Draw a fresh seed for runs that were not given one.
pub fn generate_seed() -> u64 {
    rand::random()
}
