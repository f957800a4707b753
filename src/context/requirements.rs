//! Support requirements gating whether a context runs at all.

use std::fmt;
use std::sync::Arc;

/// A named predicate: either a fixed flag or a probe evaluated at run time.
#[derive(Clone)]
pub enum Requirement {
    Flag(bool),
    Probe(Arc<dyn Fn() -> bool + Send + Sync>),
}

impl Requirement {
    pub fn probe<F: Fn() -> bool + Send + Sync + 'static>(f: F) -> Self {
        Requirement::Probe(Arc::new(f))
    }

    pub fn is_met(&self) -> bool {
        match self {
            Requirement::Flag(flag) => *flag,
            Requirement::Probe(probe) => probe(),
        }
    }
}

impl From<bool> for Requirement {
    fn from(flag: bool) -> Self {
        Requirement::Flag(flag)
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Flag(flag) => write!(f, "Flag({})", flag),
            Requirement::Probe(_) => f.write_str("Probe(..)"),
        }
    }
}

/// Ordered list of named requirements.
pub type RequirementMap = Vec<(String, Requirement)>;

/// Requirements declared on one context.
#[derive(Clone, Debug, Default)]
pub struct SupportRequirements {
    /// Every entry must be met.
    pub all: RequirementMap,
    /// At least one entry must be met.
    pub any: RequirementMap,
}

impl SupportRequirements {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Names of the requirements that prevent the context from running.
    ///
    /// Unmet `all` entries are listed individually; an `any` group with no
    /// met entry contributes all of its names.
    pub fn unmet(&self) -> Vec<String> {
        let mut unmet: Vec<String> = self
            .all
            .iter()
            .filter(|(_, requirement)| !requirement.is_met())
            .map(|(name, _)| name.clone())
            .collect();

        if !self.any.is_empty() && !self.any.iter().any(|(_, r)| r.is_met()) {
            unmet.extend(self.any.iter().map(|(name, _)| name.clone()));
        }
        unmet
    }
}
