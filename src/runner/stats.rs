//! Per-run statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub contexts: usize,
    pub tests: usize,
    pub assertions: usize,
    pub errors: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub deferred: usize,
    pub ok: bool,
}

impl RunStatistics {
    /// Recompute `ok`. Deferred tests never affect it.
    pub(crate) fn settle(&mut self, fail_on_no_assertions: bool) {
        self.ok = self.errors == 0
            && self.failures == 0
            && self.timeouts == 0
            && (!fail_on_no_assertions || self.assertions > 0);
    }
}
