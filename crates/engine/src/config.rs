use serde::{Deserialize, Serialize};

/// Knobs of the local search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// A task whose board has at most this many jumps is finished with a
    /// sequential depth-first sweep instead of forking.
    pub exhaustive_move_threshold: usize,
    /// Worker threads for the fork-join pool. 0 lets rayon decide.
    pub threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            exhaustive_move_threshold: 3,
            threads: 0,
        }
    }
}

impl SearchConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_exhaustive_move_threshold(mut self, threshold: usize) -> Self {
        self.exhaustive_move_threshold = threshold;
        self
    }
}
