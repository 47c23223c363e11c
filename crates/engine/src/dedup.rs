//! explored-position set shared by every task of one evaluation
//! keyed by the empty-hole mask; an insert stores all symmetry images at once

use parking_lot::RwLock;
use pegsol_core::{Board, Symmetry};
use rustc_hash::FxHashSet;

/// Positions already handed to a search task during the current evaluation.
///
/// Lookups take the shared lock and never block each other. `add` computes
/// the six images first and publishes them under a single exclusive lock, so
/// a concurrent `contains` sees either none or all of them.
#[derive(Default)]
pub struct DedupCache {
    seen: RwLock<FxHashSet<u64>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match on the empty-hole set. Symmetric images match because
    /// `add` stored them.
    #[inline]
    pub fn contains(&self, board: &Board) -> bool {
        self.seen.read().contains(&board.empty_mask())
    }

    pub fn add(&self, board: &Board) {
        let key = board.empty_mask();
        let images = Symmetry::ALL.map(|sym| sym.apply_mask(key));
        let mut seen = self.seen.write();
        seen.extend(images);
    }

    /// Atomically check and record. Returns `true` when the board was new.
    pub fn insert_if_absent(&self, board: &Board) -> bool {
        let key = board.empty_mask();
        if self.seen.read().contains(&key) {
            return false;
        }
        let images = Symmetry::ALL.map(|sym| sym.apply_mask(key));
        let mut seen = self.seen.write();
        if seen.contains(&key) {
            return false;
        }
        seen.extend(images);
        true
    }

    /// Number of stored keys (images included).
    pub fn len(&self) -> usize {
        self.seen.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.read().is_empty()
    }

    pub fn clear(&self) {
        self.seen.write().clear();
    }
}

impl std::fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache").field("len", &self.len()).finish()
    }
}
