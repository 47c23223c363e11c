//! pegsol-engine - jump generation and the parallel winnability search.
//!
//! Provides move generation, jump application, the per-evaluation dedup
//! cache and the fork-join search driven by [`Solver`].

pub mod apply;
pub mod config;
pub mod dedup;
pub mod error;
pub mod movegen;
pub mod search;
pub mod solver;

pub use apply::{apply_move, is_solved, unapply_move};
pub use config::SearchConfig;
pub use dedup::DedupCache;
pub use error::EngineError;
pub use movegen::{count_moves, generate_moves, has_moves, is_valid_move, MoveList};
pub use search::{exhaust, should_exhaust, Outcome, SearchContext, SearchStats, SearchTask};
pub use solver::{winning_suggestions, Solver};
