//! recursive winnability search - fork-join over children, sequential sweep near the end
//!
//! A task forks one child per jump whose resulting position has not been seen
//! in this evaluation, and answers `true` as soon as any child does. Once a
//! board is down to a handful of jumps, the task switches to an explicit-stack
//! depth-first sweep that skips the cache entirely.

use std::sync::atomic::{AtomicU64, Ordering};

use pegsol_core::{Board, Move};
use rayon::prelude::*;

use crate::apply::apply_move;
use crate::config::SearchConfig;
use crate::dedup::DedupCache;
use crate::movegen::generate_moves;

/// Counters for one evaluation; relaxed, only read for diagnostics.
#[derive(Debug, Default)]
pub struct SearchStats {
    tasks: AtomicU64,
    pruned: AtomicU64,
    exhausted: AtomicU64,
}

impl SearchStats {
    pub fn tasks(&self) -> u64 {
        self.tasks.load(Ordering::Relaxed)
    }

    /// Child positions skipped because the cache already held them.
    pub fn pruned(&self) -> u64 {
        self.pruned.load(Ordering::Relaxed)
    }

    /// Tasks that finished with the sequential sweep.
    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }
}

/// Everything the tasks of one evaluation share. Build a fresh one per
/// evaluation; the cache must never outlive it.
#[derive(Debug)]
pub struct SearchContext {
    pub cache: DedupCache,
    pub stats: SearchStats,
    exhaustive_move_threshold: usize,
}

impl SearchContext {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            cache: DedupCache::new(),
            stats: SearchStats::default(),
            exhaustive_move_threshold: config.exhaustive_move_threshold,
        }
    }
}

/// Result of a top-level task, tagged with the jump it was asked about.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Outcome {
    pub label: Option<Move>,
    pub winnable: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct SearchTask {
    board: Board,
    label: Option<Move>,
}

impl SearchTask {
    /// Top-level task for `mv` played on `parent`.
    pub fn root(parent: &Board, mv: Move) -> Self {
        Self {
            board: apply_move(parent, &mv),
            label: Some(mv),
        }
    }

    /// Top-level task for a board that already has `mv` applied.
    pub fn labeled(board: Board, mv: Move) -> Self {
        Self {
            board,
            label: Some(mv),
        }
    }

    pub fn unlabeled(board: Board) -> Self {
        Self { board, label: None }
    }

    #[inline]
    fn child(board: Board) -> Self {
        Self { board, label: None }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn label(&self) -> Option<Move> {
        self.label
    }

    /// Decide the task. Forks on the current rayon pool.
    pub fn run(&self, ctx: &SearchContext) -> bool {
        ctx.stats.tasks.fetch_add(1, Ordering::Relaxed);
        let moves = generate_moves(&self.board);

        if should_exhaust(&self.board, moves.len(), ctx.exhaustive_move_threshold) {
            ctx.stats.exhausted.fetch_add(1, Ordering::Relaxed);
            return exhaust(self.board);
        }

        let mut children = Vec::with_capacity(moves.len());
        for mv in &moves {
            let next = apply_move(&self.board, mv);
            if ctx.cache.insert_if_absent(&next) {
                children.push(Self::child(next));
            } else {
                ctx.stats.pruned.fetch_add(1, Ordering::Relaxed);
            }
        }

        // `any` stops handing out unstarted siblings once a child wins;
        // siblings already running finish and are ignored
        children.par_iter().any(|child| child.run(ctx))
    }

    pub fn outcome(&self, ctx: &SearchContext) -> Outcome {
        Outcome {
            label: self.label,
            winnable: self.run(ctx),
        }
    }
}

/// Switch to the sequential sweep? The peg half-count clause is satisfied by
/// every legal board, so in practice only the jump count decides.
#[inline]
pub fn should_exhaust(board: &Board, move_count: usize, threshold: usize) -> bool {
    move_count <= threshold && (board.remaining_pegs() >> 1) <= board.total_pegs()
}

/// Depth-first sweep with an explicit stack, no forking, no dedup.
pub fn exhaust(board: Board) -> bool {
    let mut stack = vec![board];
    while let Some(board) = stack.pop() {
        let moves = generate_moves(&board);
        if moves.is_empty() {
            if board.remaining_pegs() == 1 {
                return true;
            }
            continue;
        }
        stack.extend(moves.iter().map(|mv| apply_move(&board, mv)));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegsol_core::Variant;

    fn pegs(ids: &[u8]) -> Board {
        Board::with_pegs(Variant::English, ids).unwrap()
    }

    fn ctx() -> SearchContext {
        SearchContext::new(&SearchConfig::default())
    }

    #[test]
    fn test_exhaust_terminal_boards() {
        assert!(exhaust(pegs(&[24])));
        assert!(!exhaust(pegs(&[2, 4, 44])));
        assert!(!exhaust(pegs(&[])));
    }

    #[test]
    fn test_exhaust_one_jump_away() {
        assert!(exhaust(pegs(&[23, 24])));
        // 23 over 24 lands next to 32, which can then clear it
        assert!(exhaust(pegs(&[23, 24, 32])));
    }

    #[test]
    fn test_should_exhaust() {
        let board = pegs(&[23, 24]);
        assert!(should_exhaust(&board, 2, 3));
        assert!(should_exhaust(&board, 3, 3));
        assert!(!should_exhaust(&board, 4, 3));
        let full = Board::standard(Variant::European);
        assert!(should_exhaust(&full, 0, 3));
    }

    #[test]
    fn test_parallel_mode_verdicts() {
        // both boards branch past the threshold at the root
        let winnable = pegs(&[10, 16, 17, 21, 24, 25, 26, 32, 37]);
        let hopeless = pegs(&[16, 17, 21, 23, 24, 27, 33, 34, 46]);
        assert!(generate_moves(&winnable).len() > 3);
        assert!(generate_moves(&hopeless).len() > 3);

        let c = ctx();
        assert!(SearchTask::unlabeled(winnable).run(&c));
        assert!(c.stats.tasks() > 1);

        assert!(!SearchTask::unlabeled(hopeless).run(&ctx()));
    }

    #[test]
    fn test_verdict_is_repeatable_with_fresh_caches() {
        let boards = [
            pegs(&[11, 15, 16, 17, 20, 23, 29, 30, 32]),
            pegs(&[10, 11, 15, 16, 17, 20, 28, 37, 44]),
        ];
        for board in boards {
            let first = SearchTask::unlabeled(board).run(&ctx());
            let second = SearchTask::unlabeled(board).run(&ctx());
            assert_eq!(first, second, "{board:?}");
        }
    }

    #[test]
    fn test_children_are_recorded_in_cache() {
        let board = pegs(&[10, 16, 17, 21, 24, 25, 26, 32, 37]);
        let c = ctx();
        SearchTask::unlabeled(board).run(&c);
        let first = apply_move(&board, &generate_moves(&board)[0]);
        assert!(c.cache.contains(&first));
        // the root itself is never inserted
        assert!(!c.cache.contains(&board));
    }

    #[test]
    fn test_root_task_label() {
        let board = pegs(&[23, 24]);
        let mv = Move::new(23, 24, 25);
        let task = SearchTask::root(&board, mv);
        assert_eq!(task.label(), Some(mv));
        assert_eq!(task.board().remaining_pegs(), 1);
        assert_eq!(
            task.outcome(&ctx()),
            Outcome {
                label: Some(mv),
                winnable: true
            }
        );
    }
}
