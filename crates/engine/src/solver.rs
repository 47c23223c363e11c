use log::debug;
use pegsol_core::{Board, Suggestion};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::SearchConfig;
use crate::error::EngineError;
use crate::movegen::generate_moves;
use crate::search::{Outcome, SearchContext, SearchTask};

/// Local search front: owns the fork-join pool and scopes a fresh
/// `SearchContext` to every top-level task.
pub struct Solver {
    config: SearchConfig,
    pool: ThreadPool,
}

impl Solver {
    pub fn new(config: SearchConfig) -> Result<Self, EngineError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("pegsol-search-{i}"));
        if config.threads > 0 {
            builder = builder.num_threads(config.threads);
        }
        let pool = builder.build()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// A context for one top-level task. Sibling first jumps must not share
    /// one: a position claimed by one sibling would be pruned in the other.
    pub fn context(&self) -> SearchContext {
        SearchContext::new(&self.config)
    }

    /// Can `board` still be reduced to a single peg?
    pub fn is_winnable(&self, board: &Board) -> bool {
        let ctx = self.context();
        let verdict = self
            .pool
            .install(|| SearchTask::unlabeled(*board).run(&ctx));
        log_stats("is_winnable", &ctx);
        verdict
    }

    /// Search one top-level task under its own context. Must be called from
    /// inside the pool.
    pub fn outcome(&self, task: &SearchTask) -> Outcome {
        let ctx = self.context();
        let outcome = task.outcome(&ctx);
        match task.label() {
            Some(mv) => log_stats(&mv.to_string(), &ctx),
            None => log_stats("unlabeled task", &ctx),
        }
        outcome
    }

    /// Run top-level tasks in parallel; outcomes come back in task order.
    pub fn run_tasks(&self, tasks: &[SearchTask]) -> Vec<Outcome> {
        self.pool
            .install(|| tasks.par_iter().map(|task| self.outcome(task)).collect())
    }

    /// Single-process evaluation: every first jump searched here.
    pub fn evaluate(&self, board: &Board) -> Vec<Suggestion> {
        let tasks: Vec<SearchTask> = generate_moves(board)
            .into_iter()
            .map(|mv| SearchTask::root(board, mv))
            .collect();
        winning_suggestions(&self.run_tasks(&tasks))
    }
}

/// Labelled winners, in the order given.
pub fn winning_suggestions(outcomes: &[Outcome]) -> Vec<Suggestion> {
    outcomes
        .iter()
        .filter(|outcome| outcome.winnable)
        .filter_map(|outcome| outcome.label)
        .map(|mv| mv.suggestion())
        .collect()
}

fn log_stats(what: &str, ctx: &SearchContext) {
    debug!(
        "{what}: {} tasks, {} pruned, {} exhausted, {} cached keys",
        ctx.stats.tasks(),
        ctx.stats.pruned(),
        ctx.stats.exhausted(),
        ctx.cache.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegsol_core::{Move, Variant};

    fn solver() -> Solver {
        Solver::new(SearchConfig::default().with_threads(2)).unwrap()
    }

    #[test]
    fn test_evaluate_one_jump_from_solved() {
        let board = Board::with_pegs(Variant::English, &[23, 24]).unwrap();
        assert_eq!(
            solver().evaluate(&board),
            vec![
                Suggestion { start: 24, end: 22 },
                Suggestion { start: 23, end: 25 },
            ]
        );
    }

    #[test]
    fn test_evaluate_stuck_board() {
        let board = Board::with_pegs(Variant::English, &[2, 4, 44]).unwrap();
        assert!(solver().evaluate(&board).is_empty());
        assert!(!solver().is_winnable(&board));
    }

    #[test]
    fn test_evaluate_mixed_first_moves() {
        // only the jump that lands beside 32 keeps the game alive
        let board = Board::with_pegs(Variant::English, &[23, 24, 32]).unwrap();
        assert_eq!(
            solver().evaluate(&board),
            vec![Suggestion { start: 23, end: 25 }]
        );
    }

    #[test]
    fn test_run_tasks_keeps_order() {
        let board = Board::with_pegs(Variant::English, &[23, 24, 32]).unwrap();
        let s = solver();
        let tasks: Vec<SearchTask> = generate_moves(&board)
            .into_iter()
            .map(|mv| SearchTask::root(&board, mv))
            .collect();
        let outcomes = s.run_tasks(&tasks);
        assert_eq!(
            outcomes,
            vec![
                Outcome {
                    label: Some(Move::new(24, 23, 22)),
                    winnable: false
                },
                Outcome {
                    label: Some(Move::new(23, 24, 25)),
                    winnable: true
                },
            ]
        );
    }

    #[test]
    fn test_siblings_do_not_prune_each_other() {
        // 15>29 and another first jump meet in a shared position
        let board = Board::with_pegs(
            Variant::English,
            &[10, 15, 16, 22, 23, 25, 26, 27, 32, 33, 34, 37, 39, 44, 45, 46],
        )
        .unwrap();
        let s = solver();
        let expected: Vec<Suggestion> = generate_moves(&board)
            .into_iter()
            .filter(|mv| s.is_winnable(&crate::apply::apply_move(&board, mv)))
            .map(|mv| mv.suggestion())
            .collect();
        assert!(expected.contains(&Suggestion { start: 15, end: 29 }));
        assert_eq!(s.evaluate(&board), expected);
    }

    #[test]
    fn test_unlabeled_winners_are_dropped() {
        let outcomes = [
            Outcome {
                label: None,
                winnable: true,
            },
            Outcome {
                label: Some(Move::new(2, 3, 4)),
                winnable: true,
            },
        ];
        assert_eq!(
            winning_suggestions(&outcomes),
            vec![Suggestion { start: 2, end: 4 }]
        );
    }
}
