use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::engine::{Board, Move, Score};

use super::heuristic::{Heuristic, Weights};
use super::search::SearchEngine;
use super::{ExpectimaxConfig, SearchBudget, SearchStats};

/// Summary of the last decision made by a [`MoveSelector`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DecisionStats {
    pub budget: SearchBudget,
    /// Deepest depth whose scan produced a candidate.
    pub depth_reached: Option<u32>,
    pub best_score: Option<f64>,
    pub elapsed: Duration,
    pub search: SearchStats,
    /// True when the move was drawn at random among legal directions.
    pub fallback: bool,
}

/// Iterative-deepening move selector.
///
/// Budgets are picked per decision from the board (see
/// [`BudgetTiers`](super::BudgetTiers)); the clock is only checked between
/// depths, so one depth started just before the limit always finishes.
pub struct MoveSelector<R = StdRng> {
    engine: SearchEngine,
    rng: R,
    last: DecisionStats,
}

impl MoveSelector<StdRng> {
    /// Default weights and config, fallback RNG seeded from entropy.
    pub fn new() -> Self {
        Self::with_rng(ExpectimaxConfig::default(), Weights::default(), StdRng::from_entropy())
    }
}

impl Default for MoveSelector<StdRng> { fn default() -> Self { Self::new() } }

impl<R: Rng> MoveSelector<R> {
    pub fn with_rng(cfg: ExpectimaxConfig, weights: Weights, rng: R) -> Self {
        Self { engine: SearchEngine::new(Heuristic::new(weights), cfg), rng, last: DecisionStats::default() }
    }

    #[inline]
    pub fn engine(&self) -> &SearchEngine { &self.engine }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut SearchEngine { &mut self.engine }

    #[inline]
    pub fn last_decision(&self) -> &DecisionStats { &self.last }

    #[inline]
    pub fn budget_for(&self, board: Board) -> SearchBudget { self.engine.config().budgets.select(board) }

    /// Pick a move for `board` under the budget tier it falls into.
    ///
    /// `score` is accepted for parity with the board provider and does not
    /// influence the search. Returns `None` only when no move is legal.
    pub fn get_next_move(&mut self, board: Board, score: Score) -> Option<Move> {
        let budget = self.budget_for(board);
        trace!(score, ?budget, "decision requested");
        self.select_with_budget(board, budget)
    }

    pub fn select_with_budget(&mut self, board: Board, budget: SearchBudget) -> Option<Move> {
        let start = Instant::now();
        self.engine.reset_stats();
        let mut best: Option<(Move, f64)> = None;
        let mut depth_reached = None;

        for depth in self.engine.config().min_depth..=budget.max_depth {
            if start.elapsed() > budget.time_limit {
                debug!(depth, elapsed = ?start.elapsed(), "time budget spent, stopping");
                break;
            }
            let mut depth_best: Option<(Move, f64)> = None;
            for branch in self.engine.branch_evals(board, depth) {
                let Some(ev) = branch.ev else { continue };
                if depth_best.map_or(true, |(_, s)| ev > s) {
                    depth_best = Some((branch.dir, ev));
                }
            }
            if let Some((dir, ev)) = depth_best {
                debug!(depth, %dir, ev, "depth complete");
                best = depth_best;
                depth_reached = Some(depth);
            }
        }

        let choice = match best {
            Some((dir, _)) => Some(dir),
            None => {
                let legal: Vec<Move> = Move::ALL.into_iter().filter(|&d| board.is_legal(d)).collect();
                let pick = legal.choose(&mut self.rng).copied();
                debug!(legal = legal.len(), pick = ?pick, "no searched candidate, falling back");
                pick
            }
        };

        let limit = self.engine.config().cache_limit;
        if self.engine.cache_len() > limit {
            trace!(entries = self.engine.cache_len(), limit, "flushing transposition table");
            self.engine.clear_cache();
        }

        self.last = DecisionStats {
            budget,
            depth_reached,
            best_score: best.map(|(_, ev)| ev),
            elapsed: start.elapsed(),
            search: self.engine.last_stats(),
            fallback: best.is_none(),
        };
        choice
    }
}
