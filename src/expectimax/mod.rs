//! Expectimax search policy for 2048.
//!
//! This module provides:
//! - [`Heuristic`]: the static multi-term board evaluator.
//! - [`SearchEngine`]: recursive expectimax with a transposition table.
//! - [`MoveSelector`]: iterative deepening under a per-decision time budget.
//!
//! Everything is single-threaded and deterministic except the fallback used
//! when no search depth produced a candidate, which draws from the selector's RNG.
//!
//! Quick start
//! ```
//! use snake_2048::engine::Board;
//! use snake_2048::expectimax::{ExpectimaxConfig, MoveSelector, SearchBudget, Weights};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::time::Duration;
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let b0 = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
//!
//! let mut selector = MoveSelector::with_rng(ExpectimaxConfig::default(), Weights::default(), rng);
//! let budget = SearchBudget { time_limit: Duration::from_secs(1), max_depth: 3 };
//! let m = selector.select_with_budget(b0, budget);
//! assert!(m.is_some());
//! assert_eq!(selector.last_decision().depth_reached, Some(3));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{Board, Move, Tile};

pub mod heuristic;
mod search;
mod selector;

pub use heuristic::{Heuristic, HeuristicTerms, Weights, POSITION_WEIGHTS};
pub use search::SearchEngine;
pub use selector::{DecisionStats, MoveSelector};

/// Node kind in the expectimax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Player to move: maximize over legal directions.
    Max,
    /// Tile spawn: average over 2/4 placements.
    Chance,
}

/// How transposition entries are matched against queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Keyed by board only; an entry searched at depth >= the query depth is
    /// reused regardless of node kind.
    #[default]
    DepthDominates,
    /// Keyed by (board, depth, node); only exact matches are reused.
    Exact,
}

/// Time and depth allowance for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchBudget {
    #[serde(rename = "time_limit_ms", with = "millis")]
    pub time_limit: Duration,
    pub max_depth: u32,
}

impl SearchBudget {
    pub const fn new(time_limit_ms: u64, max_depth: u32) -> Self {
        Self { time_limit: Duration::from_millis(time_limit_ms), max_depth }
    }
}

/// Budget tiers chosen from board shape.
///
/// - `endgame` when at most `endgame_max_empty` cells are empty.
/// - otherwise `high_tile` once the highest tile reaches `high_tile_min`.
/// - otherwise `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetTiers {
    pub endgame_max_empty: usize,
    pub endgame: SearchBudget,
    pub high_tile_min: Tile,
    pub high_tile: SearchBudget,
    pub normal: SearchBudget,
}

impl Default for BudgetTiers {
    fn default() -> Self {
        Self {
            endgame_max_empty: 4,
            endgame: SearchBudget::new(200, 8),
            high_tile_min: 2048,
            high_tile: SearchBudget::new(150, 7),
            normal: SearchBudget::new(100, 6),
        }
    }
}

impl BudgetTiers {
    pub fn select(&self, board: Board) -> SearchBudget {
        if board.count_empty() <= self.endgame_max_empty {
            self.endgame
        } else if board.highest_tile() >= self.high_tile_min {
            self.high_tile
        } else {
            self.normal
        }
    }
}

/// Configurable knobs for the search. Defaults match the reference tuning.
///
/// - `cache_enabled`: enable/disable transposition table usage.
/// - `cache_mode`: entry matching rule, see [`CacheMode`].
/// - `cache_limit`: the table is cleared after a decision that leaves more entries than this.
/// - `min_depth`: first depth tried by iterative deepening.
/// - `budgets`: per-decision time/depth tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectimaxConfig {
    pub cache_enabled: bool,
    pub cache_mode: CacheMode,
    pub cache_limit: usize,
    pub min_depth: u32,
    pub budgets: BudgetTiers,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_mode: CacheMode::default(),
            cache_limit: 10_000,
            min_depth: 2,
            budgets: BudgetTiers::default(),
        }
    }
}

/// Per-branch expected value at the root.
///
/// - `legal` is false when the move is a no-op for the current board.
/// - `ev` is `None` for illegal moves and moves that end the game immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: Option<f64>,
    pub legal: bool,
}

/// Basic search stats, reset at the start of each decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cache_hits: u64,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
