//! snake-2048: move selection for 4x4 2048 boards
//!
//! This crate provides:
//! - A `Board` value type with the merge rules (`shift`, `is_legal`, `is_game_over`, ...)
//! - A weighted multi-term heuristic and a memoized expectimax search (`expectimax` module)
//! - An iterative-deepening `MoveSelector` that fits each decision into a time budget
//! - Provider / sink traits for hosting the engine and a local self-play game (`session` module)
//!
//! Quick start:
//! ```
//! use snake_2048::engine::{Board, Move};
//!
//! let b0 = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
//! assert!(b0.is_legal(Move::Down));
//! assert!(!b0.is_legal(Move::Left));
//! assert_eq!(b0.shift(Move::Down).tile_sum(), b0.tile_sum());
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use snake_2048::expectimax::{ExpectimaxConfig, MoveSelector, SearchBudget, Weights};
//! use snake_2048::session::{drive, Outcome, SelfPlay};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // 1) Keep doctests fast: shallow budgets in every tier
//! let mut cfg = ExpectimaxConfig::default();
//! let quick = SearchBudget::new(20, 2);
//! cfg.budgets.endgame = quick;
//! cfg.budgets.high_tile = quick;
//! cfg.budgets.normal = quick;
//!
//! // 2) Seeded selector and game for reproducible runs
//! let mut selector = MoveSelector::with_rng(cfg, Weights::default(), StdRng::seed_from_u64(1));
//! let mut game = SelfPlay::new(StdRng::seed_from_u64(123));
//!
//! // 3) Play a few moves
//! let summary = drive(&mut game, &mut selector, Some(4)).unwrap();
//! assert_eq!(summary.outcome, Outcome::MoveCap);
//! assert!(game.score() < 1000);
//! ```
//!
pub mod engine;
pub mod expectimax;
pub mod session;
