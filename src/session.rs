//! Seams between the decision engine and whatever hosts the game.
//!
//! A host exposes the live game through [`BoardProvider`] (pull one snapshot
//! per decision) and [`MoveSink`] (accept one direction per decision).
//! [`drive`] runs the decision loop over any type implementing both;
//! [`SelfPlay`] is an in-process game used by the binary and by tests.

use rand::Rng;
use tracing::{debug, info};

use crate::engine::{Board, BoardError, Move, Score};
use crate::expectimax::MoveSelector;

/// A board plus the score reported alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub score: Score,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("session closed")]
    Closed,
    #[error("invalid board snapshot: {0}")]
    Board(#[from] BoardError),
    #[error("move {0} rejected: {1}")]
    Rejected(Move, String),
}

pub trait BoardProvider {
    /// Current state, or `None` when no state is available any more.
    fn snapshot(&mut self) -> Result<Option<Snapshot>, SessionError>;
}

pub trait MoveSink {
    fn submit(&mut self, direction: Move) -> Result<(), SessionError>;
}

/// Why [`drive`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The selector found no legal move.
    GameOver,
    /// The provider had no further snapshot.
    Exhausted,
    /// `max_moves` decisions were made.
    MoveCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub moves: u64,
    pub last: Option<Snapshot>,
    pub outcome: Outcome,
}

/// Pull a snapshot, decide, submit; repeat until the game ends, the provider
/// runs dry, or `max_moves` moves were submitted.
pub fn drive<S, R>(
    session: &mut S,
    selector: &mut MoveSelector<R>,
    max_moves: Option<u64>,
) -> Result<SessionSummary, SessionError>
where
    S: BoardProvider + MoveSink,
    R: Rng,
{
    let mut moves = 0u64;
    let mut last = None;
    let outcome = loop {
        if max_moves.is_some_and(|cap| moves >= cap) {
            break Outcome::MoveCap;
        }
        let Some(snapshot) = session.snapshot()? else { break Outcome::Exhausted };
        last = Some(snapshot);
        let Some(direction) = selector.get_next_move(snapshot.board, snapshot.score) else {
            break Outcome::GameOver;
        };
        let stats = selector.last_decision();
        debug!(
            moves,
            %direction,
            depth = ?stats.depth_reached,
            nodes = stats.search.nodes,
            elapsed = ?stats.elapsed,
            "submitting move"
        );
        session.submit(direction)?;
        moves += 1;
    };
    if let Some(s) = last {
        info!(moves, score = s.score, highest_tile = s.board.highest_tile(), ?outcome, "session finished");
    }
    Ok(SessionSummary { moves, last, outcome })
}

/// A local game: spawns tiles from its own RNG and keeps the standard score.
pub struct SelfPlay<R> {
    board: Board,
    score: Score,
    rng: R,
}

impl<R: Rng> SelfPlay<R> {
    /// Start from an empty board with two random tiles.
    pub fn new(mut rng: R) -> Self {
        let board = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        Self { board, score: 0, rng }
    }

    pub fn from_board(board: Board, rng: R) -> Self { Self { board, score: 0, rng } }

    #[inline]
    pub fn board(&self) -> Board { self.board }

    #[inline]
    pub fn score(&self) -> Score { self.score }
}

impl<R: Rng> BoardProvider for SelfPlay<R> {
    fn snapshot(&mut self) -> Result<Option<Snapshot>, SessionError> {
        Ok(Some(Snapshot { board: self.board, score: self.score }))
    }
}

impl<R: Rng> MoveSink for SelfPlay<R> {
    fn submit(&mut self, direction: Move) -> Result<(), SessionError> {
        let (moved, gained) = self.board.shift_with_score(direction);
        if moved == self.board {
            return Err(SessionError::Rejected(direction, "no tile moves".into()));
        }
        self.score += gained;
        self.board = moved.with_random_tile(&mut self.rng);
        Ok(())
    }
}
