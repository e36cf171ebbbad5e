use std::collections::HashMap;

use ahash::RandomState as AHasher;

use crate::engine::{Board, Move, Tile};

use super::heuristic::Heuristic;
use super::{BranchEval, CacheMode, ExpectimaxConfig, Node, SearchStats};

/// Chance nodes with more empty cells than this only sample the cells nearest the top-left corner.
const NARROW_ABOVE: usize = 6;
const NARROW_TO: usize = 4;
const SPAWNS: [(Tile, f64); 2] = [(2, 0.9), (4, 0.1)];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    board: Board,
    exact: Option<(u32, Node)>,
}

#[derive(Clone, Copy)]
struct TranspositionEntry { score: f64, move_depth: u32 }

/// Expectimax evaluator that owns its heuristic and transposition table.
///
/// The table persists across calls until [`SearchEngine::clear_cache`].
pub struct SearchEngine {
    heuristic: Heuristic,
    cfg: ExpectimaxConfig,
    map: HashMap<CacheKey, TranspositionEntry, AHasher>,
    stats: SearchStats,
}

impl SearchEngine {
    pub fn new(heuristic: Heuristic, cfg: ExpectimaxConfig) -> Self {
        Self { heuristic, cfg, map: HashMap::with_hasher(AHasher::new()), stats: SearchStats::default() }
    }

    #[inline]
    pub fn config(&self) -> &ExpectimaxConfig { &self.cfg }

    #[inline]
    pub fn heuristic(&self) -> &Heuristic { &self.heuristic }

    /// Static evaluation, bypassing the table.
    #[inline]
    pub fn evaluate(&self, board: Board) -> f64 { self.heuristic.evaluate(board) }

    #[inline]
    pub fn cache_len(&self) -> usize { self.map.len() }

    pub fn clear_cache(&mut self) { self.map.clear(); }

    /// Statistics accumulated since the last [`Self::reset_stats`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    /// Expected value of `board` searched `depth` plies deep from a `node` turn.
    ///
    /// Player nodes with no legal move are worth 0.
    pub fn expectimax(&mut self, board: Board, depth: u32, node: Node) -> f64 {
        self.stats.nodes += 1;
        if let Some(score) = self.lookup(board, depth, node) {
            self.stats.cache_hits += 1;
            return score;
        }
        let score = if depth == 0 {
            self.heuristic.evaluate(board)
        } else {
            match node {
                Node::Max => self.evaluate_max(board, depth),
                Node::Chance => self.evaluate_chance(board, depth),
            }
        };
        self.store(board, depth, node, score);
        score
    }

    /// Score every direction from `board` with a `depth`-ply search.
    ///
    /// Returns a fixed array in order `[Up, Down, Left, Right]`. Illegal moves
    /// and moves whose result is already lost carry no `ev`.
    pub fn branch_evals(&mut self, board: Board, depth: u32) -> [BranchEval; 4] {
        Move::ALL.map(|dir| {
            let child = board.shift(dir);
            let legal = child != board;
            let ev = (legal && !child.is_game_over())
                .then(|| self.expectimax(child, depth.saturating_sub(1), Node::Chance));
            BranchEval { dir, ev, legal }
        })
    }

    fn evaluate_max(&mut self, board: Board, depth: u32) -> f64 {
        let mut best: Option<f64> = None;
        for dir in Move::ALL {
            let child = board.shift(dir);
            if child == board {
                continue;
            }
            let score = self.expectimax(child, depth - 1, Node::Chance);
            best = Some(best.map_or(score, |b| b.max(score)));
        }
        best.unwrap_or(0.0)
    }

    fn evaluate_chance(&mut self, board: Board, depth: u32) -> f64 {
        let mut cells = board.empty_cells();
        if cells.is_empty() {
            return self.heuristic.evaluate(board);
        }
        if cells.len() > NARROW_ABOVE {
            // stable: ties keep row-major order
            cells.sort_by_key(|&(row, col)| row + col);
            cells.truncate(NARROW_TO);
        }
        let n = cells.len() as f64;
        let mut expected = 0.0;
        for (row, col) in cells {
            for (value, prob) in SPAWNS {
                let child = board.with_tile(row, col, value);
                expected += prob * self.expectimax(child, depth - 1, Node::Max) / n;
            }
        }
        expected
    }

    fn key(&self, board: Board, depth: u32, node: Node) -> CacheKey {
        match self.cfg.cache_mode {
            CacheMode::DepthDominates => CacheKey { board, exact: None },
            CacheMode::Exact => CacheKey { board, exact: Some((depth, node)) },
        }
    }

    fn lookup(&self, board: Board, depth: u32, node: Node) -> Option<f64> {
        if !self.cfg.cache_enabled {
            return None;
        }
        let entry = self.map.get(&self.key(board, depth, node))?;
        (entry.move_depth >= depth).then_some(entry.score)
    }

    fn store(&mut self, board: Board, depth: u32, node: Node, score: f64) {
        if self.cfg.cache_enabled {
            let key = self.key(board, depth, node);
            self.map.insert(key, TranspositionEntry { score, move_depth: depth });
        }
    }
}
