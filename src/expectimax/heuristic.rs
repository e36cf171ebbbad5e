use serde::{Deserialize, Serialize};

use crate::engine::{Board, Tile, BOARD_SIZE};

/// Snake gradient, largest in the top-left corner.
pub const POSITION_WEIGHTS: [[f64; BOARD_SIZE]; BOARD_SIZE] = [
    [32768.0, 16384.0, 8192.0, 4096.0],
    [2048.0, 1024.0, 512.0, 256.0],
    [128.0, 64.0, 32.0, 16.0],
    [8.0, 4.0, 2.0, 1.0],
];

/// Tiles at or above this value count toward the trapped penalty.
const TRAPPED_MIN_TILE: Tile = 128;
const EMPTY_LINE_BONUS: f64 = 1000.0;
const NEIGHBOURS: [(isize, isize); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Coefficients for the heuristic terms. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub smoothness: f64,
    pub monotonicity: f64,
    pub empty: f64,
    pub max_tile: f64,
    pub positional: f64,
    pub merge_potential: f64,
    pub island_penalty: f64,
    pub max_tile_distance: f64,
    /// Scales the bonus for keeping the highest tile in a corner.
    pub edge: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            smoothness: 0.1,
            monotonicity: 1.0,
            empty: 2.7,
            max_tile: 1.0,
            positional: 1.0,
            merge_potential: 0.5,
            island_penalty: 2.0,
            max_tile_distance: 3.0,
            edge: 1.0,
        }
    }
}

/// Unweighted heuristic terms for one board.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeuristicTerms {
    pub empty: f64,
    pub smoothness: f64,
    pub monotonicity: f64,
    pub max_tile: f64,
    pub positional: f64,
    pub merge_potential: f64,
    pub corner_bonus: f64,
    pub trapped_penalty: f64,
    pub empty_line_bonus: f64,
    pub islands: f64,
    pub max_tile_distance: f64,
}

impl HeuristicTerms {
    /// Linear combination of the terms. Penalties are subtracted.
    pub fn score(&self, w: &Weights) -> f64 {
        w.empty * self.empty
            + w.smoothness * self.smoothness
            + w.monotonicity * self.monotonicity
            + w.max_tile * self.max_tile
            + w.positional * self.positional
            + w.merge_potential * self.merge_potential
            + w.edge * self.corner_bonus
            - self.trapped_penalty
            + self.empty_line_bonus
            - w.island_penalty * self.islands
            - w.max_tile_distance * self.max_tile_distance
    }
}

/// Static board evaluator. Pure: the score depends only on the board.
#[derive(Debug, Clone, Default)]
pub struct Heuristic {
    weights: Weights,
}

impl Heuristic {
    pub fn new(weights: Weights) -> Self { Self { weights } }

    #[inline]
    pub fn weights(&self) -> &Weights { &self.weights }

    pub fn evaluate(&self, board: Board) -> f64 { Self::breakdown(board).score(&self.weights) }

    pub fn breakdown(board: Board) -> HeuristicTerms {
        let max = board.highest_tile();
        HeuristicTerms {
            empty: board.count_empty() as f64,
            smoothness: calc_smoothness(&board),
            monotonicity: calc_monotonicity(&board),
            max_tile: if max > 0 { log2(max) } else { 0.0 },
            positional: calc_positional(&board),
            merge_potential: calc_merge_potential(&board) as f64,
            corner_bonus: if board.is_max_tile_in_corner() { 2.0 * f64::from(max) } else { 0.0 },
            trapped_penalty: calc_trapped_penalty(&board),
            empty_line_bonus: calc_empty_line_bonus(&board),
            islands: count_islands(&board) as f64,
            max_tile_distance: max_tile_corner_distance(&board) as f64,
        }
    }
}

#[inline]
fn log2(v: Tile) -> f64 { f64::from(v).log2() }

fn calc_positional(board: &Board) -> f64 {
    let mut score = 0.0;
    for (row, cells) in board.rows().iter().enumerate() {
        for (col, &v) in cells.iter().enumerate() {
            if v > 0 {
                score += f64::from(v) * POSITION_WEIGHTS[row][col];
            }
        }
    }
    score
}

/// Right and down neighbours of every cell, as ((r, c), (r', c')) pairs.
fn adjacent_pairs() -> impl Iterator<Item = ((usize, usize), (usize, usize))> {
    (0..BOARD_SIZE).flat_map(|r| {
        (0..BOARD_SIZE).flat_map(move |c| {
            let right = (c + 1 < BOARD_SIZE).then_some(((r, c), (r, c + 1)));
            let down = (r + 1 < BOARD_SIZE).then_some(((r, c), (r + 1, c)));
            right.into_iter().chain(down)
        })
    })
}

fn calc_merge_potential(board: &Board) -> usize {
    adjacent_pairs()
        .filter(|&((r, c), (nr, nc))| {
            let a = board.tile(r, c);
            a != 0 && a == board.tile(nr, nc)
        })
        .count()
}

fn calc_smoothness(board: &Board) -> f64 {
    adjacent_pairs().fold(0.0, |acc, ((r, c), (nr, nc))| {
        let (a, b) = (board.tile(r, c), board.tile(nr, nc));
        if a != 0 && b != 0 { acc - (log2(a) - log2(b)).abs() } else { acc }
    })
}

fn calc_monotonicity(board: &Board) -> f64 {
    let rows = board.rows();
    let mut total = 0.0;
    for i in 0..BOARD_SIZE {
        let row = rows[i];
        let col = [rows[0][i], rows[1][i], rows[2][i], rows[3][i]];
        total += line_monotonicity(&row) + line_monotonicity(&col);
    }
    total
}

/// Rewards descending runs and charges double for ascending ones, ignoring gaps.
fn line_monotonicity(line: &[Tile]) -> f64 {
    let mut score = 0.0;
    let mut prev: Option<f64> = None;
    for &v in line.iter().filter(|&&v| v != 0) {
        let cur = log2(v);
        if let Some(p) = prev {
            if p < cur {
                score += (cur - p) * 2.0;
            } else {
                score += p - cur;
            }
        }
        prev = Some(cur);
    }
    score
}

fn calc_trapped_penalty(board: &Board) -> f64 {
    let mut penalty = 0.0;
    for r in 0..BOARD_SIZE {
        for c in 0..BOARD_SIZE {
            let v = board.tile(r, c);
            if v < TRAPPED_MIN_TILE {
                continue;
            }
            let free = neighbours(r, c).any(|(nr, nc)| {
                let n = board.tile(nr, nc);
                n == 0 || n == v
            });
            if !free {
                penalty += f64::from(v);
            }
        }
    }
    penalty
}

fn calc_empty_line_bonus(board: &Board) -> f64 {
    let rows = board.rows();
    let empty_rows = rows.iter().filter(|row| row.iter().all(|&v| v == 0)).count();
    let empty_cols = (0..BOARD_SIZE).filter(|&c| rows.iter().all(|row| row[c] == 0)).count();
    (empty_rows + empty_cols) as f64 * EMPTY_LINE_BONUS
}

/// Number of 4-connected groups of non-empty cells.
fn count_islands(board: &Board) -> usize {
    let mut visited = [[false; BOARD_SIZE]; BOARD_SIZE];
    let mut islands = 0;
    let mut stack = Vec::with_capacity(BOARD_SIZE * BOARD_SIZE);
    for r in 0..BOARD_SIZE {
        for c in 0..BOARD_SIZE {
            if board.tile(r, c) == 0 || visited[r][c] {
                continue;
            }
            islands += 1;
            visited[r][c] = true;
            stack.push((r, c));
            while let Some((x, y)) = stack.pop() {
                for (nx, ny) in neighbours(x, y) {
                    if board.tile(nx, ny) != 0 && !visited[nx][ny] {
                        visited[nx][ny] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    islands
}

fn max_tile_corner_distance(board: &Board) -> usize {
    let max = board.highest_tile();
    if max == 0 {
        return 0;
    }
    let last = BOARD_SIZE - 1;
    let mut best = BOARD_SIZE * 2;
    for r in 0..BOARD_SIZE {
        for c in 0..BOARD_SIZE {
            if board.tile(r, c) == max {
                let to_corner = r.min(last - r) + c.min(last - c);
                best = best.min(to_corner);
            }
        }
    }
    best
}

fn neighbours(r: usize, c: usize) -> impl Iterator<Item = (usize, usize)> {
    NEIGHBOURS.iter().filter_map(move |&(dr, dc)| {
        let nr = r.checked_add_signed(dr)?;
        let nc = c.checked_add_signed(dc)?;
        (nr < BOARD_SIZE && nc < BOARD_SIZE).then_some((nr, nc))
    })
}
