use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// All directions in search order. Ties between equal scores resolve to
    /// the earlier entry.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction {0:?}, expected one of up/down/left/right")]
pub struct ParseMoveError(String);

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Move::Up),
            "down" => Ok(Move::Down),
            "left" => Ok(Move::Left),
            "right" => Ok(Move::Right),
            _ => Err(ParseMoveError(s.to_string())),
        }
    }
}

pub const BOARD_SIZE: usize = 4;

pub type Tile = u32;
pub type Line = [Tile; BOARD_SIZE];
pub type Score = u64;

/// Largest tile accepted from a snapshot. Two of them still merge within `Tile`.
pub const MAX_TILE: Tile = 1 << 30;
/// Largest tile sum accepted from a snapshot. Merges preserve the sum, so no
/// merged tile can exceed it plus the spawns of one search.
pub const MAX_TILE_SUM: u64 = 1 << 31;

const CORNERS: [(usize, usize); 4] = [
    (0, 0),
    (0, BOARD_SIZE - 1),
    (BOARD_SIZE - 1, 0),
    (BOARD_SIZE - 1, BOARD_SIZE - 1),
];

/// Rejection reasons for snapshots handed over by a board provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("expected 4 rows, got {0}")]
    RowCount(usize),
    #[error("row {row} has {len} cells, expected 4")]
    RowLength { row: usize, len: usize },
    #[error("cell ({row}, {col}) holds {value}, which is neither empty nor a power of two in 2..=2^30")]
    InvalidTile { row: usize, col: usize, value: Tile },
    #[error("tiles sum to {0}, above the 2^31 limit")]
    TileSum(u64),
}

/// A 4x4 2048 board stored row-major by tile value (0 = empty).
///
/// `Board` is `Copy`: every move or spawn produces a fresh value, so search
/// branches never share cells. Equality and hashing use the full grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board([[Tile; BOARD_SIZE]; BOARD_SIZE]);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board([[0; BOARD_SIZE]; BOARD_SIZE]);

    /// Construct a `Board` from rows without validating tile values.
    ///
    /// Merging two tiles above [`MAX_TILE`] overflows; use [`Board::try_from_rows`]
    /// for untrusted rows.
    #[inline]
    pub const fn from_rows(rows: [[Tile; BOARD_SIZE]; BOARD_SIZE]) -> Self { Board(rows) }

    /// Construct a `Board` from rows, rejecting cells that are not 0 or a power
    /// of two in `2..=MAX_TILE`, and boards whose tiles sum above [`MAX_TILE_SUM`].
    ///
    /// ```
    /// use snake_2048::engine::{Board, BoardError};
    /// assert!(Board::try_from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_ok());
    /// assert_eq!(
    ///     Board::try_from_rows([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]),
    ///     Err(BoardError::InvalidTile { row: 0, col: 0, value: 3 })
    /// );
    /// ```
    pub fn try_from_rows(rows: [[Tile; BOARD_SIZE]; BOARD_SIZE]) -> Result<Self, BoardError> {
        for (row, cells) in rows.iter().enumerate() {
            for (col, &value) in cells.iter().enumerate() {
                if value != 0 && (value < 2 || value > MAX_TILE || !value.is_power_of_two()) {
                    return Err(BoardError::InvalidTile { row, col, value });
                }
            }
        }
        let board = Board(rows);
        match board.tile_sum() {
            sum if sum > MAX_TILE_SUM => Err(BoardError::TileSum(sum)),
            _ => Ok(board),
        }
    }

    /// Borrow the rows of this board.
    #[inline]
    pub fn rows(&self) -> &[[Tile; BOARD_SIZE]; BOARD_SIZE] { &self.0 }

    /// Value at (`row`, `col`), 0 if empty.
    #[inline]
    pub fn tile(&self, row: usize, col: usize) -> Tile { self.0[row][col] }

    /// Return a copy of this board with (`row`, `col`) set to `value`.
    #[inline]
    pub fn with_tile(mut self, row: usize, col: usize, value: Tile) -> Self {
        self.0[row][col] = value;
        self
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    ///
    /// ```
    /// use snake_2048::engine::{Board, Move};
    /// let b = Board::from_rows([[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]);
    /// assert_eq!(b.shift(Move::Left).rows()[0], [4, 4, 0, 0]);
    /// ```
    #[inline]
    pub fn shift(self, dir: Move) -> Self { self.shift_with_score(dir).0 }

    /// Like [`Board::shift`], also returning the sum of the tiles created by merges.
    pub fn shift_with_score(self, dir: Move) -> (Self, Score) {
        let mut out = self;
        let mut gained = 0;
        for i in 0..BOARD_SIZE {
            let mut line = match dir {
                Move::Left | Move::Right => self.0[i],
                Move::Up | Move::Down => self.column(i),
            };
            let reversed = matches!(dir, Move::Right | Move::Down);
            if reversed {
                line.reverse();
            }
            let (mut merged, score) = merge_line_with_score(line);
            if reversed {
                merged.reverse();
            }
            gained += score;
            match dir {
                Move::Left | Move::Right => out.0[i] = merged,
                Move::Up | Move::Down => {
                    for (row, &value) in merged.iter().enumerate() {
                        out.0[row][i] = value;
                    }
                }
            }
        }
        (out, gained)
    }

    /// True if moving in `dir` changes the board.
    #[inline]
    pub fn is_legal(self, dir: Move) -> bool { self.shift(dir) != self }

    /// Insert a random 2 (90%) or 4 (10%) tile into a random empty slot, using the provided RNG.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use snake_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return self;
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        self.with_tile(row, col, generate_random_tile(rng))
    }

    /// Perform a move then insert a random tile if the move changed the board, using the provided RNG.
    #[inline]
    pub fn make_move<R: Rng + ?Sized>(self, direction: Move, rng: &mut R) -> Self {
        let moved = self.shift(direction);
        if moved != self { moved.with_random_tile(rng) } else { self }
    }

    /// Empty cell coordinates in row-major order.
    pub fn empty_cells(self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(BOARD_SIZE * BOARD_SIZE);
        for (row, cells_in_row) in self.0.iter().enumerate() {
            for (col, &value) in cells_in_row.iter().enumerate() {
                if value == 0 {
                    cells.push((row, col));
                }
            }
        }
        cells
    }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> usize { self.cells().filter(|&v| v == 0).count() }

    /// Return the highest tile value (e.g., 2048) present on the board, 0 if empty.
    #[inline]
    pub fn highest_tile(self) -> Tile { self.cells().max().unwrap_or(0) }

    /// Sum of all tile values. Moves preserve it; only spawns increase it.
    #[inline]
    pub fn tile_sum(self) -> u64 { self.cells().map(u64::from).sum() }

    /// Return true if the board is full and no move changes it.
    ///
    /// ```
    /// use snake_2048::engine::Board;
    /// // Unlike a bare "no move changes the board" test, an empty board is not lost.
    /// assert!(!Board::EMPTY.is_game_over());
    /// ```
    #[inline]
    pub fn is_game_over(self) -> bool { is_game_over(self) }

    /// True if the highest tile sits in at least one of the four corners.
    pub fn is_max_tile_in_corner(self) -> bool {
        let max = self.highest_tile();
        CORNERS.iter().any(|&(row, col)| self.0[row][col] == max)
    }

    fn column(&self, col: usize) -> Line {
        [self.0[0][col], self.0[1][col], self.0[2][col], self.0[3][col]]
    }

    fn cells(self) -> impl Iterator<Item = Tile> {
        self.0.into_iter().flatten()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:?})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f, "{}", "-".repeat(31))?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl From<[[Tile; BOARD_SIZE]; BOARD_SIZE]> for Board {
    fn from(rows: [[Tile; BOARD_SIZE]; BOARD_SIZE]) -> Self { Board::from_rows(rows) }
}

impl TryFrom<Vec<Vec<Tile>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<Tile>>) -> Result<Self, Self::Error> {
        if rows.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(rows.len()));
        }
        let mut grid = [[0; BOARD_SIZE]; BOARD_SIZE];
        for (row, cells) in rows.iter().enumerate() {
            grid[row] = cells
                .as_slice()
                .try_into()
                .map_err(|_| BoardError::RowLength { row, len: cells.len() })?;
        }
        Board::try_from_rows(grid)
    }
}

/// Slide/merge tiles in the given direction. No randomness.
pub fn shift(board: Board, direction: Move) -> Board { board.shift(direction) }

/// True if the board has no empty cell and no move in any direction changes it.
pub fn is_game_over(board: Board) -> bool {
    if board.count_empty() > 0 {
        return false;
    }
    !Move::ALL.iter().any(|&direction| board.is_legal(direction))
}

/// Slide one line toward index 0, merging each equal adjacent pair once.
///
/// ```
/// use snake_2048::engine::merge_line;
/// assert_eq!(merge_line([2, 2, 2, 2]), [4, 4, 0, 0]);
/// assert_eq!(merge_line([0, 2, 0, 2]), [4, 0, 0, 0]);
/// ```
pub fn merge_line(line: Line) -> Line { merge_line_with_score(line).0 }

fn merge_line_with_score(line: Line) -> (Line, Score) {
    let mut out = [0; BOARD_SIZE];
    let mut score = 0;
    let mut write = 0;
    let mut pending: Option<Tile> = None;
    for value in line.into_iter().filter(|&v| v != 0) {
        match pending {
            Some(prev) if prev == value => {
                out[write] = prev * 2;
                score += Score::from(prev * 2);
                write += 1;
                pending = None;
            }
            Some(prev) => {
                out[write] = prev;
                write += 1;
                pending = Some(value);
            }
            None => pending = Some(value),
        }
    }
    if let Some(prev) = pending {
        out[write] = prev;
    }
    (out, score)
}

fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile { if rng.gen_range(0..10) < 9 { 2 } else { 4 } }

fn format_val(val: Tile) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const STAIRCASE: Board = Board::from_rows([
        [2, 4, 8, 16],
        [4, 8, 16, 32],
        [8, 16, 32, 64],
        [16, 32, 64, 128],
    ]);

    #[test]
    fn it_merge_line() {
        assert_eq!(merge_line([0, 0, 0, 0]), [0, 0, 0, 0]);
        assert_eq!(merge_line([2, 2, 2, 2]), [4, 4, 0, 0]);
        assert_eq!(merge_line([0, 2, 0, 2]), [4, 0, 0, 0]);
        assert_eq!(merge_line([2, 4, 2, 4]), [2, 4, 2, 4]);
        assert_eq!(merge_line([2, 2, 2, 0]), [4, 2, 0, 0]);
        assert_eq!(merge_line([4, 0, 0, 4]), [8, 0, 0, 0]);
        assert_eq!(merge_line([2, 2, 4, 4]), [4, 8, 0, 0]);
        assert_eq!(merge_line([4, 4, 8, 0]), [8, 8, 0, 0]);
    }

    #[test]
    fn it_merge_line_score() {
        assert_eq!(merge_line_with_score([2, 2, 4, 4]).1, 12);
        assert_eq!(merge_line_with_score([2, 4, 8, 16]).1, 0);
    }

    #[test]
    fn test_move_left() {
        let game = Board::from_rows([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let expected = Board::from_rows([[2, 4, 8, 16], [2, 16, 4, 0], [8, 0, 0, 0], [2, 4, 0, 0]]);
        assert_eq!(game.shift(Move::Left), expected);
    }

    #[test]
    fn test_move_right() {
        let game = Board::from_rows([[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        let expected = Board::from_rows([[2, 4, 8, 16], [0, 2, 16, 4], [0, 0, 0, 8], [0, 0, 2, 4]]);
        assert_eq!(game.shift(Move::Right), expected);
    }

    #[test]
    fn test_move_up() {
        let game = Board::from_rows([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let expected = Board::from_rows([[2, 2, 8, 2], [4, 16, 0, 4], [8, 4, 0, 0], [16, 0, 0, 0]]);
        assert_eq!(game.shift(Move::Up), expected);
    }

    #[test]
    fn test_move_down() {
        let game = Board::from_rows([[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        let expected = Board::from_rows([[2, 0, 0, 0], [4, 2, 0, 0], [8, 16, 0, 2], [16, 4, 8, 4]]);
        assert_eq!(game.shift(Move::Down), expected);
    }

    #[test]
    fn shift_leaves_input_untouched() {
        let game = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let copy = game;
        let _ = game.shift(Move::Left).with_tile(3, 3, 2);
        assert_eq!(game, copy);
    }

    #[test]
    fn settled_shift_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        for i in 0..40 {
            let dir = Move::ALL[i % 4];
            let mut settled = b.shift(dir);
            // a line settles after at most four passes
            for _ in 0..3 {
                settled = settled.shift(dir);
            }
            assert_eq!(settled.shift(dir), settled);
            assert!(!settled.is_legal(dir));
            b = b.make_move(dir, &mut rng);
        }
    }

    #[test]
    fn shift_preserves_tile_sum() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
        for i in 0..60 {
            let dir = Move::ALL[(i * 3) % 4];
            let before = b.tile_sum();
            let moved = b.shift(dir);
            assert_eq!(moved.tile_sum(), before);
            if moved != b {
                let spawned = moved.with_random_tile(&mut rng);
                let gained = spawned.tile_sum() - before;
                assert!(gained == 2 || gained == 4);
                b = spawned;
            }
        }
    }

    #[test]
    fn legal_move_on_single_row() {
        let b = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]);
        assert!(b.is_legal(Move::Down));
        assert!(!b.is_legal(Move::Left));
        assert!(!b.is_legal(Move::Up));
        assert!(!b.is_legal(Move::Right));
        let b = Board::from_rows([[0, 2, 4, 8], [0; 4], [0; 4], [0; 4]]);
        assert!(b.is_legal(Move::Left));
    }

    #[test]
    fn it_game_over() {
        assert!(STAIRCASE.is_game_over());
        assert!(Move::ALL.iter().all(|&d| !STAIRCASE.is_legal(d)));
        let open = STAIRCASE.with_tile(0, 0, 0);
        assert!(!open.is_game_over());
        let mergeable = STAIRCASE.with_tile(0, 1, 2);
        assert!(!mergeable.is_game_over());
        assert!(!Board::EMPTY.is_game_over());
    }

    #[test]
    fn it_count_empty() {
        let game = Board::from_rows([[2, 2, 2, 2], [0; 4], [2, 2, 2, 2], [0; 4]]);
        assert_eq!(game.count_empty(), 8);
        assert_eq!(game.empty_cells()[0], (1, 0));
        assert_eq!(Board::EMPTY.count_empty(), 16);
        assert_eq!(STAIRCASE.count_empty(), 0);
    }

    #[test]
    fn it_highest_tile_and_corner() {
        assert_eq!(STAIRCASE.highest_tile(), 128);
        assert!(STAIRCASE.is_max_tile_in_corner());
        assert_eq!(Board::EMPTY.highest_tile(), 0);
        let center = Board::from_rows([[2, 4, 8, 16], [4, 256, 16, 32], [8, 16, 32, 64], [16, 32, 64, 0]]);
        assert_eq!(center.count_empty(), 1);
        assert!(!center.is_max_tile_in_corner());
    }

    #[test]
    fn it_insert_random_tile() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Board::EMPTY;
        for _ in 0..16 {
            game = game.with_random_tile(&mut rng);
        }
        assert_eq!(game.count_empty(), 0);
        assert!(game.rows().iter().flatten().all(|&v| v == 2 || v == 4));
        assert_eq!(game.with_random_tile(&mut rng), game);
    }

    fn from_vec(rows: Vec<Vec<Tile>>) -> Result<Board, BoardError> { Board::try_from(rows) }

    #[test]
    fn it_try_from_vec() {
        let ok = from_vec(vec![vec![2, 0, 0, 0], vec![0; 4], vec![0; 4], vec![0, 0, 0, 4]]);
        assert_eq!(ok.map(|b| b.tile(3, 3)), Ok(4));
        assert_eq!(from_vec(vec![vec![0; 4]; 3]), Err(BoardError::RowCount(3)));
        assert_eq!(
            from_vec(vec![vec![0; 4], vec![0; 5], vec![0; 4], vec![0; 4]]),
            Err(BoardError::RowLength { row: 1, len: 5 })
        );
        assert_eq!(
            from_vec(vec![vec![0; 4], vec![0; 4], vec![0, 1, 0, 0], vec![0; 4]]),
            Err(BoardError::InvalidTile { row: 2, col: 1, value: 1 })
        );
        assert_eq!(
            from_vec(vec![vec![1 << 31, 1 << 31, 0, 0], vec![0; 4], vec![0; 4], vec![0; 4]]),
            Err(BoardError::InvalidTile { row: 0, col: 0, value: 1 << 31 })
        );
        assert_eq!(
            from_vec(vec![vec![1 << 30; 4], vec![1 << 30; 4], vec![2, 0, 0, 0], vec![0; 4]]),
            Err(BoardError::TileSum((1 << 33) + 2))
        );
    }

    #[test]
    fn largest_accepted_tiles_merge_without_overflow() {
        let b = Board::try_from_rows([[MAX_TILE, MAX_TILE, 0, 0], [0; 4], [0; 4], [0; 4]]).expect("within limits");
        let (moved, gained) = b.shift_with_score(Move::Left);
        assert_eq!(moved.rows()[0], [1 << 31, 0, 0, 0]);
        assert_eq!(gained, 1 << 31);
        assert_eq!(moved.tile_sum(), b.tile_sum());
    }

    #[test]
    fn it_parse_move() {
        assert_eq!("up".parse::<Move>(), Ok(Move::Up));
        assert_eq!(" Right ".parse::<Move>(), Ok(Move::Right));
        assert!("north".parse::<Move>().is_err());
        for m in Move::ALL {
            assert_eq!(m.to_string().parse::<Move>(), Ok(m));
        }
    }
}
