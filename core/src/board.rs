//! Board value types: directions, positions, tiles and the 4x4 board.
//!
//! A [`Board`] is an immutable snapshot. Each move builds a fresh board from
//! the previous one; nothing here mutates a board in place once it has been
//! handed out.

use serde::{Deserialize, Serialize};

use crate::codec::MAX_EXPONENT;
use crate::error::{EncodingError, InputError};

/// Width and height of the board.
pub const SIZE: usize = 4;

/// Number of cells on the board.
pub const CELLS: usize = SIZE * SIZE;

/// The four possible move directions, numbered as they are committed on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// Convert a u8 to a Direction (0=Up, 1=Down, 2=Left, 3=Right).
    pub fn from_u8(value: u8) -> Result<Direction, InputError> {
        match value {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Down),
            2 => Ok(Direction::Left),
            3 => Ok(Direction::Right),
            other => Err(InputError::InvalidDirection(other)),
        }
    }

    /// Get all four directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }

    /// Unit step as (row delta, col delta).
    pub fn vector(self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// A cell coordinate. Both components are in `0..4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Self {
        debug_assert!((row as usize) < SIZE && (col as usize) < SIZE);
        Position { row, col }
    }

    /// Row-major cell index, `row * 4 + col`.
    pub fn index(self) -> usize {
        self.row as usize * SIZE + self.col as usize
    }

    pub fn from_index(index: usize) -> Self {
        Position::new((index / SIZE) as u8, (index % SIZE) as u8)
    }

    /// The neighbouring cell one step in `direction`, if it is on the board.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dr, dc) = direction.vector();
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        let range = 0..SIZE as i8;
        if range.contains(&row) && range.contains(&col) {
            Some(Position::new(row as u8, col as u8))
        } else {
            None
        }
    }
}

/// Opaque tile identity. Allocated by the engine and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

/// Hands out fresh [`TileId`]s.
#[derive(Debug, Clone, Default)]
pub struct TileIds {
    next: u64,
}

impl TileIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> TileId {
        let id = TileId(self.next);
        self.next += 1;
        id
    }
}

/// A numbered tile sitting on one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub value: u32,
    pub position: Position,
}

/// The 4x4 grid plus the running score.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Tile>; CELLS],
    score: u64,
}

impl Board {
    /// An empty board with a zero score.
    pub fn empty() -> Self {
        Board {
            cells: [None; CELLS],
            score: 0,
        }
    }

    /// Build a board from loose tiles.
    ///
    /// Fails with [`EncodingError::CellCollision`] if two tiles claim the
    /// same cell.
    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>, score: u64) -> Result<Self, EncodingError> {
        let mut cells = [None; CELLS];
        for tile in tiles {
            let slot = &mut cells[tile.position.index()];
            if slot.is_some() {
                return Err(EncodingError::CellCollision {
                    row: tile.position.row,
                    col: tile.position.col,
                });
            }
            *slot = Some(tile);
        }
        Ok(Board { cells, score })
    }

    /// Rebuild a board from per-cell exponents (0 = empty), giving every tile
    /// a fresh id.
    pub fn from_exponents(exponents: &[u8; CELLS], score: u64, ids: &mut TileIds) -> Result<Self, InputError> {
        if let Some((index, &exponent)) = exponents.iter().enumerate().find(|(_, &e)| e > MAX_EXPONENT) {
            return Err(InputError::InvalidExponent { index, exponent });
        }
        let mut cells = [None; CELLS];
        for (index, &exponent) in exponents.iter().enumerate() {
            if exponent != 0 {
                cells[index] = Some(Tile {
                    id: ids.fresh(),
                    value: 1 << exponent,
                    position: Position::from_index(index),
                });
            }
        }
        Ok(Board { cells, score })
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn tile_at(&self, position: Position) -> Option<&Tile> {
        self.cells[position.index()].as_ref()
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Empty cells in row-major order (row ascending, then column ascending).
    pub fn empty_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| Position::from_index(i))
            .collect()
    }

    /// Tile values in row-major order, 0 for an empty cell.
    pub fn values(&self) -> [u32; CELLS] {
        let mut out = [0; CELLS];
        for tile in self.tiles() {
            out[tile.position.index()] = tile.value;
        }
        out
    }

    /// Highest tile value on the board, 0 when empty.
    pub fn max_tile(&self) -> u32 {
        self.tiles().map(|t| t.value).max().unwrap_or(0)
    }

    pub(crate) fn with_score(mut self, score: u64) -> Self {
        self.score = score;
        self
    }

    pub(crate) fn place(&mut self, tile: Tile) {
        self.cells[tile.position.index()] = Some(tile);
    }

    pub(crate) fn take(&mut self, position: Position) -> Option<Tile> {
        self.cells[position.index()].take()
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Board {{ score: {} }}", self.score)?;
        for row in self.values().chunks(SIZE) {
            for &val in row {
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", val)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Score: {}", self.score)?;
        writeln!(f, "+------+------+------+------+")?;
        for row in self.values().chunks(SIZE) {
            write!(f, "|")?;
            for &val in row {
                if val == 0 {
                    write!(f, "      |")?;
                } else {
                    write!(f, "{:^6}|", val)?;
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: u64, value: u32, row: u8, col: u8) -> Tile {
        Tile {
            id: TileId(id),
            value,
            position: Position::new(row, col),
        }
    }

    #[test]
    fn test_direction_from_u8() {
        assert_eq!(Direction::from_u8(0), Ok(Direction::Up));
        assert_eq!(Direction::from_u8(1), Ok(Direction::Down));
        assert_eq!(Direction::from_u8(2), Ok(Direction::Left));
        assert_eq!(Direction::from_u8(3), Ok(Direction::Right));
        assert_eq!(Direction::from_u8(4), Err(InputError::InvalidDirection(4)));
        assert_eq!(Direction::Right as u8, 3);
    }

    #[test]
    fn test_position_step_stays_on_board() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.step(Direction::Up), None);
        assert_eq!(corner.step(Direction::Left), None);
        assert_eq!(corner.step(Direction::Right), Some(Position::new(0, 1)));
        assert_eq!(corner.step(Direction::Down), Some(Position::new(1, 0)));
        assert_eq!(Position::new(3, 3).step(Direction::Down), None);
    }

    #[test]
    fn test_from_tiles_rejects_collision() {
        let result = Board::from_tiles([tile(0, 2, 1, 2), tile(1, 4, 1, 2)], 0);
        assert_eq!(result, Err(EncodingError::CellCollision { row: 1, col: 2 }));
    }

    #[test]
    fn test_empty_positions_row_major() {
        let board = Board::from_tiles([tile(0, 2, 0, 1), tile(1, 2, 2, 0)], 0).unwrap();
        let empty = board.empty_positions();
        assert_eq!(empty.len(), 14);
        assert_eq!(empty[0], Position::new(0, 0));
        assert_eq!(empty[1], Position::new(0, 2));
        assert_eq!(empty[13], Position::new(3, 3));
        assert!(!empty.contains(&Position::new(2, 0)));
    }

    #[test]
    fn test_from_exponents_assigns_fresh_ids() {
        let mut exps = [0u8; 16];
        exps[0] = 1;
        exps[15] = 11;
        let mut ids = TileIds::new();
        let board = Board::from_exponents(&exps, 8, &mut ids).unwrap();
        assert_eq!(board.values()[0], 2);
        assert_eq!(board.values()[15], 2048);
        assert_eq!(board.score(), 8);
        let ids: Vec<_> = board.tiles().map(|t| t.id).collect();
        assert_eq!(ids, vec![TileId(0), TileId(1)]);
    }

    #[test]
    fn test_from_exponents_rejects_large_exponent() {
        let mut exps = [0u8; 16];
        exps[3] = 31;
        let err = Board::from_exponents(&exps, 0, &mut TileIds::new()).unwrap_err();
        assert_eq!(err, InputError::InvalidExponent { index: 3, exponent: 31 });

        exps[3] = 17;
        let board = Board::from_exponents(&exps, 0, &mut TileIds::new()).unwrap();
        assert_eq!(board.values()[3], 131072);
    }

    #[test]
    fn test_display_format() {
        let board = Board::from_tiles([tile(0, 2048, 0, 0)], 20).unwrap();
        let display = format!("{}", board);
        assert!(display.contains("Score: 20"));
        assert!(display.contains("2048"));
        assert!(display.contains("+------+"));
    }
}
