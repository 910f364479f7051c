//! Slide and merge rules.
//!
//! Everything here is a pure function of its inputs. Tiles are visited in an
//! order that starts at the edge the move points to, so a tile never stops
//! behind a neighbour that has not moved yet.

use serde::Serialize;

use crate::board::{Board, Direction, Position, Tile, TileId, TileIds, CELLS, SIZE};

/// One merge: `result` replaced the two tiles in `from` (mover first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Merge {
    pub result: TileId,
    pub from: [TileId; 2],
}

/// Presentation hints for one move. Not part of the board state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveAnnotations {
    /// Tiles placed by a spawn (or rebuilt during a resync).
    pub spawned: Vec<TileId>,
    pub merges: Vec<Merge>,
}

impl MoveAnnotations {
    pub fn is_new(&self, id: TileId) -> bool {
        self.spawned.contains(&id)
    }

    pub fn merged_from(&self, id: TileId) -> Option<[TileId; 2]> {
        self.merges.iter().find(|m| m.result == id).map(|m| m.from)
    }
}

/// Board after sliding, before the new tile is spawned.
#[derive(Debug, Clone)]
pub struct Slide {
    pub board: Board,
    pub moved: bool,
    /// Sum of the values of all tiles created by merges.
    pub gained: u64,
    pub merges: Vec<Merge>,
}

/// Row and column visiting order for `direction`.
fn traversal(direction: Direction) -> ([u8; SIZE], [u8; SIZE]) {
    const ASC: [u8; SIZE] = [0, 1, 2, 3];
    const DESC: [u8; SIZE] = [3, 2, 1, 0];
    match direction {
        Direction::Up | Direction::Left => (ASC, ASC),
        Direction::Down => (DESC, ASC),
        Direction::Right => (ASC, DESC),
    }
}

/// Walk from `start` while the next cell is on the board and free.
///
/// Returns the last free cell and the blocking cell after it, if any.
fn farthest_position(board: &Board, start: Position, direction: Direction) -> (Position, Option<Position>) {
    let mut current = start;
    loop {
        match current.step(direction) {
            Some(next) if board.tile_at(next).is_none() => current = next,
            blocker => return (current, blocker),
        }
    }
}

/// Slide every tile in `direction`, merging equal neighbours once.
///
/// Fresh ids for merged tiles come from `ids`.
pub fn slide(board: &Board, direction: Direction, ids: &mut TileIds) -> Slide {
    let mut next = board.clone();
    let mut merged = [false; CELLS];
    let mut merges = Vec::new();
    let mut gained = 0u64;
    let mut moved = false;

    let (rows, cols) = traversal(direction);
    for &row in &rows {
        for &col in &cols {
            let start = Position::new(row, col);
            let Some(tile) = next.tile_at(start).copied() else {
                continue;
            };

            let (farthest, blocker) = farthest_position(&next, start, direction);

            let target = blocker.and_then(|pos| next.tile_at(pos).copied());
            if let Some(target) = target.filter(|t| t.value == tile.value && !merged[t.position.index()]) {
                next.take(start);
                next.take(target.position);
                let result = Tile {
                    id: ids.fresh(),
                    value: tile.value * 2,
                    position: target.position,
                };
                next.place(result);
                merged[target.position.index()] = true;
                merges.push(Merge {
                    result: result.id,
                    from: [tile.id, target.id],
                });
                gained += result.value as u64;
                moved = true;
            } else if farthest != start {
                next.take(start);
                next.place(Tile {
                    position: farthest,
                    ..tile
                });
                moved = true;
            }
        }
    }

    let score = board.score() + gained;
    Slide {
        board: next.with_score(score),
        moved,
        gained,
        merges,
    }
}

/// True only for a full board with no equal neighbours in any row or column.
pub fn is_over(board: &Board) -> bool {
    if !board.is_full() {
        return false;
    }
    let values = board.values();
    for row in 0..SIZE {
        for col in 0..SIZE {
            let v = values[row * SIZE + col];
            if col + 1 < SIZE && values[row * SIZE + col + 1] == v {
                return false;
            }
            if row + 1 < SIZE && values[(row + 1) * SIZE + col] == v {
                return false;
            }
        }
    }
    true
}

/// Whether sliding in `direction` would change the board.
pub fn can_move(board: &Board, direction: Direction) -> bool {
    slide(board, direction, &mut TileIds::new()).moved
}

/// Legality of each direction as [Up, Down, Left, Right].
pub fn legal_directions(board: &Board) -> [bool; 4] {
    Direction::all().map(|d| can_move(board, d))
}
