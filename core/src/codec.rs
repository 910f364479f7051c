//! Bit-packed board commitment format.
//!
//! Layout of an [`EncodedMove`] (a single `uint256`):
//!
//! ```text
//!  bits 136..256   unused (zero)
//!  bits 128..136   direction (0=Up, 1=Down, 2=Left, 3=Right)
//!  bits   0..128   board field: 16 x 8-bit slots, slot i at bits (15-i)*8
//! ```
//!
//! Slot `i` is cell `row*4 + col` and holds `log2(value)`, 0 for an empty
//! cell. Cell (0,0) is therefore the most significant byte of the board
//! field and cell (3,3) the least significant.

use alloy_primitives::U256;

use crate::board::{Board, Direction, CELLS};
use crate::error::{EncodingError, InputError};

/// Largest exponent a committed tile may carry. Merging two such tiles still
/// fits a `u32`; a 4x4 board cannot get past 2^17 anyway.
pub const MAX_EXPONENT: u8 = 30;

/// Bit offset of the direction field.
pub const DIRECTION_SHIFT: usize = 128;

const SLOT_BITS: usize = 8;
const SLOT_MASK: u64 = 0xff;

/// A board plus the direction that produced it, packed into one `uint256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EncodedMove(U256);

impl EncodedMove {
    /// Wrap a raw integer as read back from the chain.
    pub fn from_raw(raw: U256) -> Self {
        EncodedMove(raw)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    /// The low 128 bits: the sixteen exponent slots.
    pub fn board_field(&self) -> U256 {
        self.0 & board_mask()
    }

    pub fn direction(&self) -> Result<Direction, InputError> {
        let byte = ((self.0 >> DIRECTION_SHIFT) & U256::from(SLOT_MASK)).to::<u8>();
        Direction::from_u8(byte)
    }

    /// Per-cell exponents of the board field.
    pub fn exponents(&self) -> [u8; CELLS] {
        decode(self.board_field())
    }
}

impl From<EncodedMove> for U256 {
    fn from(encoded: EncodedMove) -> Self {
        encoded.0
    }
}

impl std::fmt::LowerHex for EncodedMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::LowerHex::fmt(&self.0, f)
    }
}

fn board_mask() -> U256 {
    (U256::from(1u8) << DIRECTION_SHIFT) - U256::from(1u8)
}

fn slot_shift(index: usize) -> usize {
    (CELLS - 1 - index) * SLOT_BITS
}

/// `log2(value)` for a tile value that is a power of two of at least 2.
pub fn exponent_of(value: u32) -> Result<u8, EncodingError> {
    if value < 2 || !value.is_power_of_two() || value.trailing_zeros() > MAX_EXPONENT as u32 {
        return Err(EncodingError::InvalidTileValue { value });
    }
    Ok(value.trailing_zeros() as u8)
}

/// Pack a board and the direction of the move that produced it.
pub fn encode(board: &Board, direction: Direction) -> Result<EncodedMove, EncodingError> {
    let mut exponents = [0u8; CELLS];
    for tile in board.tiles() {
        exponents[tile.position.index()] = exponent_of(tile.value)?;
    }
    Ok(encode_exponents(&exponents, direction))
}

/// Pack raw exponents. Callers are responsible for keeping them `<= MAX_EXPONENT`.
pub fn encode_exponents(exponents: &[u8; CELLS], direction: Direction) -> EncodedMove {
    let field = exponents
        .iter()
        .enumerate()
        .fold(U256::ZERO, |acc, (i, &e)| acc | (U256::from(e) << slot_shift(i)));
    EncodedMove(field | (U256::from(direction as u8) << DIRECTION_SHIFT))
}

/// Unpack a 128-bit board field into per-cell exponents (0 = empty).
///
/// Bits above the board field are ignored, so a full [`EncodedMove`] value
/// may be passed as well.
pub fn decode(board_field: U256) -> [u8; CELLS] {
    let mut out = [0u8; CELLS];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((board_field >> slot_shift(i)) & U256::from(SLOT_MASK)).to::<u8>();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Position, Tile, TileId, TileIds};

    fn board_of(values: [u32; 16]) -> Board {
        let tiles = values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(i, &v)| Tile {
                id: TileId(i as u64),
                value: v,
                position: Position::from_index(i),
            });
        Board::from_tiles(tiles, 0).unwrap()
    }

    #[test]
    fn test_single_tile_right() {
        let board = board_of([2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let encoded = encode(&board, Direction::Right).unwrap();

        let exps = encoded.exponents();
        assert_eq!(exps[0], 0x01);
        assert!(exps[1..].iter().all(|&e| e == 0));
        assert_eq!(encoded.board_field(), U256::from(1u8) << 120usize);
        assert_eq!(encoded.direction(), Ok(Direction::Right));
        assert_eq!(encoded.raw() >> 128usize, U256::from(3u8));
    }

    #[test]
    fn test_single_tile_left() {
        let board = board_of([2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let encoded = encode(&board, Direction::Left).unwrap();
        assert_eq!(encoded.board_field(), U256::from(1u8) << 120usize);
        assert_eq!(encoded.direction(), Ok(Direction::Left));
        assert_eq!(encoded.raw() >> 128usize, U256::from(2u8));
    }

    #[test]
    fn test_tiles_above_32768_encode() {
        let board = board_of([65536, 131072, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);
        let encoded = encode(&board, Direction::Up).unwrap();
        assert_eq!(&encoded.exponents()[..2], &[16, 17]);
        let rebuilt = Board::from_exponents(&encoded.exponents(), 0, &mut TileIds::new()).unwrap();
        assert_eq!(rebuilt.values(), board.values());
    }

    #[test]
    fn test_last_cell_is_low_byte() {
        let board = board_of([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]);
        let encoded = encode(&board, Direction::Up).unwrap();
        assert_eq!(encoded.raw(), U256::from(2u8));
    }

    #[test]
    fn test_round_trip_exponents() {
        let board = board_of([2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 0, 0, 32768, 2]);
        let encoded = encode(&board, Direction::Down).unwrap();
        assert_eq!(
            decode(encoded.board_field()),
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 0, 0, 15, 1]
        );

        let rebuilt = Board::from_exponents(&encoded.exponents(), 0, &mut TileIds::new()).unwrap();
        assert_eq!(rebuilt.values(), board.values());
    }

    #[test]
    fn test_decode_ignores_direction_bits() {
        let board = board_of([0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let encoded = encode(&board, Direction::Left).unwrap();
        assert_eq!(decode(encoded.raw()), decode(encoded.board_field()));
    }

    #[test]
    fn test_encode_is_idempotent() {
        let board = board_of([2, 2, 4, 0, 0, 0, 8, 0, 0, 16, 0, 0, 0, 0, 0, 2]);
        assert_eq!(
            encode(&board, Direction::Left).unwrap(),
            encode(&board, Direction::Left).unwrap()
        );
    }

    #[test]
    fn test_exponent_of_rejects_bad_values() {
        assert_eq!(exponent_of(2), Ok(1));
        assert_eq!(exponent_of(32768), Ok(15));
        assert_eq!(exponent_of(65536), Ok(16));
        assert_eq!(exponent_of(1 << 30), Ok(30));
        assert_eq!(
            exponent_of(1 << 31),
            Err(EncodingError::InvalidTileValue { value: 1 << 31 })
        );
        assert_eq!(exponent_of(0), Err(EncodingError::InvalidTileValue { value: 0 }));
        assert_eq!(exponent_of(1), Err(EncodingError::InvalidTileValue { value: 1 }));
        assert_eq!(exponent_of(6), Err(EncodingError::InvalidTileValue { value: 6 }));
        assert_eq!(
            exponent_of(u32::MAX),
            Err(EncodingError::InvalidTileValue { value: u32::MAX })
        );
    }

    #[test]
    fn test_encode_fails_without_partial_result() {
        let board = board_of([2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 12]);
        assert_eq!(
            encode(&board, Direction::Up),
            Err(EncodingError::InvalidTileValue { value: 12 })
        );
    }

    #[test]
    fn test_invalid_direction_byte() {
        let raw = U256::from(7u8) << DIRECTION_SHIFT;
        let encoded = EncodedMove::from_raw(raw);
        assert_eq!(encoded.direction(), Err(InputError::InvalidDirection(7)));
        assert_eq!(encoded.board_field(), U256::ZERO);
    }
}
