//! Append-only record of committed boards.
//!
//! Entry `i` is the board after move `i`; entry 0 is the pregame board. The
//! game contract takes entries 0-3 in one `startGame` call and every later
//! entry in its own `play` call, so the first four entries are batched.

use alloy_primitives::U256;

use crate::board::Direction;
use crate::codec::EncodedMove;
use crate::error::InputError;

/// Number of boards in the start-of-game commitment.
pub const START_BATCH_LEN: usize = 4;

/// The pregame board and the boards after the first three moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartGameBatch {
    pub boards: [EncodedMove; START_BATCH_LEN],
    /// Directions of moves 1-3.
    pub directions: [Direction; START_BATCH_LEN - 1],
}

impl StartGameBatch {
    /// Build a batch from exactly [`START_BATCH_LEN`] log entries.
    pub fn from_entries(entries: &[EncodedMove]) -> Result<Self, InputError> {
        let boards: [EncodedMove; START_BATCH_LEN] =
            entries.try_into().map_err(|_| InputError::WrongBatchSize {
                expected: START_BATCH_LEN,
                actual: entries.len(),
            })?;
        let directions = [
            boards[1].direction()?,
            boards[2].direction()?,
            boards[3].direction()?,
        ];
        Ok(StartGameBatch { boards, directions })
    }

    pub fn raw_boards(&self) -> [U256; START_BATCH_LEN] {
        self.boards.map(|b| b.raw())
    }
}

/// A single move committed after the start batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayCommitment {
    pub board: EncodedMove,
    pub direction: Direction,
    pub move_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveLog {
    /// Move index of `entries[0]`. Zero unless the log was resumed.
    base: u64,
    entries: Vec<EncodedMove>,
}

impl MoveLog {
    /// Start a log holding the pregame board.
    pub fn new(initial: EncodedMove) -> Self {
        MoveLog {
            base: 0,
            entries: vec![initial],
        }
    }

    /// Start a log mid-game, e.g. after a resync from chain state.
    pub fn resume(base: u64, current: EncodedMove) -> Self {
        MoveLog {
            base,
            entries: vec![current],
        }
    }

    /// Append the next board; returns its move index.
    pub fn append(&mut self, encoded: EncodedMove) -> u64 {
        self.entries.push(encoded);
        self.next_index() - 1
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move index the next appended board will get.
    pub fn next_index(&self) -> u64 {
        self.base + self.entries.len() as u64
    }

    pub fn entries(&self) -> &[EncodedMove] {
        &self.entries
    }

    pub fn latest(&self) -> Option<EncodedMove> {
        self.entries.last().copied()
    }

    pub fn get(&self, index: u64) -> Option<EncodedMove> {
        let offset = index.checked_sub(self.base)?;
        self.entries.get(offset as usize).copied()
    }

    /// `count` entries starting at move index `start`.
    pub fn slice(&self, start: u64, count: usize) -> Result<&[EncodedMove], InputError> {
        if start < self.base {
            return Err(self.out_of_range(start));
        }
        let end = start
            .checked_add(count as u64)
            .ok_or_else(|| self.out_of_range(start))?;
        if end > self.next_index() {
            return Err(self.out_of_range(end - 1));
        }
        let offset = (start - self.base) as usize;
        Ok(&self.entries[offset..offset + count])
    }

    /// Entries 0-3 as one commitment.
    pub fn start_batch(&self) -> Result<StartGameBatch, InputError> {
        if self.base != 0 {
            return Err(InputError::BatchNotAvailable("log was resumed mid-game"));
        }
        if self.entries.len() < START_BATCH_LEN {
            return Err(InputError::WrongBatchSize {
                expected: START_BATCH_LEN,
                actual: self.entries.len(),
            });
        }
        StartGameBatch::from_entries(self.slice(0, START_BATCH_LEN)?)
    }

    /// The commitment for a move after the start batch.
    pub fn play_commitment(&self, index: u64) -> Result<PlayCommitment, InputError> {
        if index < START_BATCH_LEN as u64 {
            return Err(InputError::BatchNotAvailable("moves 0-3 belong to the start batch"));
        }
        let board = self.get(index).ok_or_else(|| self.out_of_range(index))?;
        Ok(PlayCommitment {
            board,
            direction: board.direction()?,
            move_index: index,
        })
    }

    /// Play commitments with an index above `acknowledged`, oldest first.
    pub fn pending_commitments(&self, acknowledged: u64) -> impl Iterator<Item = PlayCommitment> + '_ {
        let first = acknowledged.saturating_add(1).max(START_BATCH_LEN as u64).max(self.base);
        (first..self.next_index()).filter_map(move |index| self.play_commitment(index).ok())
    }

    fn out_of_range(&self, index: u64) -> InputError {
        InputError::OutOfRange {
            index,
            start: self.base,
            end: self.next_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_exponents;

    fn entry(marker: u8, direction: Direction) -> EncodedMove {
        let mut exps = [0u8; 16];
        exps[0] = marker;
        encode_exponents(&exps, direction)
    }

    fn log_with(moves: usize) -> MoveLog {
        let mut log = MoveLog::new(entry(1, Direction::Up));
        for i in 0..moves {
            log.append(entry(2 + i as u8, Direction::all()[i % 4]));
        }
        log
    }

    #[test]
    fn test_append_returns_indices() {
        let mut log = MoveLog::new(entry(1, Direction::Up));
        assert_eq!(log.append(entry(2, Direction::Left)), 1);
        assert_eq!(log.append(entry(3, Direction::Down)), 2);
        assert_eq!(log.len(), 3);
        assert_eq!(log.next_index(), 3);
        assert_eq!(log.get(0), Some(entry(1, Direction::Up)));
    }

    #[test]
    fn test_slice_bounds() {
        let log = log_with(5);
        assert_eq!(log.slice(2, 3).unwrap().len(), 3);
        assert_eq!(log.slice(0, 0).unwrap().len(), 0);
        assert_eq!(
            log.slice(4, 3),
            Err(InputError::OutOfRange { index: 6, start: 0, end: 6 })
        );
    }

    #[test]
    fn test_slice_huge_start_is_out_of_range() {
        let log = log_with(5);
        assert_eq!(
            log.slice(u64::MAX, 1),
            Err(InputError::OutOfRange { index: u64::MAX, start: 0, end: 6 })
        );
        assert!(matches!(log.slice(3, usize::MAX), Err(InputError::OutOfRange { .. })));
    }

    #[test]
    fn test_slice_before_resumed_base() {
        let mut log = MoveLog::resume(9, entry(4, Direction::Up));
        log.append(entry(5, Direction::Left));
        assert_eq!(
            log.slice(8, 2),
            Err(InputError::OutOfRange { index: 8, start: 9, end: 11 })
        );
        assert_eq!(log.slice(9, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_pending_after_max_acknowledged_is_empty() {
        let log = log_with(6);
        assert_eq!(log.pending_commitments(u64::MAX).count(), 0);
    }

    #[test]
    fn test_start_batch_needs_four_entries() {
        let log = log_with(2);
        assert_eq!(
            log.start_batch(),
            Err(InputError::WrongBatchSize { expected: 4, actual: 3 })
        );

        let log = log_with(3);
        let batch = log.start_batch().unwrap();
        assert_eq!(batch.boards[0], entry(1, Direction::Up));
        assert_eq!(batch.directions, [Direction::Up, Direction::Down, Direction::Left]);
    }

    #[test]
    fn test_batch_rejects_other_sizes() {
        let log = log_with(6);
        for n in [0, 3, 5, 7] {
            let entries = &log.entries()[..n];
            assert_eq!(
                StartGameBatch::from_entries(entries),
                Err(InputError::WrongBatchSize { expected: 4, actual: n })
            );
        }
    }

    #[test]
    fn test_play_commitment_after_batch() {
        let log = log_with(5);
        assert!(matches!(log.play_commitment(3), Err(InputError::BatchNotAvailable(_))));
        let commitment = log.play_commitment(4).unwrap();
        assert_eq!(commitment.move_index, 4);
        assert_eq!(commitment.direction, Direction::Right);
        assert!(matches!(log.play_commitment(9), Err(InputError::OutOfRange { .. })));
    }

    #[test]
    fn test_pending_commitments() {
        let log = log_with(6);
        let all: Vec<u64> = log.pending_commitments(0).map(|c| c.move_index).collect();
        assert_eq!(all, vec![4, 5, 6]);
        let rest: Vec<u64> = log.pending_commitments(5).map(|c| c.move_index).collect();
        assert_eq!(rest, vec![6]);
    }

    #[test]
    fn test_resumed_log_uses_absolute_indices() {
        let mut log = MoveLog::resume(9, entry(4, Direction::Up));
        assert_eq!(log.append(entry(5, Direction::Left)), 10);
        assert_eq!(log.get(8), None);
        assert_eq!(log.get(10), Some(entry(5, Direction::Left)));
        assert!(matches!(log.start_batch(), Err(InputError::BatchNotAvailable(_))));
        assert_eq!(log.play_commitment(10).unwrap().move_index, 10);
    }
}
