//! Audit a recorded move log.
//!
//! With seeded spawns every board in a log is a function of the session id,
//! the previous board and the recorded direction. The verifier rebuilds each
//! board from scratch and reports the first entry that does not match.

use tracing::{debug, warn};

use crate::board::{Board, Direction};
use crate::codec::EncodedMove;
use crate::config::{EngineConfig, SpawnMode};
use crate::engine::GameEngine;
use crate::error::{GameError, ReplayError};
use crate::move_log::MoveLog;
use crate::session::SessionId;

impl From<GameError> for ReplayError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::Input(e) => ReplayError::Input(e),
            GameError::Encoding(e) => ReplayError::Encoding(e),
        }
    }
}

/// Summary of a successful replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Moves checked (log entries after the first).
    pub moves: usize,
    pub final_board: Board,
    /// Points scored over the replayed moves.
    pub gained: u64,
}

fn seeded_engine() -> GameEngine {
    GameEngine::new(EngineConfig {
        spawn: SpawnMode::Seeded,
        ..EngineConfig::default()
    })
}

/// The pregame board every seeded game for `session` starts from.
pub fn initial_board(session: SessionId) -> Result<Board, GameError> {
    let mut engine = seeded_engine();
    engine.initialize(session).cloned()
}

/// Verify a complete log, pregame board included.
pub fn verify_log(session: SessionId, entries: &[EncodedMove]) -> Result<ReplayReport, ReplayError> {
    let (first, rest) = entries.split_first().ok_or(ReplayError::EmptyLog)?;
    let mut engine = seeded_engine();
    engine.initialize(session)?;
    let expected = engine.log().and_then(MoveLog::latest).unwrap_or_default();
    if expected != *first {
        return Err(mismatch(0, expected, *first));
    }
    check_moves(&mut engine, 1, rest)
}

/// Verify a log segment whose first entry is trusted, e.g. a board read back
/// from chain. `base` is the move index of `entries[0]`.
pub fn verify_segment(session: SessionId, base: u64, entries: &[EncodedMove]) -> Result<ReplayReport, ReplayError> {
    let (first, rest) = entries.split_first().ok_or(ReplayError::EmptyLog)?;
    let mut engine = seeded_engine();
    engine.resync(session, &first.exponents(), 0, base + 1)?;
    check_moves(&mut engine, base + 1, rest)
}

/// Play `directions` on a fresh seeded game, skipping those that do not
/// change the board. Returns the report and the log a player would commit.
pub fn replay_moves(session: SessionId, directions: &[Direction]) -> Result<(ReplayReport, MoveLog), GameError> {
    let mut engine = seeded_engine();
    engine.initialize(session)?;
    let mut moves = 0;
    for &direction in directions {
        if engine.play(direction)?.moved {
            moves += 1;
        }
    }
    let report = ReplayReport {
        moves,
        final_board: engine.board().cloned().unwrap_or_default(),
        gained: engine.score(),
    };
    Ok((report, engine.log().cloned().unwrap_or_else(|| MoveLog::new(EncodedMove::default()))))
}

fn check_moves(engine: &mut GameEngine, first_index: u64, entries: &[EncodedMove]) -> Result<ReplayReport, ReplayError> {
    let start_score = engine.score();
    for (offset, entry) in entries.iter().enumerate() {
        let index = first_index + offset as u64;
        let outcome = engine.play(entry.direction()?)?;
        let Some(expected) = outcome.encoded else {
            warn!(index, "recorded move changes nothing");
            return Err(ReplayError::NoMove { index });
        };
        if expected != *entry {
            return Err(mismatch(index, expected, *entry));
        }
    }
    debug!(moves = entries.len(), "move log verified");
    Ok(ReplayReport {
        moves: entries.len(),
        final_board: engine.board().cloned().unwrap_or_default(),
        gained: engine.score() - start_score,
    })
}

fn mismatch(index: u64, expected: EncodedMove, actual: EncodedMove) -> ReplayError {
    warn!(index, expected = %format!("{:#x}", expected), actual = %format!("{:#x}", actual), "board mismatch");
    ReplayError::Mismatch {
        index,
        expected: expected.raw(),
        actual: actual.raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_exponents;
    use crate::error::InputError;
    use alloy_primitives::U256;

    fn session() -> SessionId {
        SessionId::from_bytes([0x5a; 32])
    }

    fn cycle(n: usize) -> Vec<Direction> {
        (0..n).map(|i| Direction::all()[i % 4]).collect()
    }

    #[test]
    fn test_initial_board_is_stable() {
        let a = initial_board(session()).unwrap();
        let b = initial_board(session()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tile_count(), 2);
    }

    #[test]
    fn test_replayed_log_verifies() {
        let (played, log) = replay_moves(session(), &cycle(40)).unwrap();
        let report = verify_log(session(), log.entries()).unwrap();
        assert_eq!(report.moves, played.moves);
        assert_eq!(report.final_board, played.final_board);
        assert_eq!(report.gained, played.gained);
    }

    #[test]
    fn test_empty_log_rejected() {
        assert_eq!(verify_log(session(), &[]), Err(ReplayError::EmptyLog));
    }

    #[test]
    fn test_wrong_session_fails_at_pregame_board() {
        let (_, log) = replay_moves(session(), &cycle(5)).unwrap();
        let other = SessionId::from_bytes([0x11; 32]);
        match verify_log(other, log.entries()) {
            Err(ReplayError::Mismatch { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_entry_reported() {
        let (_, log) = replay_moves(session(), &cycle(12)).unwrap();
        let mut entries = log.entries().to_vec();
        let original = entries[3];
        entries[3] = EncodedMove::from_raw(original.raw() ^ U256::from(1u8));
        match verify_log(session(), &entries) {
            Err(ReplayError::Mismatch { index, expected, actual }) => {
                assert_eq!(index, 3);
                assert_eq!(expected, original.raw());
                assert_eq!(actual, entries[3].raw());
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_noop_direction_reported() {
        let mut exps = [0u8; 16];
        exps[0] = 1;
        // A single tile in the top-left corner cannot move up.
        let entries = [
            encode_exponents(&exps, Direction::Up),
            encode_exponents(&exps, Direction::Up),
        ];
        assert_eq!(
            verify_segment(session(), 7, &entries),
            Err(ReplayError::NoMove { index: 8 })
        );
    }

    #[test]
    fn test_bad_direction_byte() {
        let (_, log) = replay_moves(session(), &cycle(3)).unwrap();
        let mut entries = log.entries().to_vec();
        entries[1] = EncodedMove::from_raw(entries[1].raw() | (U256::from(9u8) << 128usize));
        assert!(matches!(
            verify_log(session(), &entries),
            Err(ReplayError::Input(InputError::InvalidDirection(_)))
        ));
    }

    #[test]
    fn test_segment_from_midgame() {
        let (_, log) = replay_moves(session(), &cycle(30)).unwrap();
        let base = 10;
        let segment = log.slice(base, log.len() - base as usize).unwrap();
        let report = verify_segment(session(), base, segment).unwrap();
        assert_eq!(report.moves, segment.len() - 1);
    }
}
