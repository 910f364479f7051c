//! ABI of the on-chain game contract and the seams to whatever talks to it.
//!
//! Nothing here sends transactions. Callers plug a [`CommitmentSink`] and a
//! [`ChainStateReader`] backed by their own RPC client.

use alloy_sol_types::{sol, SolCall};
use tracing::debug;

use crate::board::CELLS;
use crate::codec;
use crate::error::{ContractError, SyncError};
use crate::move_log::{MoveLog, PlayCommitment, StartGameBatch, START_BATCH_LEN};
use crate::session::SessionId;

sol! {
    function startGame(bytes32 gameId, uint256[4] game);
    function play(bytes32 gameId, uint256 resultBoard);
    function getBoard(bytes32 gameId) external view returns (uint8[16] boardArr, uint256 nextMoveNumber);
    function latestBoard(bytes32 gameId) external view returns (uint256 board);
}

/// The latest board the contract holds for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainBoard {
    /// Per-cell exponents, row-major, 0 for empty.
    pub exponents: [u8; CELLS],
    /// Index the next `play` will be recorded under.
    pub next_move_index: u64,
}

/// Submits commitments to the contract.
pub trait CommitmentSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn submit_start(&mut self, session: SessionId, batch: &StartGameBatch) -> Result<(), Self::Error>;

    fn submit_play(&mut self, session: SessionId, commitment: &PlayCommitment) -> Result<(), Self::Error>;
}

/// Reads committed state back from the contract.
pub trait ChainStateReader {
    type Error: std::error::Error + Send + Sync + 'static;

    fn latest_board(&self, session: SessionId) -> Result<ChainBoard, Self::Error>;
}

/// Calldata for `startGame(gameId, game)`.
pub fn start_game_call(session: SessionId, batch: &StartGameBatch) -> Vec<u8> {
    startGameCall {
        gameId: session.as_b256(),
        game: batch.raw_boards(),
    }
    .abi_encode()
}

/// Calldata for `play(gameId, resultBoard)`.
pub fn play_call(session: SessionId, commitment: &PlayCommitment) -> Vec<u8> {
    playCall {
        gameId: session.as_b256(),
        resultBoard: commitment.board.raw(),
    }
    .abi_encode()
}

/// Calldata for the `getBoard(gameId)` view.
pub fn get_board_call(session: SessionId) -> Vec<u8> {
    getBoardCall {
        gameId: session.as_b256(),
    }
    .abi_encode()
}

/// Decode the return data of `getBoard`.
pub fn decode_board_read(data: &[u8]) -> Result<ChainBoard, ContractError> {
    let ret = getBoardCall::abi_decode_returns(data)?;
    let next_move_index =
        u64::try_from(ret.nextMoveNumber).map_err(|_| ContractError::MoveIndexOverflow(ret.nextMoveNumber))?;
    Ok(ChainBoard {
        exponents: ret.boardArr,
        next_move_index,
    })
}

/// Calldata for the `latestBoard(gameId)` view.
pub fn latest_board_call(session: SessionId) -> Vec<u8> {
    latestBoardCall {
        gameId: session.as_b256(),
    }
    .abi_encode()
}

/// Decode the return data of `latestBoard`: the packed board as stored on
/// chain, unpacked into per-cell exponents.
pub fn decode_latest_board(data: &[u8]) -> Result<[u8; CELLS], ContractError> {
    let packed = latestBoardCall::abi_decode_returns(data)?;
    Ok(codec::decode(packed))
}

/// Push everything in `log` the contract has not acknowledged yet.
///
/// `acknowledged` is the highest move index the contract holds, or `None`
/// if `startGame` has not been sent. The start batch goes out once the log
/// holds four boards; until then nothing is sent. Returns the new
/// acknowledged index.
pub fn submit_pending<S: CommitmentSink>(
    session: SessionId,
    log: &MoveLog,
    sink: &mut S,
    acknowledged: Option<u64>,
) -> Result<Option<u64>, SyncError<S::Error>> {
    let mut acked = match acknowledged {
        Some(index) => index,
        None if log.base() == 0 && log.len() < START_BATCH_LEN => return Ok(None),
        None => {
            let batch = log.start_batch()?;
            sink.submit_start(session, &batch).map_err(SyncError::Submit)?;
            debug!(%session, "start batch submitted");
            START_BATCH_LEN as u64 - 1
        }
    };

    for commitment in log.pending_commitments(acked) {
        sink.submit_play(session, &commitment).map_err(SyncError::Submit)?;
        debug!(%session, move_index = commitment.move_index, "move submitted");
        acked = commitment.move_index;
    }
    Ok(Some(acked))
}
