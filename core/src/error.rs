//! Error taxonomy for the engine, codec, move log and replay verifier.
//!
//! Input errors are raised before any state is touched. Encoding errors are
//! defensive: a board built through the engine never trips them.

use thiserror::Error;

/// Rejected caller input. The engine state is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("malformed player address: {0}")]
    MalformedAddress(String),
    #[error("malformed session id: {0}")]
    MalformedSessionId(String),
    #[error("start batch needs exactly {expected} boards, got {actual}")]
    WrongBatchSize { expected: usize, actual: usize },
    #[error("invalid direction value {0} (expected 0-3)")]
    InvalidDirection(u8),
    #[error("cell {index} holds exponent {exponent}, above the maximum of 30")]
    InvalidExponent { index: usize, exponent: u8 },
    #[error("no game in progress")]
    NoActiveGame,
    #[error("move index {index} is outside the log (entries {start}..{end})")]
    OutOfRange { index: u64, start: u64, end: u64 },
    #[error("next move index must be at least 1, got {0}")]
    InvalidMoveIndex(u64),
    #[error("start batch is not available: {0}")]
    BatchNotAvailable(&'static str),
}

/// A board that cannot be packed into the commitment format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("tile value {value} is not a power of two between 2 and 2^30")]
    InvalidTileValue { value: u32 },
    #[error("two tiles occupy cell ({row}, {col})")]
    CellCollision { row: u8, col: u8 },
}

/// Any failure surfaced by [`crate::GameEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Failure while auditing a recorded move log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("board at move {index} does not match: expected {expected:#x}, recorded {actual:#x}")]
    Mismatch {
        index: u64,
        expected: alloy_primitives::U256,
        actual: alloy_primitives::U256,
    },
    #[error("move log is empty")]
    EmptyLog,
    #[error("move {index} records a direction that does not change the board")]
    NoMove { index: u64 },
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Failure decoding data returned by the game contract.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("ABI decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),
    #[error("next move number {0} does not fit in 64 bits")]
    MoveIndexOverflow(alloy_primitives::U256),
}

/// Failure while exchanging state with the chain through a caller-supplied
/// reader or sink.
#[derive(Debug, Error)]
pub enum SyncError<E: std::error::Error + 'static> {
    #[error("chain read failed: {0}")]
    Read(#[source] E),
    #[error("commitment submission failed: {0}")]
    Submit(#[source] E),
    #[error(transparent)]
    Game(#[from] GameError),
}

impl<E: std::error::Error + 'static> From<InputError> for SyncError<E> {
    fn from(err: InputError) -> Self {
        SyncError::Game(err.into())
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
