//! # Chain 2048 Core Engine
//!
//! The 2048 rules engine plus the 256-bit board encoding a game contract
//! stores as its commitment. Tile spawns are either local randomness or
//! derived from the session id and move index, in which case any third party
//! can replay a committed game and check every board.
//!
//! ## Example
//!
//! ```rust
//! use chain_2048_core::{Direction, EngineConfig, GameEngine, SessionId};
//!
//! let mut engine = GameEngine::new(EngineConfig::default());
//! engine.initialize(SessionId::from_bytes([7; 32])).unwrap();
//! let outcome = engine.play(Direction::Left).unwrap();
//! println!("Score: {}, Moved: {}", engine.score(), outcome.moved);
//! ```

pub mod board;
pub mod codec;
pub mod config;
pub mod contract;
pub mod engine;
pub mod error;
pub mod move_log;
pub mod replay;
pub mod rules;
pub mod session;
pub mod spawn;

pub use board::{Board, Direction, Position, Tile, TileId};
pub use codec::{decode, encode, EncodedMove};
pub use config::{EngineConfig, SpawnMode};
pub use engine::{GameEngine, GameStatus, MoveOutcome, Snapshot};
pub use error::{ConfigError, ContractError, EncodingError, GameError, InputError, ReplayError, SyncError};
pub use move_log::{MoveLog, PlayCommitment, StartGameBatch, START_BATCH_LEN};
pub use rules::{Merge, MoveAnnotations};
pub use session::SessionId;
pub use spawn::{LocalRandom, SeededRandom, SpawnContext, TileSpawner};
