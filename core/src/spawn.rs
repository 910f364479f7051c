//! New-tile spawning strategies.
//!
//! Two strategies exist. [`LocalRandom`] is a plain PRNG and cannot be
//! recomputed by anyone else. [`SeededRandom`] derives every spawn from the
//! session id and move index, so a verifier holding both can rebuild the
//! exact board the player committed.

use alloy_primitives::{keccak256, U256};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::board::Position;
use crate::config::SpawnMode;
use crate::session::SessionId;

/// Where in a game a spawn happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnContext {
    pub session: SessionId,
    /// Log index of the board the spawn lands on (0 for the pregame board).
    pub move_index: u64,
    /// Position of this spawn among those sharing `move_index`.
    pub ordinal: u8,
}

/// Chooses the cell and value of a new tile.
pub trait TileSpawner: Send {
    /// Pick one of `empty` (row-major order) and a value of 2 or 4.
    ///
    /// Returns `None` when there is no empty cell; callers treat that as
    /// "no tile added".
    fn pick(&mut self, empty: &[Position], ctx: SpawnContext) -> Option<(Position, u32)>;

    /// Whether a third party can recompute the same spawns.
    fn is_deterministic(&self) -> bool;
}

/// Client-side randomness: uniform cell, 2 with probability 0.9, else 4.
pub struct LocalRandom {
    rng: SmallRng,
}

impl LocalRandom {
    pub fn from_entropy() -> Self {
        LocalRandom {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        LocalRandom {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl TileSpawner for LocalRandom {
    fn pick(&mut self, empty: &[Position], _ctx: SpawnContext) -> Option<(Position, u32)> {
        if empty.is_empty() {
            return None;
        }
        let cell = empty[self.rng.gen_range(0..empty.len())];
        let value = if self.rng.gen::<f32>() < 0.9 { 2 } else { 4 };
        Some((cell, value))
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

/// Spawns derived from `keccak256(session_id || move_index)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededRandom;

impl SeededRandom {
    /// The 256-bit seed for one spawn.
    ///
    /// `move_index` is hashed as a big-endian `uint256`. Extra spawns at the
    /// same index (the second pregame tile) re-hash the seed once per ordinal.
    pub fn seed(ctx: SpawnContext) -> U256 {
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(ctx.session.as_bytes());
        preimage[32..].copy_from_slice(&U256::from(ctx.move_index).to_be_bytes::<32>());
        let mut hash = keccak256(preimage);
        for _ in 0..ctx.ordinal {
            hash = keccak256(hash);
        }
        U256::from_be_bytes(hash.0)
    }
}

impl TileSpawner for SeededRandom {
    fn pick(&mut self, empty: &[Position], ctx: SpawnContext) -> Option<(Position, u32)> {
        if empty.is_empty() {
            return None;
        }
        let seed = Self::seed(ctx);
        let cell = empty[(seed % U256::from(empty.len())).to::<usize>()];
        let value = if seed % U256::from(100u8) > U256::from(90u8) {
            4
        } else {
            2
        };
        Some((cell, value))
    }

    fn is_deterministic(&self) -> bool {
        true
    }
}

/// Build the spawner a [`SpawnMode`] asks for.
pub fn spawner_from_config(mode: &SpawnMode) -> Box<dyn TileSpawner> {
    match mode {
        SpawnMode::Seeded => Box::new(SeededRandom),
        SpawnMode::Local { seed: Some(seed) } => Box::new(LocalRandom::seeded(*seed)),
        SpawnMode::Local { seed: None } => Box::new(LocalRandom::from_entropy()),
    }
}
