//! Game session identifiers.
//!
//! A session id scopes one move log and one board lineage. It is also the
//! `bytes32` key the game contract stores boards under, and the salt of every
//! seeded spawn, so it must be fixed before the first tile is placed.

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, B256};
use rand::RngCore;

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionId(B256);

impl SessionId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SessionId(B256::from(bytes))
    }

    /// A session id with no player binding.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// `keccak256(player_address || nonce)` with a random 32-byte nonce.
    pub fn for_player<R: RngCore + ?Sized>(player: &str, rng: &mut R) -> Result<Self, InputError> {
        let address = Address::from_str(player.trim())
            .map_err(|_| InputError::MalformedAddress(player.to_string()))?;
        let mut nonce = [0u8; 32];
        rng.fill_bytes(&mut nonce);
        Ok(Self::derive(address, nonce))
    }

    /// Deterministic part of [`SessionId::for_player`].
    pub fn derive(player: Address, nonce: [u8; 32]) -> Self {
        let mut preimage = [0u8; 52];
        preimage[..20].copy_from_slice(player.as_slice());
        preimage[20..].copy_from_slice(&nonce);
        SessionId(keccak256(preimage))
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl FromStr for SessionId {
    type Err = InputError;

    /// Parse a 0x-prefixed (or bare) 64-digit hex string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s.trim())
            .map(SessionId)
            .map_err(|_| InputError::MalformedSessionId(s.to_string()))
    }
}

impl From<B256> for SessionId {
    fn from(value: B256) -> Self {
        SessionId(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
