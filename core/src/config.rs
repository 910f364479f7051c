//! Engine configuration.
//!
//! ```yaml
//! spawn:
//!   mode: seeded         # or: { mode: local, seed: 7 }
//! win_tile: 2048
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which spawn strategy the engine runs with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnMode {
    /// Spawns derived from the session id and move index (verifiable).
    #[default]
    Seeded,
    /// Client-side PRNG; a fixed seed makes local runs repeatable.
    Local {
        #[serde(default)]
        seed: Option<u64>,
    },
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub spawn: SpawnMode,
    /// Tile value reported as a win. Play continues past it.
    #[serde(default = "default_win_tile")]
    pub win_tile: u32,
}

fn default_win_tile() -> u32 {
    2048
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnMode::default(),
            win_tile: default_win_tile(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_mapping() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.spawn, SpawnMode::Seeded);
        assert_eq!(config.win_tile, 2048);
    }

    #[test]
    fn test_local_spawn_with_seed() {
        let config = EngineConfig::from_yaml("spawn:\n  mode: local\n  seed: 7\nwin_tile: 512\n").unwrap();
        assert_eq!(config.spawn, SpawnMode::Local { seed: Some(7) });
        assert_eq!(config.win_tile, 512);
    }

    #[test]
    fn test_local_spawn_without_seed() {
        let config = EngineConfig::from_yaml("spawn: { mode: local }").unwrap();
        assert_eq!(config.spawn, SpawnMode::Local { seed: None });
    }

    #[test]
    fn test_unknown_spawn_mode_fails() {
        let err = EngineConfig::from_yaml("spawn:\n  mode: dice\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::load("/nonexistent/chain-2048.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
