//! Loads the engine's tunable timeout durations from a TOML file, the way this lineage already
//! loads its cluster topology via `config::Config` + `config::File`. Unlike that, failures here
//! are reported as a typed [`ConfigError`] rather than `.expect()`-ed away.

use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use crate::error::ConfigError;

/// The engine's tunable timeout durations, in milliseconds on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    pub prepare_timeout_ms: u64,
    pub propose_timeout_ms: u64,
    pub restart_timeout_ms: u64,
}

impl EngineConfig {
    pub fn prepare_timeout(&self) -> Duration {
        Duration::from_millis(self.prepare_timeout_ms)
    }

    pub fn propose_timeout(&self) -> Duration {
        Duration::from_millis(self.propose_timeout_ms)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_timeout_ms)
    }

    /// Loads `EngineConfig` from a TOML file, layered over the compiled-in defaults so a file
    /// that only overrides one field is still valid.
    pub fn from_file(file_name: &str) -> Result<EngineConfig, ConfigError> {
        let defaults = EngineConfig::default();
        let mut c = Config::default();
        c.set("prepare_timeout_ms", defaults.prepare_timeout_ms as i64)
            .and_then(|c| c.set("propose_timeout_ms", defaults.propose_timeout_ms as i64))
            .and_then(|c| c.set("restart_timeout_ms", defaults.restart_timeout_ms as i64))
            .map_err(|source| ConfigError::Malformed {
                path: file_name.to_string(),
                source,
            })?;
        c.merge(File::with_name(file_name)).map_err(|source| match source {
            config::ConfigError::NotFound(_) => ConfigError::NotFound {
                path: file_name.to_string(),
                source,
            },
            other => ConfigError::Malformed {
                path: file_name.to_string(),
                source: other,
            },
        })?;
        c.try_into().map_err(|source| ConfigError::InvalidField {
            field: "prepare_timeout_ms | propose_timeout_ms | restart_timeout_ms".to_string(),
            source,
        })
    }
}

impl Default for EngineConfig {
    /// Reproduces the original engine's constants exactly: 5s prepare, 5s propose, 1s restart.
    fn default() -> Self {
        EngineConfig {
            prepare_timeout_ms: 5_000,
            propose_timeout_ms: 5_000,
            restart_timeout_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.prepare_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.propose_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.restart_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn missing_file_is_a_not_found_error() {
        let err = EngineConfig::from_file("does-not-exist-on-this-filesystem");
        assert!(matches!(err, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn unparseable_file_is_a_malformed_error() {
        let stem = std::env::temp_dir().join("paxos_engine_malformed_config_test");
        let path = stem.with_extension("toml");
        std::fs::write(&path, "prepare_timeout_ms = [this is not valid toml").unwrap();

        let err = EngineConfig::from_file(stem.to_str().unwrap());
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, Err(ConfigError::Malformed { .. })));
    }
}
