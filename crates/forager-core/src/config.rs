//! Configuration management for Forager
//!
//! Repository-level settings loaded from `.forager/config.toml`. The kernel
//! itself takes no configuration (its behavior is a pure function of the
//! request); these settings drive the surrounding tooling, e.g. how many
//! invariance runs the CLI performs and where it exports ledger events.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{ForagerError, Result};

/// Repository-level Forager configuration
///
/// Loaded from `.forager/config.toml` in the repo root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForagerConfig {
    /// Invariance-harness runs per certification
    #[serde(default = "default_runs_required")]
    pub runs_required: usize,

    /// Where `forager run` exports ledger events when no explicit path is given
    #[serde(default)]
    pub ledger_export: Option<PathBuf>,
}

fn default_runs_required() -> usize {
    12
}

impl ForagerConfig {
    /// Load configuration from `.forager/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".forager/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| ForagerError::Config(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write default configuration to `.forager/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<()> {
        let config_dir = repo_root.join(".forager");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let config = Self::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ForagerError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for ForagerConfig {
    fn default() -> Self {
        Self {
            runs_required: default_runs_required(),
            ledger_export: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForagerConfig::default();
        assert_eq!(config.runs_required, 12);
        assert!(config.ledger_export.is_none());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ForagerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.runs_required, 12);
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        ForagerConfig::write_default(dir.path()).unwrap();
        let config = ForagerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.runs_required, 12);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".forager");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "runs_required = 3\n").unwrap();

        let config = ForagerConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.runs_required, 3);
        assert!(config.ledger_export.is_none());
    }
}
