//! CLI configuration
//!
//! A small TOML file controls the ambient knobs; everything the core
//! needs is passed in explicitly. Lookup order: `--config` path, then
//! `~/.config/usbman/config.toml`, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "Config::default_log_level")]
    pub log_level: String,
    /// Depth bound for ancestor-chain walks
    #[serde(default = "Config::default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            max_ancestor_depth: Self::default_max_ancestor_depth(),
        }
    }
}

impl Config {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_max_ancestor_depth() -> usize {
        platform::DEFAULT_MAX_ANCESTOR_DEPTH
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("usbman").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicitly passed path must exist and parse; the default path
    /// is optional.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::read(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_ancestor_depth, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_ancestor_depth, 10);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = [not toml").unwrap();

        assert!(Config::load(Some(file.path())).is_err());
    }
}
