use anyhow::{Context, Result};
use entwine_sqlite::SqliteConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store used when neither the config file nor `--dsn` names one
pub const DEFAULT_DSN: &str = "file:ent?mode=memory&cache=shared&_fk=1";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Store connection settings
    pub storage: SqliteConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for entwine crates (off, error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        let storage = SqliteConfig::from_dsn(DEFAULT_DSN).unwrap_or_else(|_| SqliteConfig::memory());
        Self {
            storage,
            logging: LoggingConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration with CLI overrides applied on top
    pub fn load(config_file: Option<PathBuf>, dsn: Option<String>) -> Result<Self> {
        let mut config = Self::from_file_or_default(config_file)?;

        if let Some(dsn) = dsn {
            config.storage = SqliteConfig::from_dsn(&dsn)
                .with_context(|| format!("Invalid --dsn: {}", dsn))?;
        }

        Ok(config)
    }

    /// Default config file location (~/.config/entwine/config.toml)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("entwine").join("config.toml"))
    }

    /// Explicit paths must exist; the default path is optional
    fn from_file_or_default(config_file: Option<PathBuf>) -> Result<Self> {
        match config_file {
            Some(path) => Self::from_file(&path),
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_is_shared_memory() {
        let config = CliConfig::default();
        assert!(config.storage.is_memory());
        assert!(config.storage.foreign_keys);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
path = "/tmp/entwine-demo.db"
busy_timeout_ms = 250

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(path), None).unwrap();
        assert_eq!(config.storage.path, "/tmp/entwine-demo.db");
        assert_eq!(config.storage.busy_timeout_ms, 250);
        assert!(config.storage.wal_mode);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_dsn_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"info\"\n").unwrap();

        let config = CliConfig::load(Some(path), Some(":memory:".to_string())).unwrap();
        assert_eq!(config.storage.path, ":memory:");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = CliConfig::load(Some(dir.path().join("nope.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_bad_dsn_flag() {
        let err = CliConfig::load(None, Some("file:ent?_bogus=1".to_string())).unwrap_err();
        assert!(err.to_string().contains("Invalid --dsn"));
    }
}
