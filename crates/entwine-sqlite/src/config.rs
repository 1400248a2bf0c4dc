//! SQLite connection configuration

use entwine_core::{Error, Result};
use serde::{Deserialize, Serialize};

const MEMORY: &str = ":memory:";

/// Configuration for opening the store.
///
/// `path` is a plain file path, `:memory:`, or an SQLite URI filename
/// (`file:ent?mode=memory&cache=shared`). URI filenames are enabled on every
/// connection the pool opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: String,
    /// `PRAGMA foreign_keys`
    pub foreign_keys: bool,
    /// WAL journal; ignored for in-memory databases
    pub wal_mode: bool,
    pub busy_timeout_ms: u32,
    /// `PRAGMA cache_size`; negative values are KiB
    pub cache_size: i64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "./entwine.db".to_string(),
            foreign_keys: true,
            wal_mode: true,
            busy_timeout_ms: 5000,
            cache_size: -64000,
        }
    }
}

impl SqliteConfig {
    /// File-backed database at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Private in-memory database, not shared with any other connection
    pub fn memory() -> Self {
        Self {
            path: MEMORY.to_string(),
            wal_mode: false,
            ..Self::default()
        }
    }

    /// Parse a DSN such as `file:ent?mode=memory&cache=shared&_fk=1`.
    ///
    /// Parameters starting with `_` are driver flags and are consumed here
    /// (`_fk`, `_busy_timeout`); the rest stay on the URI for SQLite.
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(Error::Config("empty DSN".to_string()));
        }

        let mut config = Self::new(dsn);
        let Some((base, query)) = dsn.split_once('?') else {
            config.wal_mode = !config.is_memory();
            return Ok(config);
        };

        let mut kept = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "_fk" | "_foreign_keys" => config.foreign_keys = parse_flag(key, value)?,
                "_busy_timeout" => {
                    config.busy_timeout_ms = value.parse().map_err(|_| {
                        Error::Config(format!("invalid _busy_timeout value: {}", value))
                    })?
                }
                k if k.starts_with('_') => {
                    return Err(Error::Config(format!("unsupported DSN flag: {}", k)))
                }
                _ => kept.push(pair),
            }
        }

        config.path = if kept.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, kept.join("&"))
        };
        config.wal_mode = !config.is_memory();
        Ok(config)
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY || self.path.contains("mode=memory")
    }

    pub fn is_uri(&self) -> bool {
        self.path.starts_with("file:")
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        other => Err(Error::Config(format!("invalid {} value: {}", key, other))),
    }
}
