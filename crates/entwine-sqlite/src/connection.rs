//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> pattern: one connection per client,
//! the mutex being the serialization point for every store call.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use entwine_core::{Context, Error, Operation, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open a connection with the given configuration
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = %config.path, "Opening SQLite connection");

        let conn = if config.path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if !config.is_uri() {
                // Ensure parent directory exists
                if let Some(parent) = std::path::Path::new(&config.path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            SqliteError::Connection(format!("Failed to create directory: {}", e))
                        })?;
                    }
                }
            }
            Connection::open_with_flags(
                &config.path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        };

        let interrupt = Arc::new(conn.get_interrupt_handle());
        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            config,
        };
        pool.with_connection(|conn| pool.configure_pragmas(conn))?;

        Ok(pool)
    }

    /// Private in-memory database for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run blocking work on the connection, racing `ctx`.
    ///
    /// The closure runs on the blocking pool and receives the context so it
    /// can check for cancellation before committing. If `ctx` finishes while
    /// the closure holds the connection, the running statement is
    /// interrupted; a closure that completes regardless keeps its result.
    pub async fn run<F, T>(&self, ctx: &Context, op: Operation, entity: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &Context) -> SqliteResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_done() {
            return Err(Error::Cancelled {
                op,
                entity: entity.to_string(),
            });
        }

        let conn = Arc::clone(&self.conn);
        // Set only while this call owns the connection; cleared under the
        // same lock before the connection is released
        let active = Arc::new(Mutex::new(false));
        let task_active = Arc::clone(&active);
        let guard = ctx.clone();

        let mut task = tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock();
            *task_active.lock() = true;
            let result = if guard.is_done() {
                Err(SqliteError::Interrupted)
            } else {
                f(&mut conn, &guard)
            };
            *task_active.lock() = false;
            drop(conn);
            result
        });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = ctx.done() => {
                // Only interrupt our own statement, never another caller's
                let active = active.lock();
                if *active {
                    debug!(%op, entity, "Interrupting statement");
                    self.interrupt.interrupt();
                }
                drop(active);
                task.await
            }
        };

        let result = joined.map_err(|e| Error::Store {
            op,
            entity: entity.to_string(),
            message: format!("blocking task failed: {}", e),
        })?;
        result.map_err(|e| e.into_error(op, entity))
    }

    /// Configure SQLite PRAGMA settings
    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!(
            foreign_keys = self.config.foreign_keys,
            wal_mode = self.config.wal_mode,
            "Configuring SQLite pragmas"
        );

        // WAL mode for file databases only
        if self.config.wal_mode && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = {};",
            if self.config.foreign_keys { "ON" } else { "OFF" }
        ))?;

        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;

        // Use memory for temp tables
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }
}
