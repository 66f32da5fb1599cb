use log::{error, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use crate::error::CarpoolError;
use crate::schema::{CREATE_SCHEMA_SQL, SCHEMA_VERSION};

const POOL_MAX_SIZE: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Shared handle to the carpool database. Cloning is cheap: clones share the
/// same connection pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (or create) the database file at `db_path` and make sure the
    /// schema is current.
    pub fn open(db_path: &Path) -> Result<Self, CarpoolError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|c| {
            c.busy_timeout(BUSY_TIMEOUT)?;
            c.execute_batch("PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder().max_size(POOL_MAX_SIZE).build(manager)?;
        let db = Database { pool };

        let conn = db.get_connection()?;
        Self::ensure_schema(&conn)?;
        info!("Database opened at: {}", db_path.display());

        Ok(db)
    }

    pub fn get_connection(&self) -> Result<DbConnection, CarpoolError> {
        self.pool.get().map_err(CarpoolError::PoolError)
    }

    /// Run `func` inside a `BEGIN IMMEDIATE` transaction. The write lock is
    /// taken before `func` reads anything, so read-check-write sequences in
    /// `func` cannot interleave with another writer.
    pub fn immediate_transaction<T, F>(conn: &Connection, func: F) -> Result<T, CarpoolError>
    where
        F: FnOnce(&Connection) -> Result<T, CarpoolError>,
    {
        conn.execute_batch("BEGIN IMMEDIATE")?;

        // Rolls back on every exit that doesn't reach COMMIT, unwinding included
        let mut guard = TransactionGuard {
            conn,
            committed: false,
        };

        let value = func(conn)?;
        conn.execute_batch("COMMIT")?;
        guard.committed = true;

        Ok(value)
    }

    fn ensure_schema(conn: &Connection) -> Result<(), CarpoolError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get::<_, i32>(0),
            )
            .map(|count| count > 0)?;

        if !table_exists {
            info!("Creating database schema (version {})", SCHEMA_VERSION);
            conn.execute_batch(CREATE_SCHEMA_SQL)?;
            return Ok(());
        }

        let stored_version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => Ok(()),
            Some(other) => Err(CarpoolError::Error(format!(
                "Schema version mismatch: database has {}, expected {}",
                other, SCHEMA_VERSION
            ))),
            None => Err(CarpoolError::Error("Schema version missing".to_string())),
        }
    }
}

struct TransactionGuard<'a> {
    conn: &'a Connection,
    committed: bool,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.committed || self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            error!("Failed to roll back transaction: {}", e);
        }
    }
}
