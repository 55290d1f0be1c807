use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

use super::schema::{ensure_tables, SchemaProvider};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".library-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";
/// Overrides the database location.
const DB_PATH_ENV: &str = "LIBRARY_DB_PATH";
/// Overrides how long a transaction waits for another connection's write lock.
const BUSY_TIMEOUT_ENV: &str = "LIBRARY_BUSY_TIMEOUT_MS";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Where the database lives and how the connection behaves under contention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Resolve the configuration from the environment, falling back to a
    /// database inside the user's home directory.
    pub fn from_env() -> Result<Self> {
        let db_path = match env::var_os(DB_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let busy_timeout = match env::var(BUSY_TIMEOUT_ENV) {
            Ok(raw) => {
                let millis: u64 = raw.trim().parse().with_context(|| {
                    format!("{BUSY_TIMEOUT_ENV} must be a whole number of milliseconds")
                })?;
                Duration::from_millis(millis)
            }
            Err(_) => DEFAULT_BUSY_TIMEOUT,
        };

        Ok(Self {
            db_path,
            busy_timeout,
        })
    }
}

/// Ensure the database file exists, create missing tables, and return a live
/// connection. Foreign keys are switched on so borrow records follow the books
/// and cards they reference.
pub fn open_database(config: &Config, schema: &dyn SchemaProvider) -> Result<Connection> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }

    let conn = Connection::open(&config.db_path).context("failed to open SQLite database")?;
    prepare_connection(&conn, config.busy_timeout)?;
    ensure_tables(&conn, schema).context("failed to create library tables")?;
    Ok(conn)
}

/// In-memory database with the schema in place. Used by tests and throwaway
/// sessions.
pub fn open_in_memory(schema: &dyn SchemaProvider) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare_connection(&conn, DEFAULT_BUSY_TIMEOUT)?;
    ensure_tables(&conn, schema).context("failed to create library tables")?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    conn.busy_timeout(busy_timeout)
        .context("failed to set busy timeout")?;
    Ok(())
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn default_db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
