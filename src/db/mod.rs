use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use crate::error::{Result, TopomapError};

pub mod schema;

/// How long a statement waits on a locked store before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection manager
///
/// Holds only the store location. Each caller gets its own `Connection`,
/// which is the session handle passed explicitly to every component.
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection to an existing store.
    ///
    /// The store is never created here: a missing file is reported as a
    /// connection failure.
    pub fn open_connection(&self) -> Result<Connection> {
        open_existing(&self.path)
    }

    /// Create the store if needed and bootstrap the schema.
    pub fn initialize(&self) -> Result<()> {
        let conn = Connection::open(&self.path).map_err(|e| {
            TopomapError::Connection(format!("{}: {}", self.path.display(), e))
        })?;
        configure(&conn)?;
        schema::ensure_schema(&conn)?;
        log::info!("Store initialized at {}", self.path.display());
        Ok(())
    }

    /// Execute a closure with a database connection in a blocking task
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open_existing(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| TopomapError::Connection(format!("database task failed: {}", e)))?
    }
}

fn open_existing(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| TopomapError::Connection(format!("{}: {}", path.display(), e)))?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    // WAL lets the reporting side read while a run is writing
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA foreign_keys = ON; \
         PRAGMA temp_store = MEMORY;"
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
