//! Shard connection lifecycle
//!
//! The manager opens one connection per shard and hands out shared handles.
//! Each handle serializes access to its connection; callers hold the lock
//! only around a single executor call.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;
use crate::executor::ensure_schema;
use crate::shard::SHARD_DB_FILE;

/// Shared handle to an open shard connection
#[derive(Debug)]
pub struct ShardHandle<C> {
    path: PathBuf,
    conn: Mutex<C>,
}

impl<C> ShardHandle<C> {
    pub fn new(path: impl Into<PathBuf>, conn: C) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(conn),
        }
    }

    /// Take exclusive access to the connection; released when the guard drops
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.conn.lock()
    }

    /// Directory of the shard
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens, tracks and removes shard storage
pub trait ConnectionManager: Send + Sync {
    /// Connection type handed to the executor
    type Conn: Send;

    /// Whether storage exists at `path`
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Get the connection of a shard, creating its storage if absent
    fn get_connection(&self, shard_path: &Path) -> Result<Arc<ShardHandle<Self::Conn>>>;

    /// Remove everything stored under `path`
    fn delete(&self, path: &Path) -> Result<()>;
}

/// Connection manager backed by one SQLite file per shard directory
pub struct SqliteManager {
    connections: RwLock<HashMap<PathBuf, Arc<ShardHandle<Connection>>>>,
    busy_timeout: Duration,
}

impl SqliteManager {
    /// Create a new manager
    pub fn new(busy_timeout: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            busy_timeout,
        }
    }

    /// Number of open shard connections
    pub fn open_connections(&self) -> usize {
        self.connections.read().len()
    }

    fn open(&self, shard_path: &Path) -> Result<Connection> {
        fs::create_dir_all(shard_path)?;

        let conn = Connection::open(shard_path.join(SHARD_DB_FILE))?;
        conn.busy_timeout(self.busy_timeout)?;
        ensure_schema(&conn)?;

        Ok(conn)
    }
}

impl Default for SqliteManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ConnectionManager for SqliteManager {
    type Conn = Connection;

    fn exists(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get_connection(&self, shard_path: &Path) -> Result<Arc<ShardHandle<Connection>>> {
        if let Some(handle) = self.connections.read().get(shard_path) {
            return Ok(Arc::clone(handle));
        }

        let mut connections = self.connections.write();

        // Another caller may have opened it while we waited
        if let Some(handle) = connections.get(shard_path) {
            return Ok(Arc::clone(handle));
        }

        let conn = self.open(shard_path)?;
        let handle = Arc::new(ShardHandle::new(shard_path, conn));
        connections.insert(shard_path.to_path_buf(), Arc::clone(&handle));

        debug!(shard = %shard_path.display(), "opened shard connection");

        Ok(handle)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let mut connections = self.connections.write();
        connections.retain(|shard_path, _| !shard_path.starts_with(path));

        fs::remove_dir_all(path)?;

        info!(path = %path.display(), "deleted dataset storage");

        Ok(())
    }
}
