//! SQLite connection wrapper (lightweight for CLI usage) plus a shared,
//! mutex-guarded handle for the async engine.

use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(Path::new(path))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }
}

/// Cloneable handle shared by the store, the caches and the engine tasks.
///
/// The lock is only taken inside [`SharedDb::with`], so it can never be held
/// across an `.await`.
#[derive(Clone)]
pub struct SharedDb(Arc<Mutex<DbPool>>);

impl SharedDb {
    pub fn new(pool: DbPool) -> Self {
        Self(Arc::new(Mutex::new(pool)))
    }

    pub fn open(path: &str) -> AppResult<Self> {
        Ok(Self::new(DbPool::new(path)?))
    }

    pub fn with<F, T>(&self, func: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T>,
    {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| AppError::Other("database lock poisoned".into()))?;
        func(&mut guard.conn)
    }
}
