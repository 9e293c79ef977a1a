//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine sees the store through `PolicySource` and `NotificationLedger`;
//! it never executes SQL directly.

mod notification;
mod policy;

pub use policy::NewPolicy;

use crate::error::{RenewalError, RenewalResult};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

pub struct RenewalStore {
    conn: Mutex<Connection>,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl RenewalStore {
    pub fn open(path: &str) -> RenewalResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RenewalResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Open a second connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> RenewalResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RenewalResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../../migrations/001_renewals.sql"))?;
        Ok(())
    }

    fn conn(&self) -> RenewalResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RenewalError::Upstream("store connection lock poisoned".into()))
    }
}
