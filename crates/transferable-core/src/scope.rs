//! SAVEPOINT-based atomic scopes.
//!
//! A [`Scope`] works on a plain `&Connection`, so it nests inside a
//! transaction the caller already holds (a `rusqlite::Transaction` derefs to
//! `Connection`). Outside a transaction, SQLite starts one for the savepoint
//! and `RELEASE` commits it.

use rusqlite::Connection;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

static NEXT_SAVEPOINT: AtomicU64 = AtomicU64::new(1);

/// An open savepoint. Dropping it without [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) rolls it back.
#[derive(Debug)]
pub struct Scope<'conn> {
    conn: &'conn Connection,
    name: String,
    finished: bool,
}

impl<'conn> Scope<'conn> {
    /// Open a new savepoint. `label` must be a plain identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects the `SAVEPOINT` statement.
    pub fn begin(conn: &'conn Connection, label: &str) -> Result<Self> {
        let id = NEXT_SAVEPOINT.fetch_add(1, Ordering::Relaxed);
        let name = format!("xfer_{label}_{id}");
        conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        tracing::trace!(savepoint = %name, "scope opened");
        Ok(Self {
            conn,
            name,
            finished: false,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the savepoint, keeping its writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the `RELEASE` fails; the scope then rolls back on drop.
    pub fn commit(mut self) -> Result<()> {
        self.conn.execute_batch(&format!("RELEASE {}", self.name))?;
        self.finished = true;
        tracing::trace!(savepoint = %self.name, "scope committed");
        Ok(())
    }

    /// Discard every write made since the savepoint was opened.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects the rollback.
    pub fn rollback(mut self) -> Result<()> {
        self.discard()?;
        tracing::trace!(savepoint = %self.name, "scope rolled back");
        Ok(())
    }

    /// The scope stays unfinished until the rollback succeeds, so a failed
    /// attempt is retried on drop.
    fn discard(&mut self) -> Result<()> {
        self.conn.execute_batch(&rollback_sql(&self.name))?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.discard() {
                tracing::warn!(
                    savepoint = %self.name,
                    error = %err,
                    "scope rollback on drop failed"
                );
            }
        }
    }
}

fn rollback_sql(name: &str) -> String {
    format!("ROLLBACK TO {name}; RELEASE {name}")
}
