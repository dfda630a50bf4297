//! SQLite connection utilities.
//!
//! Runtime defaults:
//! - `journal_mode = WAL` to allow concurrent readers while a transfer writes
//! - `busy_timeout` from [`Settings`] to ride out transient lock contention
//! - `foreign_keys` from [`Settings`]; off by default so lenient entity types
//!   can be deleted while dependents still point at them

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::config::Settings;

/// Open (or create) the database file and apply runtime pragmas.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or SQLite
/// refuses to open/configure the file.
pub fn open(path: &Path, settings: &Settings) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create database directory {}", parent.display()))?;
    }

    let conn =
        Connection::open(path).with_context(|| format!("open database {}", path.display()))?;

    configure(&conn, settings).context("configure sqlite pragmas")?;
    tracing::debug!(path = %path.display(), "opened database");

    Ok(conn)
}

/// Apply runtime pragmas to an already-open connection.
///
/// # Errors
///
/// Returns an error if any pragma fails.
pub fn configure(conn: &Connection, settings: &Settings) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", if settings.foreign_keys { "ON" } else { "OFF" })?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(settings.busy_timeout())?;
    Ok(())
}

/// Quote an SQL identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len() + 2);
    escaped.push('"');
    for ch in name.chars() {
        if ch == '"' {
            escaped.push('"');
        }
        escaped.push(ch);
    }
    escaped.push('"');
    escaped
}
