//! Append-only audit trail in the `log` table. Stores operations and ids,
//! never decrypted payloads.

use crate::errors::AppResult;
use chrono::Utc;
use rusqlite::{Connection, params};

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: i64,
    pub date: String,
    pub operation: String,
    pub target: String,
    pub message: String,
}

/// Write an internal log line into the `log` table.
pub fn ttlog(conn: &Connection, operation: &str, target: &str, message: &str) -> AppResult<()> {
    let now = Utc::now().to_rfc3339();

    let mut stmt = conn.prepare_cached(
        "INSERT INTO log (date, operation, target, message)
         VALUES (?1, ?2, ?3, ?4)",
    )?;

    stmt.execute(params![now, operation, target, message])?;

    Ok(())
}

/// Audit write that must never fail the caller.
pub fn ttlog_quiet(conn: &Connection, operation: &str, target: &str, message: &str) {
    if let Err(e) = ttlog(conn, operation, target, message) {
        tracing::warn!(operation, error = %e, "failed to write internal log");
    }
}

/// Oldest first. `operation` filters exactly; `tail` keeps only the last n.
pub fn entries(
    conn: &Connection,
    operation: Option<&str>,
    tail: Option<usize>,
) -> AppResult<Vec<LogEntry>> {
    let limit = tail.map(|n| n as i64).unwrap_or(-1);
    let mut stmt = conn.prepare_cached(
        "SELECT id, date, operation, target, message FROM (
             SELECT * FROM log
             WHERE ?1 IS NULL OR operation = ?1
             ORDER BY id DESC
             LIMIT ?2
         ) ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![operation, limit], |row| {
        Ok(LogEntry {
            id: row.get(0)?,
            date: row.get(1)?,
            operation: row.get(2)?,
            target: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            message: row.get(4)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
