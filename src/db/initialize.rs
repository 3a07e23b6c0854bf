use crate::db::migrate::run_pending_migrations;
use crate::errors::AppResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Prepare a connection for use: WAL journaling, then every pending
/// migration. Safe to call on every open.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    // in-memory databases answer "memory"
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "journal mode");

    let applied = run_pending_migrations(conn)?;
    if !applied.is_empty() {
        info!(count = applied.len(), "schema migrated");
    }
    Ok(())
}
