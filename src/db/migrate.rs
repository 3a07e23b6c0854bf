use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

/// Ensure that the `log` table exists. Migrations record themselves there.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

/// Applied in order; each runs at most once per database.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20260301_0001_encrypted_data",
        description: "Created encrypted mutation queue table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS encrypted_data (
                id            TEXT PRIMARY KEY,
                type_tag      TEXT NOT NULL,
                ciphertext    BLOB NOT NULL,
                integrity_tag TEXT NOT NULL,
                saved_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_encrypted_data_type ON encrypted_data(type_tag);
        "#,
    },
    Migration {
        version: "20260301_0002_cache",
        description: "Created per-user encrypted cache partitions",
        sql: r#"
            CREATE TABLE IF NOT EXISTS cache (
                partition     TEXT NOT NULL,
                user_id       TEXT NOT NULL,
                item_key      TEXT NOT NULL,
                ciphertext    BLOB NOT NULL,
                integrity_tag TEXT NOT NULL,
                PRIMARY KEY (partition, user_id, item_key)
            );
        "#,
    },
    Migration {
        version: "20260312_0003_notification_flags",
        description: "Created notification read/hidden flags",
        sql: r#"
            CREATE TABLE IF NOT EXISTS notification_flags (
                id       TEXT NOT NULL,
                user_id  TEXT NOT NULL,
                read     INTEGER NOT NULL DEFAULT 0,
                hidden   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (id, user_id)
            );
        "#,
    },
];

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> AppResult<()> {
    conn.execute_batch(m.sql)
        .map_err(|e| AppError::Migration(format!("{}: {}", m.version, e)))?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [m.version, m.description],
    )?;

    info!(version = m.version, "migration applied");
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Returns the versions applied by this call.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<Vec<&'static str>> {
    ensure_log_table(conn)?;

    let mut applied = Vec::new();
    for m in MIGRATIONS {
        if is_applied(conn, m.version)? {
            continue;
        }
        apply(conn, m)?;
        applied.push(m.version);
    }

    Ok(applied)
}
