//! Read/hidden state of notifications, owned by the notification center.

use crate::errors::AppResult;
use rusqlite::{Connection, params};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub read: bool,
    pub hidden: bool,
}

pub fn load(conn: &Connection, user_id: &str) -> AppResult<HashMap<String, Flags>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, read, hidden FROM notification_flags WHERE user_id = ?1")?;
    let rows = stmt.query_map([user_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            Flags {
                read: row.get::<_, i64>(1)? != 0,
                hidden: row.get::<_, i64>(2)? != 0,
            },
        ))
    })?;

    let mut out = HashMap::new();
    for r in rows {
        let (id, flags) = r?;
        out.insert(id, flags);
    }
    Ok(out)
}

pub fn set_read(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO notification_flags (id, user_id, read, hidden) VALUES (?1, ?2, 1, 0)
         ON CONFLICT(id, user_id) DO UPDATE SET read = 1",
        params![id, user_id],
    )?;
    Ok(())
}

pub fn set_hidden(conn: &Connection, user_id: &str, id: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO notification_flags (id, user_id, read, hidden) VALUES (?1, ?2, 0, 1)
         ON CONFLICT(id, user_id) DO UPDATE SET hidden = 1",
        params![id, user_id],
    )?;
    Ok(())
}

/// Drop local read flags the server already reflects. Rows that still carry
/// a hidden flag are kept.
pub fn clear_read(conn: &mut Connection, user_id: &str, ids: &[String]) -> AppResult<()> {
    let tx = conn.transaction()?;
    {
        let mut del = tx.prepare_cached(
            "DELETE FROM notification_flags WHERE user_id = ?1 AND id = ?2 AND hidden = 0",
        )?;
        let mut upd = tx.prepare_cached(
            "UPDATE notification_flags SET read = 0 WHERE user_id = ?1 AND id = ?2",
        )?;
        for id in ids {
            del.execute(params![user_id, id])?;
            upd.execute(params![user_id, id])?;
        }
    }
    tx.commit()?;
    Ok(())
}
