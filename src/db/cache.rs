//! Encrypted per-user caches of server-confirmed data.
//!
//! Each partition is refreshed by clearing the user's rows and bulk-inserting
//! the new list inside one transaction. The mutation queue lives in a
//! different table and is never touched here.

use crate::db::pool::SharedDb;
use crate::db::secure_store::SecureLocalStore;
use crate::errors::AppResult;
use crate::security::RecordCipher;
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Credentials,
    Attendance,
    Incidents,
    Notifications,
    FaceDescriptors,
    EligibleDates,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Credentials => "credentials",
            Partition::Attendance => "attendance",
            Partition::Incidents => "incidents",
            Partition::Notifications => "notifications",
            Partition::FaceDescriptors => "face_descriptors",
            Partition::EligibleDates => "eligible_dates",
        }
    }

    pub const ALL: [Partition; 6] = [
        Partition::Credentials,
        Partition::Attendance,
        Partition::Incidents,
        Partition::Notifications,
        Partition::FaceDescriptors,
        Partition::EligibleDates,
    ];
}

#[derive(Clone)]
pub struct PartitionCache {
    db: SharedDb,
    cipher: Arc<RecordCipher>,
}

impl PartitionCache {
    pub fn new(store: &SecureLocalStore) -> Self {
        Self {
            db: store.db().clone(),
            cipher: store.cipher().clone(),
        }
    }

    /// Replace the user's rows in `partition` with `items`, keyed by `key`.
    pub fn replace_for_user<T, K>(
        &self,
        partition: Partition,
        user_id: &str,
        items: &[T],
        key: K,
    ) -> AppResult<()>
    where
        T: Serialize,
        K: Fn(&T) -> String,
    {
        let mut sealed = Vec::with_capacity(items.len());
        for item in items {
            let s = self.cipher.seal(&serde_json::to_vec(item)?)?;
            sealed.push((key(item), s));
        }

        self.db.with(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM cache WHERE partition = ?1 AND user_id = ?2",
                params![partition.as_str(), user_id],
            )?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO cache (partition, user_id, item_key, ciphertext, integrity_tag)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (item_key, s) in &sealed {
                    stmt.execute(params![
                        partition.as_str(),
                        user_id,
                        item_key,
                        s.ciphertext,
                        s.integrity_tag
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Insert or overwrite a single entry.
    pub fn put_entry<T: Serialize>(
        &self,
        partition: Partition,
        user_id: &str,
        item_key: &str,
        item: &T,
    ) -> AppResult<()> {
        let s = self.cipher.seal(&serde_json::to_vec(item)?)?;
        self.db.with(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache (partition, user_id, item_key, ciphertext, integrity_tag)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![partition.as_str(), user_id, item_key, s.ciphertext, s.integrity_tag],
            )?;
            Ok(())
        })
    }

    pub fn load_for_user<T: DeserializeOwned>(
        &self,
        partition: Partition,
        user_id: &str,
    ) -> AppResult<Vec<T>> {
        let rows = self.db.with(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT item_key, ciphertext, integrity_tag FROM cache
                 WHERE partition = ?1 AND user_id = ?2
                 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![partition.as_str(), user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            let mut out = Vec::new();
            for r in rows {
                out.push(r?);
            }
            Ok(out)
        })?;

        let mut items = Vec::with_capacity(rows.len());
        for (item_key, ciphertext, tag) in rows {
            let record_id = format!("{}/{}", partition.as_str(), item_key);
            let decoded = self
                .cipher
                .open(&record_id, &ciphertext, &tag)
                .and_then(|plain| Ok(serde_json::from_slice(&plain)?));
            match decoded {
                Ok(item) => items.push(item),
                Err(e) => warn!(record = %record_id, error = %e, "skipping unreadable cache entry"),
            }
        }
        Ok(items)
    }

    pub fn get_entry<T: DeserializeOwned>(
        &self,
        partition: Partition,
        user_id: &str,
        item_key: &str,
    ) -> AppResult<Option<T>> {
        let row = self.db.with(|conn| {
            Ok(conn
                .query_row(
                    "SELECT ciphertext, integrity_tag FROM cache
                     WHERE partition = ?1 AND user_id = ?2 AND item_key = ?3",
                    params![partition.as_str(), user_id, item_key],
                    |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?)
        })?;

        let Some((ciphertext, tag)) = row else {
            return Ok(None);
        };
        let record_id = format!("{}/{}", partition.as_str(), item_key);
        match self.cipher.open(&record_id, &ciphertext, &tag) {
            Ok(plain) => Ok(Some(serde_json::from_slice(&plain)?)),
            Err(e) => {
                warn!(record = %record_id, error = %e, "skipping unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Returns whether an entry was removed.
    pub fn remove_entry(&self, partition: Partition, user_id: &str, item_key: &str) -> AppResult<bool> {
        self.db.with(|conn| {
            let n = conn.execute(
                "DELETE FROM cache WHERE partition = ?1 AND user_id = ?2 AND item_key = ?3",
                params![partition.as_str(), user_id, item_key],
            )?;
            Ok(n > 0)
        })
    }
}
