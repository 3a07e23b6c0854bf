//! Per-record authenticated-encrypted key/value storage.
//!
//! Every value is serialized to JSON, sealed with the device key and written
//! to `encrypted_data` together with its integrity tag. A record that fails
//! verification is reported and treated as absent but stays on disk.

use crate::db::pool::SharedDb;
use crate::errors::AppResult;
use crate::security::{DeviceKey, RecordCipher};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

/// A row of `encrypted_data` as stored, nothing decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub type_tag: String,
    pub ciphertext: Vec<u8>,
    pub integrity_tag: String,
    pub saved_at: DateTime<Utc>,
}

/// A verified, decrypted record.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedRecord<T> {
    pub id: String,
    pub type_tag: String,
    pub saved_at: DateTime<Utc>,
    pub value: T,
}

#[derive(Clone)]
pub struct SecureLocalStore {
    db: SharedDb,
    cipher: Arc<RecordCipher>,
}

impl SecureLocalStore {
    pub fn new(db: SharedDb, key: &DeviceKey) -> Self {
        Self {
            db,
            cipher: Arc::new(RecordCipher::new(key)),
        }
    }

    pub fn db(&self) -> &SharedDb {
        &self.db
    }

    pub fn cipher(&self) -> &Arc<RecordCipher> {
        &self.cipher
    }

    pub fn put<T: Serialize>(
        &self,
        id: &str,
        type_tag: &str,
        value: &T,
        saved_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let plaintext = serde_json::to_vec(value)?;
        let sealed = self.cipher.seal(&plaintext)?;

        self.db.with(|conn| {
            conn.execute(
                "INSERT INTO encrypted_data (id, type_tag, ciphertext, integrity_tag, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    type_tag = excluded.type_tag,
                    ciphertext = excluded.ciphertext,
                    integrity_tag = excluded.integrity_tag,
                    saved_at = excluded.saved_at",
                params![
                    id,
                    type_tag,
                    sealed.ciphertext,
                    sealed.integrity_tag,
                    saved_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    pub fn get<T: DeserializeOwned>(&self, id: &str) -> AppResult<Option<T>> {
        let Some(record) = self.raw_record(id)? else {
            return Ok(None);
        };
        match self.open_json(&record) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> AppResult<bool> {
        self.db.with(|conn| {
            let n = conn.execute("DELETE FROM encrypted_data WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Decrypt every record whose tag starts with `prefix` and whose body
    /// belongs to `user_id`, in insertion order.
    pub fn list_by_user_and_prefix<T: DeserializeOwned>(
        &self,
        user_id: &str,
        prefix: &str,
    ) -> AppResult<Vec<OpenedRecord<T>>> {
        let mut out = Vec::new();

        for record in self.records_with_prefix(prefix)? {
            let Some(value) = self.open_json(&record) else {
                continue;
            };
            if value.get("user_id").and_then(|v| v.as_str()) != Some(user_id) {
                continue;
            }
            match serde_json::from_value(value) {
                Ok(value) => out.push(OpenedRecord {
                    id: record.id,
                    type_tag: record.type_tag,
                    saved_at: record.saved_at,
                    value,
                }),
                Err(e) => warn!(id = %record.id, error = %e, "stored record has an unexpected shape"),
            }
        }

        Ok(out)
    }

    pub fn raw_record(&self, id: &str) -> AppResult<Option<StoredRecord>> {
        self.db.with(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, type_tag, ciphertext, integrity_tag, saved_at
                     FROM encrypted_data WHERE id = ?1",
                    [id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;
            Ok(row.and_then(into_record))
        })
    }

    /// Every stored record whose type tag starts with `prefix` (all records
    /// for an empty prefix), without decrypting anything.
    pub fn records_with_prefix(&self, prefix: &str) -> AppResult<Vec<StoredRecord>> {
        self.db.with(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, type_tag, ciphertext, integrity_tag, saved_at
                 FROM encrypted_data
                 WHERE substr(type_tag, 1, length(?1)) = ?1
                 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map([prefix], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut out = Vec::new();
            for r in rows {
                match r {
                    Ok(raw) => out.extend(into_record(raw)),
                    Err(e) => warn!(prefix, error = %e, "skipping unreadable row"),
                }
            }
            Ok(out)
        })
    }

    /// Verify and decrypt one record; `None` (with a warning) when it fails.
    pub fn open_json(&self, record: &StoredRecord) -> Option<serde_json::Value> {
        let plaintext = match self
            .cipher
            .open(&record.id, &record.ciphertext, &record.integrity_tag)
        {
            Ok(p) => p,
            Err(e) => {
                warn!(id = %record.id, type_tag = %record.type_tag, error = %e, "skipping unreadable record");
                return None;
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping record with invalid JSON body");
                None
            }
        }
    }
}

type RawRow = (String, String, Vec<u8>, String, String);

/// `None` (with a warning) when the row's metadata is damaged.
fn into_record((id, type_tag, ciphertext, integrity_tag, saved_at): RawRow) -> Option<StoredRecord> {
    let saved_at = match DateTime::parse_from_rfc3339(&saved_at) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(id = %id, saved_at = %saved_at, error = %e, "skipping record with bad saved_at");
            return None;
        }
    };
    Some(StoredRecord {
        id,
        type_tag,
        ciphertext,
        integrity_tag,
        saved_at,
    })
}
