//! Append-only durable queue of unconfirmed mutations, on top of the
//! secure store.

use crate::db::log::ttlog_quiet;
use crate::db::secure_store::SecureLocalStore;
use crate::errors::AppResult;
use crate::models::mutation::{MutationKind, MutationPayload, PendingMutation};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

/// Tag prefix matched by every pending mutation regardless of kind.
const ANY_KIND: &str = "";

pub struct PendingMutationQueue {
    store: SecureLocalStore,
    changes: watch::Sender<u64>,
}

impl PendingMutationQueue {
    pub fn new(store: SecureLocalStore) -> Self {
        let (changes, _) = watch::channel(0);
        Self { store, changes }
    }

    pub fn store(&self) -> &SecureLocalStore {
        &self.store
    }

    /// Ticks on every enqueue and delete.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Persist `payload` under a fresh id; returns the id.
    pub fn enqueue(&self, payload: &MutationPayload, now: DateTime<Utc>) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        let kind = payload.kind();
        let type_tag = kind.type_tag(&id);

        self.store.put(&id, &type_tag, &payload.to_json()?, now)?;
        self.bump();

        debug!(%id, kind = %kind, user = payload.user_id(), "mutation queued");
        self.store.db().with(|conn| {
            ttlog_quiet(conn, "queue", kind.as_str(), &format!("queued {id}"));
            Ok(())
        })?;
        Ok(id)
    }

    /// Decryptable entries of `user_id`, in enqueue order.
    pub fn drain_for_user(&self, user_id: &str) -> AppResult<Vec<PendingMutation>> {
        Ok(self
            .store
            .list_by_user_and_prefix::<serde_json::Value>(user_id, ANY_KIND)?
            .into_iter()
            .map(|r| PendingMutation {
                id: r.id,
                type_tag: r.type_tag,
                saved_at: r.saved_at,
                body: r.value,
            })
            .collect())
    }

    /// Decoded payloads of one kind for `user_id`, in enqueue order.
    pub fn pending_of_kind(
        &self,
        user_id: &str,
        kind: MutationKind,
    ) -> AppResult<Vec<(String, MutationPayload)>> {
        let records = self
            .store
            .list_by_user_and_prefix::<serde_json::Value>(user_id, &kind.prefix())?;

        let mut out = Vec::with_capacity(records.len());
        for r in records {
            match MutationPayload::decode(kind, r.value) {
                Ok(p) => out.push((r.id, p)),
                Err(e) => warn!(id = %r.id, error = %e, "queued payload does not decode"),
            }
        }
        Ok(out)
    }

    pub fn delete(&self, id: &str) -> AppResult<bool> {
        let removed = self.store.delete(id)?;
        if removed {
            self.bump();
        }
        Ok(removed)
    }

    pub fn oldest_saved_at(&self, user_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .drain_for_user(user_id)?
            .iter()
            .map(|m| m.saved_at)
            .min())
    }

    pub fn count_for_user(&self, user_id: &str) -> AppResult<usize> {
        Ok(self.drain_for_user(user_id)?.len())
    }

    fn bump(&self) {
        self.changes.send_modify(|n| *n = n.wrapping_add(1));
    }
}
