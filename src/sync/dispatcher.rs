//! Drains the pending-mutation queue against the remote authority.

use super::handlers::{MutationHandler, default_handlers};
use super::queue::PendingMutationQueue;
use crate::db::log::ttlog_quiet;
use crate::errors::AppResult;
use crate::models::mutation::{MutationKind, MutationPayload};
use crate::models::notification::NewNotification;
use crate::remote::RemoteAuthority;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Sent after every completed drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFinished {
    pub user_id: String,
    pub count: usize,
}

/// Receives "this record was synced" notices.
#[async_trait]
pub trait SyncNotifier: Send + Sync {
    async fn synced(&self, notice: NewNotification);
}

pub struct SyncDispatcher {
    queue: Arc<PendingMutationQueue>,
    remote: Arc<dyn RemoteAuthority>,
    handlers: HashMap<MutationKind, Arc<dyn MutationHandler>>,
    notifier: Option<Arc<dyn SyncNotifier>>,
    running: AtomicBool,
    finished: broadcast::Sender<SyncFinished>,
}

/// Clears the in-flight flag however the pass ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncDispatcher {
    pub fn new(queue: Arc<PendingMutationQueue>, remote: Arc<dyn RemoteAuthority>) -> Self {
        let (finished, _) = broadcast::channel(16);
        Self {
            queue,
            remote,
            handlers: default_handlers(),
            notifier: None,
            running: AtomicBool::new(false),
            finished,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SyncNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_handler(mut self, kind: MutationKind, handler: Arc<dyn MutationHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncFinished> {
        self.finished.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Replay every pending mutation of `user_id` once, in enqueue order.
    ///
    /// Returns the number confirmed and removed. A call made while another
    /// pass is running returns 0 without touching the queue.
    pub async fn run_once(&self, user_id: &str) -> AppResult<usize> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(user = user_id, "sync already running, skipping");
            return Ok(0);
        }
        let _guard = RunningGuard(&self.running);

        let result = self.pass(user_id).await;
        let _ = self.finished.send(SyncFinished {
            user_id: user_id.to_string(),
            count: result.as_ref().map_or(0, |n| *n),
        });
        result
    }

    /// One replay pass. Only a failure to list the queue aborts it; every
    /// per-record problem is logged and the pass moves on.
    async fn pass(&self, user_id: &str) -> AppResult<usize> {
        let pending = self.queue.drain_for_user(user_id)?;
        let total = pending.len();
        let mut synced = 0;

        for mutation in pending {
            let Some(kind) = mutation.kind() else {
                warn!(id = %mutation.id, type_tag = %mutation.type_tag, "unknown mutation kind, skipped");
                continue;
            };
            let Some(handler) = self.handlers.get(&kind) else {
                warn!(id = %mutation.id, kind = %kind, "no handler registered, skipped");
                continue;
            };
            let payload = match MutationPayload::decode(kind, mutation.body) {
                Ok(p) => p,
                Err(e) => {
                    warn!(id = %mutation.id, error = %e, "undecodable mutation, skipped");
                    continue;
                }
            };

            let notice = match handler.replay(self.remote.as_ref(), &payload).await {
                Ok(notice) => notice,
                Err(e) => {
                    warn!(id = %mutation.id, kind = %kind, error = %e, "sync failed, kept for retry");
                    continue;
                }
            };

            if let Err(e) = self.queue.delete(&mutation.id) {
                warn!(id = %mutation.id, kind = %kind, error = %e, "replayed but could not be removed");
                continue;
            }
            synced += 1;
            debug!(id = %mutation.id, kind = %kind, "mutation synced");

            if let (Some(notice), Some(notifier)) = (notice, &self.notifier) {
                notifier.synced(notice).await;
            }
        }

        if total > 0 {
            info!(user = user_id, synced, pending = total - synced, "sync pass finished");
            let logged = self.queue.store().db().with(|conn| {
                ttlog_quiet(conn, "sync", user_id, &format!("{synced}/{total} mutations synced"));
                Ok(())
            });
            if let Err(e) = logged {
                warn!(user = user_id, error = %e, "could not write sync audit row");
            }
        }

        Ok(synced)
    }
}
