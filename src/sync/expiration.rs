//! Offline lockout: once the oldest unsynced entry of a user is older than
//! the threshold, write actions are refused until a sync drains it.

use super::queue::PendingMutationQueue;
use super::reachability::ReachabilityState;
use crate::errors::AppResult;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationStatus {
    pub oldest: Option<DateTime<Utc>>,
    pub expired: bool,
    /// Time left before lockout; `None` with nothing queued.
    pub remaining: Option<Duration>,
}

pub struct ExpirationGuard {
    queue: Arc<PendingMutationQueue>,
    threshold: Duration,
}

impl ExpirationGuard {
    pub fn new(queue: Arc<PendingMutationQueue>, threshold: Duration) -> Self {
        Self { queue, threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn status(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<ExpirationStatus> {
        let oldest = self.queue.oldest_saved_at(user_id)?;
        Ok(match oldest {
            None => ExpirationStatus {
                oldest: None,
                expired: false,
                remaining: None,
            },
            Some(t) => {
                let age = now - t;
                ExpirationStatus {
                    oldest: Some(t),
                    expired: age >= self.threshold,
                    remaining: Some((self.threshold - age).max(Duration::zero())),
                }
            }
        })
    }

    pub fn is_expired(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<bool> {
        Ok(self.status(user_id, now)?.expired)
    }

    /// Recompute on every queue change, every reachability change and once a
    /// minute, publishing into `out` until `token` is cancelled.
    pub async fn watch(
        self: Arc<Self>,
        user_id: String,
        mut reachability: watch::Receiver<ReachabilityState>,
        out: watch::Sender<bool>,
        token: CancellationToken,
    ) {
        let mut queue_changes = self.queue.subscribe();
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));

        loop {
            match self.is_expired(&user_id, Utc::now()) {
                Ok(expired) => {
                    out.send_if_modified(|current| {
                        let changed = *current != expired;
                        *current = expired;
                        if changed {
                            info!(user = %user_id, expired, "offline expiration changed");
                        }
                        changed
                    });
                }
                Err(e) => warn!(user = %user_id, error = %e, "expiration check failed"),
            }

            tokio::select! {
                _ = token.cancelled() => break,
                r = queue_changes.changed() => {
                    if r.is_err() {
                        break;
                    }
                }
                r = reachability.changed() => {
                    if r.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {}
            }
        }
    }
}
