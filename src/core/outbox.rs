//! Write path: submit directly while the remote is reachable, otherwise
//! (or on a transient failure) park the payload in the pending queue.

use crate::errors::AppResult;
use crate::models::mutation::MutationPayload;
use crate::remote::RemoteAuthority;
use crate::sync::handlers::submit;
use crate::sync::{PendingMutationQueue, ReachabilityMonitor};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Submitted,
    /// Parked under this queue id.
    Queued(String),
}

impl Delivery {
    pub fn is_queued(&self) -> bool {
        matches!(self, Delivery::Queued(_))
    }
}

pub struct Outbox {
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<ReachabilityMonitor>,
    queue: Arc<PendingMutationQueue>,
}

impl Outbox {
    pub fn new(
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<ReachabilityMonitor>,
        queue: Arc<PendingMutationQueue>,
    ) -> Self {
        Self {
            remote,
            monitor,
            queue,
        }
    }

    pub async fn deliver(&self, payload: MutationPayload, now: DateTime<Utc>) -> AppResult<Delivery> {
        if self.monitor.is_reachable() {
            match submit(self.remote.as_ref(), &payload).await {
                Ok(()) => {
                    debug!(kind = %payload.kind(), "submitted directly");
                    return Ok(Delivery::Submitted);
                }
                Err(e) if e.is_transient() => {
                    warn!(kind = %payload.kind(), error = %e, "direct submit failed, queueing");
                }
                Err(e) => return Err(e),
            }
        }

        let id = self.queue.enqueue(&payload, now)?;
        Ok(Delivery::Queued(id))
    }
}
