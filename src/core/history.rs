//! Attendance as the user sees it: server-confirmed punches (remote when
//! reachable, the cache otherwise) plus whatever is still queued.

use crate::config::Policy;
use crate::core::reconcile::{Reconciler, stats};
use crate::db::cache::{Partition, PartitionCache};
use crate::errors::AppResult;
use crate::models::mutation::{MutationKind, MutationPayload};
use crate::models::user::UserProfile;
use crate::models::{AttendanceEvent, AttendanceStats, DailyAttendanceRecord};
use crate::remote::RemoteAuthority;
use crate::sync::{PendingMutationQueue, ReachabilityMonitor};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
}

#[derive(Debug, Clone)]
pub struct HistoryReport {
    pub records: Vec<DailyAttendanceRecord>,
    pub stats: AttendanceStats,
    pub source: Source,
    pub queued: usize,
}

pub struct AttendanceHistory {
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<ReachabilityMonitor>,
    queue: Arc<PendingMutationQueue>,
    cache: PartitionCache,
    policy: Policy,
}

fn cache_key(e: &AttendanceEvent) -> String {
    format!("{}-{}", e.kind.as_str(), e.timestamp.to_rfc3339())
}

impl AttendanceHistory {
    pub fn new(
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<ReachabilityMonitor>,
        queue: Arc<PendingMutationQueue>,
        cache: PartitionCache,
        policy: Policy,
    ) -> Self {
        Self {
            remote,
            monitor,
            queue,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Server-confirmed punches. A successful remote read refreshes the cache.
    pub async fn confirmed(&self, user_id: &str) -> AppResult<(Vec<AttendanceEvent>, Source)> {
        if self.monitor.is_reachable() {
            match self.remote.list_attendance(user_id).await {
                Ok(events) => {
                    self.cache
                        .replace_for_user(Partition::Attendance, user_id, &events, cache_key)?;
                    return Ok((events, Source::Remote));
                }
                Err(e) if e.is_transient() => {
                    warn!(user = user_id, error = %e, "attendance list failed, using cache");
                }
                Err(e) => return Err(e),
            }
        }

        let cached = self.cache.load_for_user(Partition::Attendance, user_id)?;
        Ok((cached, Source::Cache))
    }

    pub fn queued(&self, user_id: &str) -> AppResult<Vec<AttendanceEvent>> {
        Ok(self
            .queue
            .pending_of_kind(user_id, MutationKind::Attendance)?
            .into_iter()
            .filter_map(|(_, p)| match p {
                MutationPayload::Attendance(e) => Some(e),
                _ => None,
            })
            .collect())
    }

    /// Confirmed plus queued punches.
    pub async fn known(&self, user_id: &str) -> AppResult<Vec<AttendanceEvent>> {
        let (mut events, _) = self.confirmed(user_id).await?;
        events.extend(self.queued(user_id)?);
        Ok(events)
    }

    pub async fn report(&self, profile: &UserProfile) -> AppResult<HistoryReport> {
        let (mut events, source) = self.confirmed(&profile.user_id).await?;
        let queued = self.queued(&profile.user_id)?;
        let queued_count = queued.len();
        events.extend(queued);

        let reconciler = Reconciler::for_schedule(self.policy.offset, profile.schedule.as_ref())?;
        let records = reconciler.reconcile(&events);
        let stats = stats(&records);

        Ok(HistoryReport {
            records,
            stats,
            source,
            queued: queued_count,
        })
    }
}
