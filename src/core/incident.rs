//! Incident reports: validation against eligible dates and the write path.

use crate::core::notifications::NotificationCenter;
use crate::core::outbox::{Delivery, Outbox};
use crate::db::cache::{Partition, PartitionCache};
use crate::errors::{AppError, AppResult};
use crate::models::incident::{Attachment, EligibleDate, IncidenceReport, IncidentSummary, QueuedIncident};
use crate::models::mutation::MutationPayload;
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::user::UserProfile;
use crate::remote::RemoteAuthority;
use crate::sync::{ExpirationGuard, ReachabilityMonitor};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct IncidentDraft {
    pub kind: String,
    pub description: String,
    pub incident_date: NaiveDate,
    pub attachments: Vec<Attachment>,
}

fn date_key(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub struct IncidentRecorder {
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<ReachabilityMonitor>,
    outbox: Arc<Outbox>,
    notifications: Arc<NotificationCenter>,
    guard: Arc<ExpirationGuard>,
    cache: PartitionCache,
}

impl IncidentRecorder {
    pub fn new(
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<ReachabilityMonitor>,
        outbox: Arc<Outbox>,
        notifications: Arc<NotificationCenter>,
        guard: Arc<ExpirationGuard>,
        cache: PartitionCache,
    ) -> Self {
        Self {
            remote,
            monitor,
            outbox,
            notifications,
            guard,
            cache,
        }
    }

    /// Dates the user may still justify; remote when reachable (refreshing
    /// the cache), cache otherwise.
    pub async fn eligible_dates(&self, user_id: &str) -> AppResult<Vec<EligibleDate>> {
        if self.monitor.is_reachable() {
            match self.remote.list_eligible_incident_dates(user_id).await {
                Ok(dates) => {
                    self.cache.replace_for_user(
                        Partition::EligibleDates,
                        user_id,
                        &dates,
                        |d| date_key(&d.date),
                    )?;
                    return Ok(dates);
                }
                Err(e) if e.is_transient() => {
                    warn!(user = user_id, error = %e, "eligible dates unavailable, using cache");
                }
                Err(e) => return Err(e),
            }
        }
        self.cache.load_for_user(Partition::EligibleDates, user_id)
    }

    /// Submitted incidents; remote when reachable (refreshing the cache),
    /// cache otherwise.
    pub async fn refresh(&self, user_id: &str) -> AppResult<Vec<IncidentSummary>> {
        if self.monitor.is_reachable() {
            match self.remote.list_incidents(user_id).await {
                Ok(list) => {
                    self.cache
                        .replace_for_user(Partition::Incidents, user_id, &list, |i| i.id.clone())?;
                    return Ok(list);
                }
                Err(e) if e.is_transient() => {
                    warn!(user = user_id, error = %e, "incident list failed, using cache");
                }
                Err(e) => return Err(e),
            }
        }
        self.cache.load_for_user(Partition::Incidents, user_id)
    }

    pub async fn record(
        &self,
        profile: &UserProfile,
        draft: IncidentDraft,
        now: DateTime<Utc>,
    ) -> AppResult<Delivery> {
        let user_id = profile.user_id.as_str();

        if draft.kind.trim().is_empty() {
            return Err(AppError::Validation("incident type is required".into()));
        }
        if draft.description.trim().is_empty() {
            return Err(AppError::Validation("description is required".into()));
        }
        if self.guard.is_expired(user_id, now)? {
            return Err(AppError::Locked(
                "unsynced data is too old; connect and sync first".into(),
            ));
        }

        let eligible = self.eligible_dates(user_id).await?;
        if !eligible.is_empty() && !eligible.iter().any(|d| d.date == draft.incident_date) {
            return Err(AppError::Validation(format!(
                "{} is not an eligible incident date",
                draft.incident_date
            )));
        }

        let report = IncidenceReport {
            user_id: user_id.to_string(),
            kind: draft.kind.trim().to_string(),
            description: draft.description.trim().to_string(),
            incident_date: draft.incident_date,
            attachments: draft.attachments,
        };

        let delivery = self
            .outbox
            .deliver(MutationPayload::Incident(QueuedIncident::from(&report)), now)
            .await?;

        if delivery.is_queued() {
            // the date is spoken for until the server answers
            self.cache.remove_entry(
                Partition::EligibleDates,
                user_id,
                &date_key(&report.incident_date),
            )?;
        }

        let notice = match &delivery {
            Delivery::Submitted => NewNotification::new(
                user_id,
                NotificationKind::Success,
                "Incident submitted",
                &format!("Incident '{}' for {} was submitted.", report.kind, report.incident_date),
            ),
            Delivery::Queued(_) => NewNotification::new(
                user_id,
                NotificationKind::Alert,
                "Incident stored",
                &format!(
                    "Incident '{}' for {} is stored on this device and will sync later.",
                    report.kind, report.incident_date
                ),
            ),
        }
        .with_metadata(json!({
            "type": report.kind,
            "incident_date": report.incident_date,
            "attachments": report.attachments.len(),
        }));
        if let Err(e) = self.notifications.create(notice, now).await {
            warn!(error = %e, "incident notification not recorded");
        }

        Ok(delivery)
    }
}
