//! Per-kind replay of queued mutations.

use crate::errors::{AppError, AppResult};
use crate::models::mutation::{MutationKind, MutationPayload};
use crate::models::notification::{NewNotification, NotificationKind};
use crate::remote::RemoteAuthority;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Send a payload to the remote authority exactly as captured.
pub async fn submit(remote: &dyn RemoteAuthority, payload: &MutationPayload) -> AppResult<()> {
    match payload {
        MutationPayload::Attendance(event) => remote.submit_attendance(event).await,
        MutationPayload::Incident(incident) => {
            remote.submit_incident(&incident.materialize()?).await
        }
        MutationPayload::Notification(n) => remote.submit_notification(n).await,
    }
}

#[async_trait]
pub trait MutationHandler: Send + Sync {
    /// Replay one queued payload. On success, optionally describe what was
    /// synced so the user can be told.
    async fn replay(
        &self,
        remote: &dyn RemoteAuthority,
        payload: &MutationPayload,
    ) -> AppResult<Option<NewNotification>>;
}

fn wrong_kind(expected: MutationKind, payload: &MutationPayload) -> AppError {
    AppError::Validation(format!(
        "{} handler got a {} payload",
        expected,
        payload.kind()
    ))
}

pub struct AttendanceHandler;

#[async_trait]
impl MutationHandler for AttendanceHandler {
    async fn replay(
        &self,
        remote: &dyn RemoteAuthority,
        payload: &MutationPayload,
    ) -> AppResult<Option<NewNotification>> {
        let MutationPayload::Attendance(event) = payload else {
            return Err(wrong_kind(MutationKind::Attendance, payload));
        };
        remote.submit_attendance(event).await?;

        let when = event.timestamp.format("%Y-%m-%d %H:%M UTC");
        Ok(Some(
            NewNotification::new(
                &event.user_id,
                NotificationKind::Success,
                "Attendance synced",
                &format!("{} of {} was delivered to the server.", event.kind.label(), when),
            )
            .with_metadata(json!({
                "kind": event.kind.as_str(),
                "timestamp": event.timestamp,
                "condition": event.condition,
            })),
        ))
    }
}

pub struct IncidentHandler;

#[async_trait]
impl MutationHandler for IncidentHandler {
    async fn replay(
        &self,
        remote: &dyn RemoteAuthority,
        payload: &MutationPayload,
    ) -> AppResult<Option<NewNotification>> {
        let MutationPayload::Incident(incident) = payload else {
            return Err(wrong_kind(MutationKind::Incident, payload));
        };
        let report = incident.materialize()?;
        remote.submit_incident(&report).await?;

        Ok(Some(
            NewNotification::new(
                &report.user_id,
                NotificationKind::Success,
                "Incident synced",
                &format!(
                    "Incident '{}' for {} was delivered to the server.",
                    report.kind, report.incident_date
                ),
            )
            .with_metadata(json!({
                "type": report.kind,
                "incident_date": report.incident_date,
                "attachments": report.attachments.len(),
            })),
        ))
    }
}

/// Notifications created offline were already seen locally.
pub struct NotificationHandler;

#[async_trait]
impl MutationHandler for NotificationHandler {
    async fn replay(
        &self,
        remote: &dyn RemoteAuthority,
        payload: &MutationPayload,
    ) -> AppResult<Option<NewNotification>> {
        let MutationPayload::Notification(n) = payload else {
            return Err(wrong_kind(MutationKind::Notification, payload));
        };
        let mut n = n.clone();
        n.read = true;
        n.viewed = true;
        remote.submit_notification(&n).await?;
        Ok(None)
    }
}

pub fn default_handlers() -> HashMap<MutationKind, Arc<dyn MutationHandler>> {
    let mut map: HashMap<MutationKind, Arc<dyn MutationHandler>> = HashMap::new();
    map.insert(MutationKind::Attendance, Arc::new(AttendanceHandler));
    map.insert(MutationKind::Incident, Arc::new(IncidentHandler));
    map.insert(MutationKind::Notification, Arc::new(NotificationHandler));
    map
}
