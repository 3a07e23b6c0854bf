//! Seam to the remote system of record.

pub mod http;

use crate::errors::AppResult;
use crate::models::AttendanceEvent;
use crate::models::incident::{EligibleDate, IncidenceReport, IncidentSummary};
use crate::models::notification::Notification;
use crate::models::user::UserProfile;
use async_trait::async_trait;

pub use http::HttpRemote;

/// Everything the engine asks of the server.
///
/// `Network` errors mean "try again later"; `Auth` errors mean the server
/// rejected the caller.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Cheap reachability check. Must not be cached by intermediaries.
    async fn probe(&self) -> AppResult<()>;

    async fn login(&self, username: &str, password: &str) -> AppResult<UserProfile>;

    async fn submit_attendance(&self, event: &AttendanceEvent) -> AppResult<()>;

    async fn list_attendance(&self, user_id: &str) -> AppResult<Vec<AttendanceEvent>>;

    async fn submit_incident(&self, report: &IncidenceReport) -> AppResult<()>;

    async fn list_incidents(&self, user_id: &str) -> AppResult<Vec<IncidentSummary>>;

    async fn list_eligible_incident_dates(&self, user_id: &str) -> AppResult<Vec<EligibleDate>>;

    async fn submit_notification(&self, notification: &Notification) -> AppResult<()>;

    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: &str) -> AppResult<()>;

    async fn mark_notification_viewed(&self, id: &str) -> AppResult<()>;
}
