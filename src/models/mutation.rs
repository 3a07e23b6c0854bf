use super::attendance::AttendanceEvent;
use super::incident::QueuedIncident;
use super::notification::Notification;
use crate::errors::AppResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Coarse routing kind of a queued mutation, carried in its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Attendance,
    Incident,
    Notification,
}

impl MutationKind {
    pub const ALL: [MutationKind; 3] = [
        MutationKind::Attendance,
        MutationKind::Incident,
        MutationKind::Notification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Attendance => "attendance",
            MutationKind::Incident => "incident",
            MutationKind::Notification => "notification",
        }
    }

    /// Tag prefix shared by every pending mutation of this kind.
    pub fn prefix(&self) -> String {
        format!("{}-pending-", self.as_str())
    }

    pub fn type_tag(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix(), suffix)
    }

    /// Parse the first two hyphen-separated segments of a type tag.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        let mut parts = tag.splitn(3, '-');
        let kind = parts.next()?;
        if parts.next()? != "pending" {
            return None;
        }
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded body of a queued mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload {
    Attendance(AttendanceEvent),
    Incident(QueuedIncident),
    Notification(Notification),
}

impl MutationPayload {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationPayload::Attendance(_) => MutationKind::Attendance,
            MutationPayload::Incident(_) => MutationKind::Incident,
            MutationPayload::Notification(_) => MutationKind::Notification,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            MutationPayload::Attendance(e) => &e.user_id,
            MutationPayload::Incident(i) => &i.user_id,
            MutationPayload::Notification(n) => &n.user_id,
        }
    }

    /// JSON body as stored; the kind lives in the type tag, not in the body.
    pub fn to_json(&self) -> AppResult<serde_json::Value> {
        Ok(match self {
            MutationPayload::Attendance(e) => serde_json::to_value(e)?,
            MutationPayload::Incident(i) => serde_json::to_value(i)?,
            MutationPayload::Notification(n) => serde_json::to_value(n)?,
        })
    }

    pub fn decode(kind: MutationKind, value: serde_json::Value) -> AppResult<Self> {
        Ok(match kind {
            MutationKind::Attendance => MutationPayload::Attendance(serde_json::from_value(value)?),
            MutationKind::Incident => MutationPayload::Incident(serde_json::from_value(value)?),
            MutationKind::Notification => {
                MutationPayload::Notification(serde_json::from_value(value)?)
            }
        })
    }
}

/// A decrypted queue entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub id: String,
    pub type_tag: String,
    pub saved_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

impl PendingMutation {
    pub fn kind(&self) -> Option<MutationKind> {
        MutationKind::from_type_tag(&self.type_tag)
    }

    pub fn decode(&self) -> Option<AppResult<MutationPayload>> {
        self.kind()
            .map(|k| MutationPayload::decode(k, self.body.clone()))
    }
}
