use super::attendance::Condition;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceReport {
    pub user_id: String,
    pub kind: String,
    pub description: String,
    pub incident_date: NaiveDate,
    pub attachments: Vec<Attachment>,
}

/// Attachment as it sits in the queue: binary content base64-encoded so the
/// payload stays plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedAttachment {
    pub name: String,
    pub mime: String,
    pub content: String,
}

/// Queue form of an [`IncidenceReport`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuedIncident {
    pub user_id: String,
    pub kind: String,
    pub description: String,
    pub incident_date: NaiveDate,
    #[serde(default)]
    pub attachments: Vec<QueuedAttachment>,
}

impl From<&IncidenceReport> for QueuedIncident {
    fn from(r: &IncidenceReport) -> Self {
        Self {
            user_id: r.user_id.clone(),
            kind: r.kind.clone(),
            description: r.description.clone(),
            incident_date: r.incident_date,
            attachments: r
                .attachments
                .iter()
                .map(|a| QueuedAttachment {
                    name: a.name.clone(),
                    mime: a.mime.clone(),
                    content: STANDARD.encode(&a.bytes),
                })
                .collect(),
        }
    }
}

impl QueuedIncident {
    /// Decode the stored attachments back into bytes.
    pub fn materialize(&self) -> AppResult<IncidenceReport> {
        let attachments = self
            .attachments
            .iter()
            .map(|a| {
                let bytes = STANDARD
                    .decode(&a.content)
                    .map_err(|e| AppError::Validation(format!("attachment {}: {e}", a.name)))?;
                Ok(Attachment {
                    name: a.name.clone(),
                    mime: a.mime.clone(),
                    bytes,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(IncidenceReport {
            user_id: self.user_id.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            incident_date: self.incident_date,
            attachments,
        })
    }
}

/// Incident as listed by the remote authority (and cached locally).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentSummary {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub description: String,
    pub incident_date: NaiveDate,
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
}

/// A day the user may still justify with an incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EligibleDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub final_status: Option<Condition>,
}
