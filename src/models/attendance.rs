use super::punch_kind::PunchKind;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the punch was captured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Pin,
    Qr,
    Face,
    /// Synthesized by the backfiller, never captured.
    None,
}

impl Method {
    pub fn from_code(code: &str) -> AppResult<Self> {
        match code.to_lowercase().as_str() {
            "pin" => Ok(Method::Pin),
            "qr" => Ok(Method::Qr),
            "face" => Ok(Method::Face),
            other => Err(AppError::InvalidMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Pin => "pin",
            Method::Qr => "qr",
            Method::Face => "face",
            Method::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    OnTime,
    Late,
    Absent,
    Incomplete,
}

/// A single check-in or check-out. Written once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceEvent {
    pub user_id: String,
    pub kind: PunchKind,
    pub method: Method,
    pub condition: Condition,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
}

impl AttendanceEvent {
    /// Absence placeholder produced by the backfiller.
    pub fn absence(user_id: &str, kind: PunchKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind,
            method: Method::None,
            condition: Condition::Absent,
            timestamp,
            lat: 0.0,
            lon: 0.0,
        }
    }
}
