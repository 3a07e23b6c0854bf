use super::geo::Coordinates;
use serde::{Deserialize, Serialize};

/// Working hours as delivered by the remote authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// "HH:MM"
    pub start: String,
    /// "HH:MM"
    pub end: String,
    /// "HH:MM:SS"
    pub tolerance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkInfo {
    pub office_name: String,
    pub lat: f64,
    pub lon: f64,
    /// Lowercase hex SHA-256 of the 4-digit PIN; empty when none configured.
    #[serde(default)]
    pub pin_hash: String,
}

impl WorkInfo {
    pub fn office(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub schedule: Option<Schedule>,
    pub work_info: Option<WorkInfo>,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub profile: UserProfile,
    /// Authenticated against the credential cache instead of the remote.
    pub offline: bool,
}
