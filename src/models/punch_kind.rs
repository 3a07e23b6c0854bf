use serde::{Deserialize, Serialize};

/// Direction of a punch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PunchKind {
    CheckIn,
    CheckOut,
}

impl PunchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchKind::CheckIn => "check_in",
            PunchKind::CheckOut => "check_out",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PunchKind::CheckIn => "Check-in",
            PunchKind::CheckOut => "Check-out",
        }
    }

    /// The other half of a day's pair.
    pub fn counterpart(&self) -> Self {
        match self {
            PunchKind::CheckIn => PunchKind::CheckOut,
            PunchKind::CheckOut => PunchKind::CheckIn,
        }
    }

    pub fn is_in(&self) -> bool {
        matches!(self, PunchKind::CheckIn)
    }

    pub fn is_out(&self) -> bool {
        matches!(self, PunchKind::CheckOut)
    }
}
