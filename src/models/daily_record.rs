use super::attendance::Condition;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

/// One derived row per (user, day). Rebuilt from scratch on every pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAttendanceRecord {
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    /// Whole minutes worked; `None` when either endpoint is missing.
    pub worked_minutes: Option<i64>,
    pub entry_condition: Option<Condition>,
    pub exit_condition: Option<Condition>,
    pub final_status: Condition,
}

/// Aggregate counters derived from a reconciled history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub on_time: u32,
    pub late: u32,
    pub absent: u32,
    pub incomplete: u32,
    /// Rounded on-time share of all days, 0–100.
    pub percentage: u32,
}
