//! Time utilities: parsing HH:MM / HH:MM:SS, UTC offsets, formatting minutes.

use crate::errors::{AppError, AppResult};
use chrono::{FixedOffset, NaiveTime, Timelike};

pub fn parse_time(t: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(t.trim(), "%H:%M").ok()
}

/// Accepts both "HH:MM" and "HH:MM:SS" (schedules store tolerances as the latter).
pub fn parse_hms(t: &str) -> Option<NaiveTime> {
    let t = t.trim();
    NaiveTime::parse_from_str(t, "%H:%M:%S")
        .ok()
        .or_else(|| parse_time(t))
}

/// Tolerance strings such as "00:10:00" expressed as a duration.
pub fn parse_tolerance(t: &str) -> AppResult<chrono::Duration> {
    let tol = parse_hms(t).ok_or_else(|| AppError::InvalidTime(t.to_string()))?;
    Ok(chrono::Duration::seconds(i64::from(tol.num_seconds_from_midnight())))
}

/// Parse "+HH:MM" / "-HH:MM" into a fixed offset.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    let (h, m) = rest.split_once(':')?;
    let secs = h.parse::<i32>().ok()? * 3600 + m.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * secs)
}

/// Minutes rendered as "HH:MM", negative values clamped to zero.
pub fn format_minutes(mins: i64) -> String {
    let m = mins.max(0);
    format!("{:02}:{:02}", m / 60, m % 60)
}
