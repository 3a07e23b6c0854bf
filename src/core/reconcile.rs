//! Raw punches → one [`DailyAttendanceRecord`] per calendar day.
//!
//! Pure: the same set of events always yields the same records, whatever
//! order they arrive in.

use crate::errors::AppResult;
use crate::models::user::Schedule;
use crate::models::{
    AttendanceEvent, AttendanceStats, Condition, DailyAttendanceRecord, Method, PunchKind,
};
use crate::utils::date::local_date;
use crate::utils::time::{parse_hms, parse_tolerance};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use std::collections::BTreeMap;

/// Schedule with its strings parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tolerance: Duration,
}

impl WorkSchedule {
    pub fn parse(s: &Schedule) -> AppResult<Self> {
        let parse = |v: &str| {
            parse_hms(v).ok_or_else(|| crate::errors::AppError::InvalidTime(v.to_string()))
        };
        Ok(Self {
            start: parse(&s.start)?,
            end: parse(&s.end)?,
            tolerance: parse_tolerance(&s.tolerance)?,
        })
    }

    /// On time up to and including `start + tolerance`, at minute precision.
    pub fn entry_condition(&self, local: NaiveTime) -> Condition {
        let minute = truncate_to_minute(local);
        let limit = self.start.overflowing_add_signed(self.tolerance).0;
        if minute <= limit {
            Condition::OnTime
        } else {
            Condition::Late
        }
    }

    /// Leaving before the scheduled end makes the day incomplete.
    pub fn exit_condition(&self, local: NaiveTime) -> Condition {
        if truncate_to_minute(local) < self.end {
            Condition::Incomplete
        } else {
            Condition::OnTime
        }
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}

/// Combine entry and exit conditions into the day's status.
pub fn final_status(entry: Option<Condition>, exit: Option<Condition>) -> Condition {
    use Condition::*;

    match (entry, exit) {
        (Some(OnTime), Some(OnTime)) => OnTime,
        (Some(OnTime), Some(Incomplete)) => Incomplete,
        (Some(OnTime), Some(Absent)) => Incomplete,
        (Some(Late), Some(OnTime)) => Late,
        (Some(Late), Some(Incomplete)) => Incomplete,
        (Some(Late), Some(Absent)) => Incomplete,
        (Some(Absent), Some(Absent)) => Absent,
        (Some(entry), _) => entry,
        (None, _) => Absent,
    }
}

#[derive(Default)]
struct DayPunches<'a> {
    first_in: Option<&'a AttendanceEvent>,
    last_out: Option<&'a AttendanceEvent>,
}

type Rank = (DateTime<Utc>, bool, Condition, Method);

/// Smallest wins: earliest, then real punches over absence placeholders.
/// Condition and method settle exact ties so input order never matters.
fn entry_rank(e: &AttendanceEvent) -> Rank {
    (e.timestamp, e.condition == Condition::Absent, e.condition, e.method)
}

/// Largest wins: latest, then real punches over absence placeholders.
fn exit_rank(e: &AttendanceEvent) -> Rank {
    (e.timestamp, e.condition != Condition::Absent, e.condition, e.method)
}

pub struct Reconciler {
    offset: FixedOffset,
    schedule: Option<WorkSchedule>,
}

impl Reconciler {
    pub fn new(offset: FixedOffset, schedule: Option<WorkSchedule>) -> Self {
        Self { offset, schedule }
    }

    pub fn for_schedule(offset: FixedOffset, schedule: Option<&Schedule>) -> AppResult<Self> {
        let schedule = schedule.map(WorkSchedule::parse).transpose()?;
        Ok(Self::new(offset, schedule))
    }

    pub fn reconcile(&self, events: &[AttendanceEvent]) -> Vec<DailyAttendanceRecord> {
        let mut days: BTreeMap<NaiveDate, DayPunches> = BTreeMap::new();

        for e in events {
            let day = days.entry(local_date(&e.timestamp, &self.offset)).or_default();
            match e.kind {
                PunchKind::CheckIn => {
                    let replace = day.first_in.is_none_or(|cur| entry_rank(e) < entry_rank(cur));
                    if replace {
                        day.first_in = Some(e);
                    }
                }
                PunchKind::CheckOut => {
                    let replace = day.last_out.is_none_or(|cur| exit_rank(e) > exit_rank(cur));
                    if replace {
                        day.last_out = Some(e);
                    }
                }
            }
        }

        days.into_iter()
            .map(|(date, punches)| self.record_for(date, punches))
            .collect()
    }

    fn record_for(&self, date: NaiveDate, punches: DayPunches) -> DailyAttendanceRecord {
        let local_time =
            |e: &AttendanceEvent| truncate_to_minute(e.timestamp.with_timezone(&self.offset).time());

        let check_in_time = punches.first_in.map(local_time);
        let check_out_time = punches.last_out.map(local_time);

        let entry_condition = punches.first_in.map(|e| match (&self.schedule, e.condition) {
            (_, Condition::Absent) => Condition::Absent,
            (Some(s), _) => s.entry_condition(local_time(e)),
            (None, stored) => stored,
        });
        let exit_condition = punches.last_out.map(|e| match (&self.schedule, e.condition) {
            (_, Condition::Absent) => Condition::Absent,
            (Some(s), _) => s.exit_condition(local_time(e)),
            (None, stored) => stored,
        });

        let worked_minutes = match (check_in_time, check_out_time) {
            (Some(i), Some(o)) => Some((o - i).num_minutes().max(0)),
            _ => None,
        };

        DailyAttendanceRecord {
            date,
            check_in_time,
            check_out_time,
            worked_minutes,
            entry_condition,
            exit_condition,
            final_status: final_status(entry_condition, exit_condition),
        }
    }
}

pub fn stats(records: &[DailyAttendanceRecord]) -> AttendanceStats {
    let mut s = AttendanceStats::default();

    for r in records {
        match r.final_status {
            Condition::OnTime => s.on_time += 1,
            Condition::Late => s.late += 1,
            Condition::Absent => s.absent += 1,
            Condition::Incomplete => s.incomplete += 1,
        }
    }

    if !records.is_empty() {
        s.percentage = ((s.on_time as f64 / records.len() as f64) * 100.0).round() as u32;
    }
    s
}
