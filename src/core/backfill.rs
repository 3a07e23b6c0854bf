//! Synthesizes absence punches for weekdays with missing punches, from the
//! first known punch up to today.

use crate::config::Policy;
use crate::core::history::AttendanceHistory;
use crate::core::outbox::Outbox;
use crate::db::log::ttlog_quiet;
use crate::db::pool::SharedDb;
use crate::errors::AppResult;
use crate::models::mutation::MutationPayload;
use crate::models::{AttendanceEvent, PunchKind};
use crate::utils::date::{local_date, weekdays_between};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Whether `now` falls inside the capture window on the institution clock.
pub fn in_capture_window(now: DateTime<Utc>, policy: &Policy) -> bool {
    let t = now.with_timezone(&policy.offset).time();
    t >= policy.window_start && t <= policy.window_end
}

/// Whether today's capture window has already closed.
fn window_closed(now: DateTime<Utc>, policy: &Policy) -> bool {
    now.with_timezone(&policy.offset).time() > policy.window_end
}

/// Absences owed for `known` punches as of `now`. Pure.
///
/// Today only counts once the capture window has closed, so a punch the
/// user can still make is never pre-empted.
pub fn plan(
    user_id: &str,
    known: &[AttendanceEvent],
    now: DateTime<Utc>,
    policy: &Policy,
) -> Vec<AttendanceEvent> {
    let mut per_day: HashMap<NaiveDate, Vec<PunchKind>> = HashMap::new();
    for e in known {
        per_day
            .entry(local_date(&e.timestamp, &policy.offset))
            .or_default()
            .push(e.kind);
    }

    let Some(first) = per_day.keys().min().copied() else {
        return Vec::new();
    };
    let today = local_date(&now, &policy.offset);
    let skip_today = !window_closed(now, policy);

    let mut out = Vec::new();
    for day in weekdays_between(first, today) {
        if day == today && skip_today {
            continue;
        }

        let at = day.and_time(policy.absence_anchor).and_utc();
        match per_day.get(&day).map(Vec::as_slice) {
            Some([_, _, ..]) => {}
            Some([only]) => out.push(AttendanceEvent::absence(user_id, only.counterpart(), at)),
            _ => {
                out.push(AttendanceEvent::absence(user_id, PunchKind::CheckIn, at));
                out.push(AttendanceEvent::absence(user_id, PunchKind::CheckOut, at));
            }
        }
    }
    out
}

pub struct AbsenceBackfiller {
    history: Arc<AttendanceHistory>,
    outbox: Arc<Outbox>,
    db: SharedDb,
    done: Mutex<HashSet<String>>,
}

impl AbsenceBackfiller {
    pub fn new(history: Arc<AttendanceHistory>, outbox: Arc<Outbox>, db: SharedDb) -> Self {
        Self {
            history,
            outbox,
            db,
            done: Mutex::new(HashSet::new()),
        }
    }

    /// Runs once per user for the lifetime of this backfiller; later calls
    /// return an empty list.
    pub async fn backfill(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<Vec<AttendanceEvent>> {
        let first_run = self
            .done
            .lock()
            .map(|mut done| done.insert(user_id.to_string()))
            .unwrap_or(false);
        if !first_run {
            debug!(user = user_id, "backfill already ran this session");
            return Ok(Vec::new());
        }

        let known = self.history.known(user_id).await?;
        let absences = plan(user_id, &known, now, self.history.policy());

        for e in &absences {
            self.outbox
                .deliver(MutationPayload::Attendance(e.clone()), now)
                .await?;
        }

        if !absences.is_empty() {
            info!(user = user_id, count = absences.len(), "absences backfilled");
            self.db.with(|conn| {
                ttlog_quiet(
                    conn,
                    "backfill",
                    user_id,
                    &format!("{} absence punches synthesized", absences.len()),
                );
                Ok(())
            })?;
        }
        Ok(absences)
    }
}
