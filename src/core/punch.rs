//! Live punch capture: validation, kind/condition resolution and the write
//! path.

use crate::config::Policy;
use crate::core::backfill::in_capture_window;
use crate::core::history::AttendanceHistory;
use crate::core::notifications::NotificationCenter;
use crate::core::outbox::{Delivery, Outbox};
use crate::core::reconcile::WorkSchedule;
use crate::errors::{AppError, AppResult};
use crate::models::geo::Coordinates;
use crate::models::mutation::MutationPayload;
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::user::UserProfile;
use crate::models::{AttendanceEvent, Method, PunchKind};
use crate::security::cipher::pin_digest;
use crate::sync::ExpirationGuard;
use crate::utils::date::{is_weekday, local_date};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What a capture collaborator (PIN pad, QR scanner, face matcher) hands
/// over once it has succeeded.
#[derive(Debug, Clone)]
pub struct Capture {
    pub method: Method,
    pub position: Coordinates,
    /// Only for [`Method::Pin`].
    pub pin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PunchOutcome {
    pub event: AttendanceEvent,
    pub delivery: Delivery,
    pub distance_meters: f64,
}

pub struct PunchRecorder {
    history: Arc<AttendanceHistory>,
    outbox: Arc<Outbox>,
    notifications: Arc<NotificationCenter>,
    guard: Arc<ExpirationGuard>,
    policy: Policy,
}

impl PunchRecorder {
    pub fn new(
        history: Arc<AttendanceHistory>,
        outbox: Arc<Outbox>,
        notifications: Arc<NotificationCenter>,
        guard: Arc<ExpirationGuard>,
        policy: Policy,
    ) -> Self {
        Self {
            history,
            outbox,
            notifications,
            guard,
            policy,
        }
    }

    pub async fn record(
        &self,
        profile: &UserProfile,
        capture: &Capture,
        now: DateTime<Utc>,
    ) -> AppResult<PunchOutcome> {
        let user_id = profile.user_id.as_str();

        if self.guard.is_expired(user_id, now)? {
            return Err(AppError::Locked(format!(
                "unsynced data is older than {} hours; connect and sync first",
                self.guard.threshold().num_hours()
            )));
        }

        let known = self.history.known(user_id).await?;

        if capture.method == Method::Pin {
            self.check_pin(profile, capture.pin.as_deref())?;
            self.check_pin_limit(&known, now)?;
        }

        let today = local_date(&now, &self.policy.offset);
        if !is_weekday(today) {
            return Err(AppError::Validation(
                "punches are only accepted Monday to Friday".into(),
            ));
        }
        if !in_capture_window(now, &self.policy) {
            return Err(AppError::Validation(format!(
                "outside the capture window ({}–{})",
                self.policy.window_start.format("%H:%M"),
                self.policy.window_end.format("%H:%M")
            )));
        }

        let (has_in, has_out) = known
            .iter()
            .filter(|e| local_date(&e.timestamp, &self.policy.offset) == today)
            .fold((false, false), |(i, o), e| (i || e.kind.is_in(), o || e.kind.is_out()));
        if has_in && has_out {
            return Err(AppError::Validation(
                "check-in and check-out are already registered today".into(),
            ));
        }

        let work = profile
            .work_info
            .as_ref()
            .ok_or_else(|| AppError::Validation("no office location configured".into()))?;
        let distance = work.office().distance_to(&capture.position);
        if distance > self.policy.max_distance_meters {
            return Err(AppError::Validation(format!(
                "{:.0} m away from {}, limit is {:.0} m",
                distance, work.office_name, self.policy.max_distance_meters
            )));
        }

        let schedule = profile
            .schedule
            .as_ref()
            .ok_or_else(|| AppError::Validation("no work schedule configured".into()))
            .and_then(WorkSchedule::parse)?;

        let kind = if has_in {
            PunchKind::CheckOut
        } else {
            PunchKind::CheckIn
        };
        let local = now.with_timezone(&self.policy.offset).time();
        let condition = match kind {
            PunchKind::CheckIn => schedule.entry_condition(local),
            PunchKind::CheckOut => schedule.exit_condition(local),
        };

        let event = AttendanceEvent {
            user_id: user_id.to_string(),
            kind,
            method: capture.method,
            condition,
            timestamp: now,
            lat: capture.position.lat,
            lon: capture.position.lon,
        };

        let delivery = self
            .outbox
            .deliver(MutationPayload::Attendance(event.clone()), now)
            .await?;
        info!(user = user_id, kind = kind.as_str(), queued = delivery.is_queued(), "punch recorded");

        let notice = match &delivery {
            Delivery::Submitted => NewNotification::new(
                user_id,
                NotificationKind::Success,
                "Attendance registered",
                &format!("{} of the day registered.", kind.label()),
            ),
            Delivery::Queued(_) => NewNotification::new(
                user_id,
                NotificationKind::Alert,
                "Attendance stored",
                &format!(
                    "{} stored on this device; it will sync when the connection returns.",
                    kind.label()
                ),
            ),
        }
        .with_metadata(json!({
            "kind": kind.as_str(),
            "condition": condition,
            "timestamp": now,
            "location": { "lat": capture.position.lat, "lon": capture.position.lon },
            "office": work.office_name,
        }));
        if let Err(e) = self.notifications.create(notice, now).await {
            warn!(error = %e, "punch notification not recorded");
        }

        Ok(PunchOutcome {
            event,
            delivery,
            distance_meters: distance,
        })
    }

    fn check_pin(&self, profile: &UserProfile, pin: Option<&str>) -> AppResult<()> {
        let pin = pin.unwrap_or_default();
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation("the PIN must be 4 digits".into()));
        }

        let stored = profile
            .work_info
            .as_ref()
            .map(|w| w.pin_hash.to_lowercase())
            .unwrap_or_default();
        if stored.is_empty() {
            return Err(AppError::Validation("no PIN configured for this user".into()));
        }
        if pin_digest(pin) != stored {
            return Err(AppError::Validation("wrong PIN".into()));
        }
        Ok(())
    }

    /// Fewer than `pin_days_per_month` complete PIN days this month.
    fn check_pin_limit(&self, known: &[AttendanceEvent], now: DateTime<Utc>) -> AppResult<()> {
        let today = local_date(&now, &self.policy.offset);

        let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
        for e in known.iter().filter(|e| e.method == Method::Pin) {
            let d = local_date(&e.timestamp, &self.policy.offset);
            if d.year() == today.year() && d.month() == today.month() {
                *per_day.entry(d).or_default() += 1;
            }
        }

        let complete = per_day.values().filter(|&&n| n >= 2).count();
        if complete >= self.policy.pin_days_per_month {
            return Err(AppError::Validation(format!(
                "PIN limit reached: {} complete PIN days this month",
                complete
            )));
        }
        Ok(())
    }
}
