#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rfieldclock::config::{Policy, ProbeSettings};
use rfieldclock::core::engine::Engine;
use rfieldclock::db::initialize::init_db;
use rfieldclock::db::pool::{DbPool, SharedDb};
use rfieldclock::db::secure_store::SecureLocalStore;
use rfieldclock::errors::{AppError, AppResult};
use rfieldclock::models::incident::{EligibleDate, IncidenceReport, IncidentSummary};
use rfieldclock::models::notification::Notification;
use rfieldclock::models::user::{Schedule, UserProfile, WorkInfo};
use rfieldclock::models::{AttendanceEvent, Condition, Method, PunchKind};
use rfieldclock::remote::RemoteAuthority;
use rfieldclock::security::DeviceKey;
use rfieldclock::security::cipher::pin_digest;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub fn rfc() -> Command {
    cargo_bin_cmd!("rfieldclock")
}

/// Create a unique test DB path inside the system temp dir and remove any
/// existing file (and its key)
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rfieldclock.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    fs::remove_file(path.with_extension("key")).ok();
    db_path
}

/// `--db <path> --test init`
pub fn init_test_db(db_path: &str) {
    rfc()
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();
}

pub const USER: &str = "u-100";
pub const USERNAME: &str = "ana";
pub const PASSWORD: &str = "s3cret";
pub const PIN: &str = "1234";
pub const OFFICE: (f64, f64) = (19.4326, -99.1332);

pub fn profile() -> UserProfile {
    UserProfile {
        user_id: USER.into(),
        username: USERNAME.into(),
        full_name: "Ana Torres".into(),
        schedule: Some(Schedule {
            start: "08:00".into(),
            end: "16:00".into(),
            tolerance: "00:10:00".into(),
        }),
        work_info: Some(WorkInfo {
            office_name: "Central".into(),
            lat: OFFICE.0,
            lon: OFFICE.1,
            pin_hash: pin_digest(PIN),
        }),
    }
}

/// Institution clock is UTC-6, so local = utc - 6h.
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h + 6, min, 0)
        .single()
        .expect("valid instant")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn punch(kind: PunchKind, condition: Condition, ts: DateTime<Utc>) -> AttendanceEvent {
    AttendanceEvent {
        user_id: USER.into(),
        kind,
        method: Method::Qr,
        condition,
        timestamp: ts,
        lat: OFFICE.0,
        lon: OFFICE.1,
    }
}

pub fn policy() -> Policy {
    Policy::default()
}

pub fn probe_settings() -> ProbeSettings {
    ProbeSettings {
        interval: Duration::from_millis(20),
        timeout: Duration::from_millis(200),
        fail_threshold: 2,
    }
}

/// Scriptable in-process stand-in for the server.
#[derive(Default)]
pub struct FakeRemote {
    pub offline: AtomicBool,
    /// Submissions fail with a network error while this is > 0.
    pub failing_submits: AtomicUsize,
    pub probes: AtomicUsize,
    /// Milliseconds every probe sleeps before answering.
    pub probe_delay_ms: AtomicU64,
    /// Milliseconds every submission sleeps before answering.
    pub submit_delay_ms: AtomicU64,
    pub attendance: Mutex<Vec<AttendanceEvent>>,
    pub incidents: Mutex<Vec<IncidenceReport>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub eligible: Mutex<Vec<EligibleDate>>,
    pub marked_read: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        let r = Self::default();
        r.offline.store(true, Ordering::SeqCst);
        Arc::new(r)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_next_submits(&self, n: usize) {
        self.failing_submits.store(n, Ordering::SeqCst);
    }

    pub fn submitted_attendance(&self) -> Vec<AttendanceEvent> {
        self.attendance.lock().expect("lock").clone()
    }

    fn up(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(AppError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }

    async fn submit_gate(&self) -> AppResult<()> {
        let delay = self.submit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.up()?;
        let left = self.failing_submits.load(Ordering::SeqCst);
        if left > 0 {
            self.failing_submits.store(left - 1, Ordering::SeqCst);
            return Err(AppError::Network("HTTP 503".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteAuthority for FakeRemote {
    async fn probe(&self) -> AppResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = self.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.up()
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<UserProfile> {
        self.up()?;
        if username == USERNAME && password == PASSWORD {
            Ok(profile())
        } else {
            Err(AppError::Auth("invalid credentials".into()))
        }
    }

    async fn submit_attendance(&self, event: &AttendanceEvent) -> AppResult<()> {
        self.submit_gate().await?;
        self.attendance.lock().expect("lock").push(event.clone());
        Ok(())
    }

    async fn list_attendance(&self, user_id: &str) -> AppResult<Vec<AttendanceEvent>> {
        self.up()?;
        Ok(self
            .attendance
            .lock()
            .expect("lock")
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn submit_incident(&self, report: &IncidenceReport) -> AppResult<()> {
        self.submit_gate().await?;
        self.incidents.lock().expect("lock").push(report.clone());
        Ok(())
    }

    async fn list_incidents(&self, user_id: &str) -> AppResult<Vec<IncidentSummary>> {
        self.up()?;
        Ok(self
            .incidents
            .lock()
            .expect("lock")
            .iter()
            .filter(|r| r.user_id == user_id)
            .enumerate()
            .map(|(i, r)| IncidentSummary {
                id: format!("inc-{i}"),
                user_id: r.user_id.clone(),
                kind: r.kind.clone(),
                description: r.description.clone(),
                incident_date: r.incident_date,
                status: "pending".into(),
                rejection_reason: None,
                attachment_urls: Vec::new(),
            })
            .collect())
    }

    async fn list_eligible_incident_dates(&self, _user_id: &str) -> AppResult<Vec<EligibleDate>> {
        self.up()?;
        Ok(self.eligible.lock().expect("lock").clone())
    }

    async fn submit_notification(&self, notification: &Notification) -> AppResult<()> {
        self.submit_gate().await?;
        self.notifications
            .lock()
            .expect("lock")
            .push(notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        self.up()?;
        Ok(self
            .notifications
            .lock()
            .expect("lock")
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: &str) -> AppResult<()> {
        self.up()?;
        self.marked_read.lock().expect("lock").push(id.to_string());
        Ok(())
    }

    async fn mark_notification_viewed(&self, _id: &str) -> AppResult<()> {
        self.up()
    }
}

pub fn memory_store() -> SecureLocalStore {
    let db = SharedDb::new(DbPool::in_memory().expect("in-memory db"));
    db.with(|conn| init_db(conn)).expect("init db");
    SecureLocalStore::new(db, &DeviceKey::generate())
}

pub fn memory_engine(remote: Arc<FakeRemote>) -> Engine {
    Engine::new(memory_store(), remote, policy(), probe_settings())
}

/// Engine with reachability settled against `remote`.
pub async fn settled_engine(remote: Arc<FakeRemote>) -> Engine {
    let engine = memory_engine(remote);
    engine.settle_reachability(2).await;
    engine
}
