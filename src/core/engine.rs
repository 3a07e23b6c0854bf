//! Wires the store, the sync machinery and the recorders for one device.

use crate::config::{Config, Policy, ProbeSettings};
use crate::core::backfill::AbsenceBackfiller;
use crate::core::history::AttendanceHistory;
use crate::core::incident::IncidentRecorder;
use crate::core::notifications::NotificationCenter;
use crate::core::outbox::Outbox;
use crate::core::punch::PunchRecorder;
use crate::core::session::SessionLogic;
use crate::db::cache::PartitionCache;
use crate::db::initialize::init_db;
use crate::db::pool::SharedDb;
use crate::db::secure_store::SecureLocalStore;
use crate::errors::AppResult;
use crate::models::AttendanceEvent;
use crate::models::user::UserProfile;
use crate::remote::{HttpRemote, RemoteAuthority};
use crate::security::DeviceKey;
use crate::sync::{
    ExpirationGuard, PendingMutationQueue, Reachability, ReachabilityMonitor, SyncDispatcher,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Engine {
    pub policy: Policy,
    pub store: SecureLocalStore,
    pub cache: PartitionCache,
    pub remote: Arc<dyn RemoteAuthority>,
    pub monitor: Arc<ReachabilityMonitor>,
    pub queue: Arc<PendingMutationQueue>,
    pub dispatcher: Arc<SyncDispatcher>,
    pub guard: Arc<ExpirationGuard>,
    pub outbox: Arc<Outbox>,
    pub history: Arc<AttendanceHistory>,
    pub backfiller: Arc<AbsenceBackfiller>,
    pub notifications: Arc<NotificationCenter>,
    pub punches: PunchRecorder,
    pub incidents: IncidentRecorder,
    pub session: SessionLogic,
}

impl Engine {
    pub fn new(
        store: SecureLocalStore,
        remote: Arc<dyn RemoteAuthority>,
        policy: Policy,
        probe: ProbeSettings,
    ) -> Self {
        let cache = PartitionCache::new(&store);
        let monitor = Arc::new(ReachabilityMonitor::new(remote.clone(), probe));
        let queue = Arc::new(PendingMutationQueue::new(store.clone()));
        let guard = Arc::new(ExpirationGuard::new(queue.clone(), policy.expiration));
        let outbox = Arc::new(Outbox::new(remote.clone(), monitor.clone(), queue.clone()));

        let notifications = Arc::new(NotificationCenter::new(
            remote.clone(),
            monitor.clone(),
            queue.clone(),
            outbox.clone(),
            cache.clone(),
            store.db().clone(),
        ));
        let dispatcher = Arc::new(
            SyncDispatcher::new(queue.clone(), remote.clone()).with_notifier(notifications.clone()),
        );
        let history = Arc::new(AttendanceHistory::new(
            remote.clone(),
            monitor.clone(),
            queue.clone(),
            cache.clone(),
            policy,
        ));
        let backfiller = Arc::new(AbsenceBackfiller::new(
            history.clone(),
            outbox.clone(),
            store.db().clone(),
        ));
        let punches = PunchRecorder::new(
            history.clone(),
            outbox.clone(),
            notifications.clone(),
            guard.clone(),
            policy,
        );
        let incidents = IncidentRecorder::new(
            remote.clone(),
            monitor.clone(),
            outbox.clone(),
            notifications.clone(),
            guard.clone(),
            cache.clone(),
        );
        let session = SessionLogic::new(remote.clone(), cache.clone(), store.cipher().clone());

        Self {
            policy,
            store,
            cache,
            remote,
            monitor,
            queue,
            dispatcher,
            guard,
            outbox,
            history,
            backfiller,
            notifications,
            punches,
            incidents,
            session,
        }
    }

    /// Open the configured database and key, talking HTTP to `remote_url`.
    pub fn open(cfg: &Config) -> AppResult<Self> {
        let db = SharedDb::open(&cfg.database)?;
        db.with(|conn| init_db(conn))?;
        let key = DeviceKey::load_or_create(&cfg.key_path())?;
        let store = SecureLocalStore::new(db, &key);

        let probe = cfg.probe_settings();
        let remote: Arc<dyn RemoteAuthority> =
            Arc::new(HttpRemote::new(&cfg.remote_url, probe.timeout * 4)?);

        Ok(Self::new(store, remote, cfg.policy()?, probe))
    }

    /// Establish reachability with up to `fail_threshold` probes, stopping
    /// at the first decisive answer.
    pub async fn settle_reachability(&self, attempts: u32) -> Reachability {
        for _ in 0..attempts.max(1) {
            let state = self.monitor.check_once().await;
            if state.status != Reachability::Unknown {
                return state.status;
            }
        }
        self.monitor.state().status
    }

    /// Session start: backfill absences once.
    pub async fn bootstrap(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<Vec<AttendanceEvent>> {
        self.backfiller.backfill(user_id, now).await
    }

    async fn drain(&self, user_id: &str) {
        match self.dispatcher.run_once(user_id).await {
            Ok(n) => info!(user = %user_id, synced = n, "queue drained"),
            Err(e) => warn!(user = %user_id, error = %e, "drain failed"),
        }
    }

    /// Keep `profile` in sync until `token` is cancelled: poll reachability,
    /// drain on every transition to Reachable, track expiration and refresh
    /// history after each pass.
    pub async fn run(&self, profile: &UserProfile, token: CancellationToken) -> AppResult<()> {
        let user_id = profile.user_id.clone();

        let mut reach = self.monitor.subscribe();
        let mut finished = self.dispatcher.subscribe();
        let (expired_tx, mut expired_rx) = watch::channel(false);

        let monitor_task = tokio::spawn(self.monitor.clone().run(token.child_token()));
        let guard_task = tokio::spawn(self.guard.clone().watch(
            user_id.clone(),
            self.monitor.subscribe(),
            expired_tx,
            token.child_token(),
        ));

        let mut last = reach.borrow_and_update().status;
        if last == Reachability::Reachable {
            self.drain(&user_id).await;
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                changed = reach.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now_status = reach.borrow_and_update().status;
                    if now_status == Reachability::Reachable && last != Reachability::Reachable {
                        self.drain(&user_id).await;
                    }
                    last = now_status;
                }
                msg = finished.recv() => match msg {
                    Ok(done) if done.user_id == user_id => {
                        match self.history.report(profile).await {
                            Ok(r) => info!(
                                user = %user_id,
                                days = r.records.len(),
                                on_time_pct = r.stats.percentage,
                                "history refreshed"
                            ),
                            Err(e) => warn!(user = %user_id, error = %e, "history refresh failed"),
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "sync notices lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = expired_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *expired_rx.borrow_and_update() {
                        warn!(user = %user_id, "offline data expired, write actions locked");
                    } else {
                        info!(user = %user_id, "write actions unlocked");
                    }
                }
            }
        }

        token.cancel();
        let _ = monitor_task.await;
        let _ = guard_task.await;
        Ok(())
    }
}
