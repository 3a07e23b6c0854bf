//! Debounced reachability detection.
//!
//! `Unknown → Reachable ⇄ Unreachable`. One successful probe flips to
//! Reachable; `fail_threshold` consecutive failures flip to Unreachable.
//! The state is published through a `watch` channel and subscribers are only
//! woken on status changes.

use crate::config::ProbeSettings;
use crate::remote::RemoteAuthority;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReachabilityState {
    pub status: Reachability,
    pub consecutive_failures: u32,
}

impl Default for ReachabilityState {
    fn default() -> Self {
        Self {
            status: Reachability::Unknown,
            consecutive_failures: 0,
        }
    }
}

enum ProbeOutcome {
    Success,
    Failure,
    Superseded,
}

pub struct ReachabilityMonitor {
    remote: Arc<dyn RemoteAuthority>,
    settings: ProbeSettings,
    state: watch::Sender<ReachabilityState>,
    visible: watch::Sender<bool>,
    device_online: AtomicBool,
    generation: AtomicU64,
    in_flight: Mutex<Option<(u64, AbortHandle)>>,
}

impl ReachabilityMonitor {
    pub fn new(remote: Arc<dyn RemoteAuthority>, settings: ProbeSettings) -> Self {
        let (state, _) = watch::channel(ReachabilityState::default());
        let (visible, _) = watch::channel(true);
        Self {
            remote,
            settings,
            state,
            visible,
            device_online: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReachabilityState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ReachabilityState {
        *self.state.borrow()
    }

    pub fn is_reachable(&self) -> bool {
        self.state().status == Reachability::Reachable
    }

    /// Run one probe now, superseding any probe still in flight.
    pub async fn check_once(&self) -> ReachabilityState {
        match self.probe().await {
            ProbeOutcome::Success => self.record_success(),
            ProbeOutcome::Failure => self.record_failure(),
            ProbeOutcome::Superseded => {}
        }
        self.state()
    }

    /// The host reported the network gone.
    pub fn device_offline(&self) {
        self.device_online.store(false, Ordering::SeqCst);
        self.abort_in_flight();

        let threshold = self.settings.fail_threshold;
        self.publish(|s| {
            s.status = Reachability::Unreachable;
            s.consecutive_failures = threshold;
        });
        info!("device reported offline");
    }

    /// The host reported the network back; trust it and confirm with a probe.
    pub async fn device_online(&self) -> ReachabilityState {
        self.device_online.store(true, Ordering::SeqCst);
        self.publish(|s| {
            s.status = Reachability::Reachable;
            s.consecutive_failures = 0;
        });
        info!("device reported online");
        self.check_once().await
    }

    /// Probing only happens while visible; becoming visible probes at once.
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_if_modified(|v| {
            let changed = *v != visible;
            *v = visible;
            changed
        });
        if !visible {
            self.abort_in_flight();
        }
    }

    /// Poll until `token` is cancelled.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut visible = self.visible.subscribe();
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let is_visible = *visible.borrow_and_update();

            tokio::select! {
                _ = token.cancelled() => break,
                changed = visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *visible.borrow() {
                        debug!("resumed, probing immediately");
                        ticker.reset();
                        self.probe_or_cancel(&token).await;
                    }
                }
                _ = ticker.tick(), if is_visible => {
                    self.probe_or_cancel(&token).await;
                }
            }
        }

        self.abort_in_flight();
        debug!("reachability loop stopped");
    }

    async fn probe_or_cancel(&self, token: &CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = self.check_once() => {}
        }
    }

    async fn probe(&self) -> ProbeOutcome {
        if !self.device_online.load(Ordering::SeqCst) {
            return ProbeOutcome::Failure;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let remote = self.remote.clone();
        let timeout = self.settings.timeout;
        let handle = tokio::spawn(async move { tokio::time::timeout(timeout, remote.probe()).await });

        if let Ok(mut slot) = self.in_flight.lock()
            && let Some((_, previous)) = slot.replace((generation, handle.abort_handle()))
        {
            previous.abort();
        }

        let outcome = match handle.await {
            Ok(Ok(Ok(()))) => ProbeOutcome::Success,
            Ok(Ok(Err(e))) => {
                debug!(error = %e, "probe failed");
                ProbeOutcome::Failure
            }
            Ok(Err(_)) => {
                debug!("probe timed out");
                ProbeOutcome::Failure
            }
            Err(e) if e.is_cancelled() => ProbeOutcome::Superseded,
            Err(_) => ProbeOutcome::Failure,
        };

        if let Ok(mut slot) = self.in_flight.lock()
            && matches!(*slot, Some((g, _)) if g == generation)
        {
            *slot = None;
        }

        outcome
    }

    fn abort_in_flight(&self) {
        if let Ok(mut slot) = self.in_flight.lock()
            && let Some((_, handle)) = slot.take()
        {
            handle.abort();
        }
    }

    fn record_success(&self) {
        self.publish(|s| {
            s.status = Reachability::Reachable;
            s.consecutive_failures = 0;
        });
    }

    fn record_failure(&self) {
        let threshold = self.settings.fail_threshold;
        self.publish(|s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            if s.consecutive_failures >= threshold {
                s.status = Reachability::Unreachable;
            }
        });
    }

    /// Apply `f`; notify subscribers only when the status changed.
    fn publish(&self, f: impl FnOnce(&mut ReachabilityState)) {
        self.state.send_if_modified(|s| {
            let before = s.status;
            f(s);
            if before != s.status {
                info!(from = ?before, to = ?s.status, "reachability changed");
                true
            } else {
                false
            }
        });
    }
}
