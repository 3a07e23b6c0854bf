//! Notification center: the single owner of notification read/hidden state.

use crate::core::outbox::{Delivery, Outbox};
use crate::db::cache::{Partition, PartitionCache};
use crate::db::flags;
use crate::db::pool::SharedDb;
use crate::errors::AppResult;
use crate::models::mutation::{MutationKind, MutationPayload};
use crate::models::notification::{NewNotification, Notification};
use crate::remote::RemoteAuthority;
use crate::sync::{PendingMutationQueue, ReachabilityMonitor, SyncNotifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub struct NotificationCenter {
    remote: Arc<dyn RemoteAuthority>,
    monitor: Arc<ReachabilityMonitor>,
    queue: Arc<PendingMutationQueue>,
    outbox: Arc<Outbox>,
    cache: PartitionCache,
    db: SharedDb,
}

impl NotificationCenter {
    pub fn new(
        remote: Arc<dyn RemoteAuthority>,
        monitor: Arc<ReachabilityMonitor>,
        queue: Arc<PendingMutationQueue>,
        outbox: Arc<Outbox>,
        cache: PartitionCache,
        db: SharedDb,
    ) -> Self {
        Self {
            remote,
            monitor,
            queue,
            outbox,
            cache,
            db,
        }
    }

    fn queued(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        Ok(self
            .queue
            .pending_of_kind(user_id, MutationKind::Notification)?
            .into_iter()
            .filter_map(|(_, p)| match p {
                MutationPayload::Notification(n) => Some(n),
                _ => None,
            })
            .collect())
    }

    /// Known notifications without applying local flags.
    async fn load(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        if self.monitor.is_reachable() {
            match self.remote.list_notifications(user_id).await {
                Ok(list) => {
                    self.cache.replace_for_user(
                        Partition::Notifications,
                        user_id,
                        &list,
                        |n| n.id.clone(),
                    )?;

                    let server_read: Vec<String> =
                        list.iter().filter(|n| n.read).map(|n| n.id.clone()).collect();
                    self.db
                        .with(|conn| flags::clear_read(conn, user_id, &server_read))?;

                    let mut all = list;
                    all.extend(self.queued(user_id)?);
                    return Ok(all);
                }
                Err(e) if e.is_transient() => {
                    warn!(user = user_id, error = %e, "notification list failed, using cache");
                }
                Err(e) => return Err(e),
            }
        }

        let mut all: Vec<Notification> =
            self.cache.load_for_user(Partition::Notifications, user_id)?;
        let seen: HashSet<String> = all.iter().map(|n| n.id.clone()).collect();
        all.extend(
            self.queued(user_id)?
                .into_iter()
                .filter(|n| !seen.contains(&n.id)),
        );
        Ok(all)
    }

    /// Visible notifications, newest first, with local read flags applied.
    pub async fn fetch(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let list = self.load(user_id).await?;
        self.apply_flags(user_id, list)
    }

    /// Like [`fetch`](Self::fetch) but never touches the network.
    pub fn cached(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let mut all: Vec<Notification> =
            self.cache.load_for_user(Partition::Notifications, user_id)?;
        all.extend(self.queued(user_id)?);
        self.apply_flags(user_id, all)
    }

    fn apply_flags(&self, user_id: &str, list: Vec<Notification>) -> AppResult<Vec<Notification>> {
        let flags = self.db.with(|conn| flags::load(conn, user_id))?;

        let mut visible: Vec<Notification> = list
            .into_iter()
            .filter_map(|mut n| {
                let f = flags.get(&n.id).copied().unwrap_or_default();
                if f.hidden {
                    return None;
                }
                n.read = n.read || f.read;
                Some(n)
            })
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    pub async fn create(
        &self,
        new: NewNotification,
        now: DateTime<Utc>,
    ) -> AppResult<(Notification, Delivery)> {
        let n = new.into_notification(Uuid::new_v4().to_string(), now);
        let delivery = self
            .outbox
            .deliver(MutationPayload::Notification(n.clone()), now)
            .await?;

        if delivery == Delivery::Submitted {
            self.cache
                .put_entry(Partition::Notifications, &n.user_id, &n.id, &n)?;
        }
        Ok((n, delivery))
    }

    pub async fn mark_read(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with(|conn| flags::set_read(conn, user_id, id))?;

        if self.monitor.is_reachable()
            && let Err(e) = self.remote.mark_notification_read(id).await
        {
            warn!(id, error = %e, "remote mark-read failed, kept locally");
        }
        Ok(())
    }

    /// Returns how many notifications were newly marked.
    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<usize> {
        let unread: Vec<String> = self
            .cached(user_id)?
            .into_iter()
            .filter(|n| !n.read)
            .map(|n| n.id)
            .collect();

        for id in &unread {
            self.mark_read(user_id, id).await?;
        }
        Ok(unread.len())
    }

    pub fn hide(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.db.with(|conn| flags::set_hidden(conn, user_id, id))
    }

    pub fn unread_count(&self, user_id: &str) -> AppResult<usize> {
        Ok(self.cached(user_id)?.iter().filter(|n| !n.read).count())
    }
}

#[async_trait]
impl SyncNotifier for NotificationCenter {
    async fn synced(&self, notice: NewNotification) {
        if let Err(e) = self.create(notice, Utc::now()).await {
            warn!(error = %e, "could not record sync notice");
        }
    }
}
