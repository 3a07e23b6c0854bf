//! Login with an offline fallback on the credential cache.

use crate::db::cache::{Partition, PartitionCache};
use crate::errors::{AppError, AppResult};
use crate::models::user::{Session, UserProfile};
use crate::remote::RemoteAuthority;
use crate::security::RecordCipher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const PROFILE_KEY: &str = "profile";
const SESSION_OWNER: &str = "_session";
const CURRENT_KEY: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCredentials {
    username: String,
    digest: String,
    profile: UserProfile,
    cached_at: DateTime<Utc>,
}

pub struct SessionLogic {
    remote: Arc<dyn RemoteAuthority>,
    cache: PartitionCache,
    cipher: Arc<RecordCipher>,
}

impl SessionLogic {
    pub fn new(remote: Arc<dyn RemoteAuthority>, cache: PartitionCache, cipher: Arc<RecordCipher>) -> Self {
        Self {
            remote,
            cache,
            cipher,
        }
    }

    /// Online first. Only a network failure falls back to the cache; a
    /// rejection from the server is final.
    pub async fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> AppResult<Session> {
        match self.remote.login(username, password).await {
            Ok(profile) => {
                let entry = CachedCredentials {
                    username: username.to_string(),
                    digest: self.cipher.credential_digest(username, password),
                    profile: profile.clone(),
                    cached_at: now,
                };
                self.cache
                    .put_entry(Partition::Credentials, username, PROFILE_KEY, &entry)?;
                self.remember(username)?;
                info!(user = %profile.user_id, "logged in online");
                Ok(Session {
                    profile,
                    offline: false,
                })
            }
            Err(AppError::Network(reason)) => {
                warn!(reason = %reason, "server unreachable, trying offline login");
                self.login_offline(username, password)
            }
            Err(e) => Err(e),
        }
    }

    fn login_offline(&self, username: &str, password: &str) -> AppResult<Session> {
        let entry: CachedCredentials = self
            .cache
            .get_entry(Partition::Credentials, username, PROFILE_KEY)?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "no cached credentials for '{username}'; log in once while online"
                ))
            })?;

        if !self
            .cipher
            .verify_credential(username, password, &entry.digest)
        {
            return Err(AppError::Auth("invalid credentials".into()));
        }

        self.remember(username)?;
        info!(user = %entry.profile.user_id, "logged in offline");
        Ok(Session {
            profile: entry.profile,
            offline: true,
        })
    }

    fn remember(&self, username: &str) -> AppResult<()> {
        self.cache
            .put_entry(Partition::Credentials, SESSION_OWNER, CURRENT_KEY, &username)
    }

    /// Profile of `username`, or of the last user who logged in.
    pub fn profile(&self, username: Option<&str>) -> AppResult<UserProfile> {
        let username = match username {
            Some(u) => u.to_string(),
            None => self
                .cache
                .get_entry::<String>(Partition::Credentials, SESSION_OWNER, CURRENT_KEY)?
                .ok_or_else(|| AppError::UnknownUser("nobody has logged in yet".into()))?,
        };

        self.cache
            .get_entry::<CachedCredentials>(Partition::Credentials, &username, PROFILE_KEY)?
            .map(|c| c.profile)
            .ok_or(AppError::UnknownUser(username))
    }

    pub fn logout(&self) -> AppResult<bool> {
        self.cache
            .remove_entry(Partition::Credentials, SESSION_OWNER, CURRENT_KEY)
    }
}
