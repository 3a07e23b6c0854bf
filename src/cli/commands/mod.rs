pub mod backfill;
pub mod config;
pub mod db;
pub mod history;
pub mod incident;
pub mod init;
pub mod log;
pub mod login;
pub mod notifications;
pub mod punch;
pub mod queue;
pub mod status;
pub mod sync;
pub mod watch;

use crate::cli::parser::Cli;
use crate::config::Config;
use crate::core::engine::Engine;
use crate::errors::{AppError, AppResult};
use crate::models::user::UserProfile;
use crate::sync::Reachability;
use crate::ui::messages::{info, warning};
use chrono::{DateTime, Utc};

/// Open the engine and establish reachability before any write.
pub(crate) async fn online_engine(cfg: &Config) -> AppResult<Engine> {
    let engine = Engine::open(cfg)?;
    let attempts = cfg.probe_settings().fail_threshold;
    match engine.settle_reachability(attempts).await {
        Reachability::Reachable => info(format!("Server reachable at {}", cfg.remote_url)),
        _ => warning("Server unreachable, working offline"),
    }
    Ok(engine)
}

pub(crate) fn profile(engine: &Engine, cli: &Cli) -> AppResult<UserProfile> {
    engine.session.profile(cli.user.as_deref())
}

/// `--at` override or the current instant.
pub(crate) fn instant(at: &Option<String>) -> AppResult<DateTime<Utc>> {
    match at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| AppError::InvalidDate(s.clone())),
        None => Ok(Utc::now()),
    }
}
