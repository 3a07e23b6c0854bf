use super::online_engine;
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::db::log::ttlog_quiet;
use crate::errors::AppResult;
use crate::ui::messages::{detail, info, success, warning};
use chrono::Utc;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Login { username, password } => {
            let engine = online_engine(cfg).await?;
            let session = engine.session.login(username, password, Utc::now()).await?;

            engine.store.db().with(|conn| {
                let mode = if session.offline { "offline" } else { "online" };
                ttlog_quiet(conn, "login", username, &format!("{mode} login"));
                Ok(())
            })?;

            let p = &session.profile;
            if session.offline {
                warning(format!("Logged in OFFLINE as {} ({})", p.full_name, p.username));
            } else {
                success(format!("Logged in as {} ({})", p.full_name, p.username));
            }
            if let Some(work) = &p.work_info {
                detail("Office", &work.office_name);
            }
            if let Some(s) = &p.schedule {
                detail("Schedule", format!("{} - {} (tolerance {})", s.start, s.end, s.tolerance));
            }

            let absences = engine.bootstrap(&p.user_id, Utc::now()).await?;
            if !absences.is_empty() {
                warning(format!("{} absence punches recorded for missed days", absences.len()));
            }
        }
        Commands::Logout => {
            let engine = crate::core::engine::Engine::open(cfg)?;
            if engine.session.logout()? {
                success("Logged out");
            } else {
                info("No active session");
            }
        }
        _ => {}
    }
    Ok(())
}
