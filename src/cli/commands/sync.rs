use super::{online_engine, profile};
use crate::cli::parser::Cli;
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let engine = online_engine(cfg).await?;
    let profile = profile(&engine, cli)?;
    let user = &profile.user_id;

    let before = engine.queue.count_for_user(user)?;
    if before == 0 {
        info("Nothing to sync");
        return Ok(());
    }

    if !engine.monitor.is_reachable() {
        warning(format!("{before} entries stay queued until the server is reachable"));
        return Ok(());
    }

    let synced = engine.dispatcher.run_once(user).await?;
    let left = engine.queue.count_for_user(user)?;

    if left == 0 {
        success(format!("Synced {synced} entries"));
    } else {
        warning(format!("Synced {synced} entries, {left} still pending"));
    }
    Ok(())
}
