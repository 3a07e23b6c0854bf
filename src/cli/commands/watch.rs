use super::{online_engine, profile};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Watch { duration } = &cli.command else {
        return Ok(());
    };
    let engine = online_engine(cfg).await?;
    let profile = profile(&engine, cli)?;

    let absences = engine.bootstrap(&profile.user_id, Utc::now()).await?;
    if !absences.is_empty() {
        warning(format!("{} absence punches recorded", absences.len()));
    }

    let token = CancellationToken::new();
    let stopper = token.clone();
    let limit = duration.map(Duration::from_secs);
    tokio::spawn(async move {
        match limit {
            Some(d) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = tokio::time::sleep(d) => {}
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        stopper.cancel();
    });

    info(format!("Watching as {}, press Ctrl-C to stop", profile.username));
    engine.run(&profile, token).await?;

    let left = engine.queue.count_for_user(&profile.user_id)?;
    info(format!("Stopped, {left} entries pending"));
    Ok(())
}
