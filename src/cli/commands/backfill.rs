use super::{instant, online_engine, profile};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use crate::utils::date::local_date;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Backfill { at } = &cli.command else {
        return Ok(());
    };
    let now = instant(at)?;
    let engine = online_engine(cfg).await?;
    let profile = profile(&engine, cli)?;

    let absences = engine.bootstrap(&profile.user_id, now).await?;
    if absences.is_empty() {
        info("No missing days");
        return Ok(());
    }

    warning(format!("{} absence punches recorded", absences.len()));
    for a in absences {
        println!(
            "  {}  {}",
            local_date(&a.timestamp, &engine.policy.offset),
            a.kind.label()
        );
    }
    Ok(())
}
