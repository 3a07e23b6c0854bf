use super::{instant, online_engine};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::mutation::MutationKind;
use crate::sync::Reachability;
use crate::ui::messages::{detail, header, info, warning};
use crate::utils::colors::{RESET, color_for_reachable};
use crate::utils::time::format_minutes;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Status { at } = &cli.command else {
        return Ok(());
    };
    let now = instant(at)?;
    let engine = online_engine(cfg).await?;

    header("Status");
    let reachable = engine.monitor.state().status == Reachability::Reachable;
    detail(
        "Server",
        format!(
            "{}{}{} ({})",
            color_for_reachable(reachable),
            if reachable { "reachable" } else { "unreachable" },
            RESET,
            cfg.remote_url
        ),
    );

    let profile = match engine.session.profile(cli.user.as_deref()) {
        Ok(p) => p,
        Err(AppError::UnknownUser(_)) => {
            let total: usize = MutationKind::ALL
                .iter()
                .map(|k| engine.store.records_with_prefix(&k.prefix()).map(|r| r.len()))
                .sum::<AppResult<usize>>()?;
            detail("Pending (all users)", total);
            info("No user logged in");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    detail("User", format!("{} ({})", profile.full_name, profile.username));

    for kind in MutationKind::ALL {
        let n = engine.queue.pending_of_kind(&profile.user_id, kind)?.len();
        detail(format!("Pending {kind}"), n);
    }

    let exp = engine.guard.status(&profile.user_id, now)?;
    match (exp.oldest, exp.remaining) {
        (Some(oldest), Some(remaining)) => {
            detail("Oldest pending", oldest.with_timezone(&engine.policy.offset).format("%F %R"));
            if exp.expired {
                warning("Offline data expired: punches and incidents are locked until a sync");
            } else {
                detail("Locks in", format_minutes(remaining.num_minutes()));
            }
        }
        _ => detail("Offline expiration", "nothing pending"),
    }

    detail(
        "Unread notifications",
        engine.notifications.unread_count(&profile.user_id)?,
    );
    Ok(())
}
