use super::{online_engine, profile};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::errors::AppResult;
use crate::models::notification::NotificationKind;
use crate::ui::messages::{info, success};
use crate::utils::colors::{GREEN, GREY, RED, RESET, YELLOW};

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Notifications {
        read,
        read_all,
        hide,
        unread,
    } = &cli.command
    else {
        return Ok(());
    };

    let engine = online_engine(cfg).await?;
    let profile = profile(&engine, cli)?;
    let user = &profile.user_id;
    let center = &engine.notifications;

    if let Some(id) = read {
        center.mark_read(user, id).await?;
        success(format!("Notification {id} marked as read"));
        return Ok(());
    }
    if *read_all {
        let n = center.mark_all_read(user).await?;
        success(format!("{n} notifications marked as read"));
        return Ok(());
    }
    if let Some(id) = hide {
        center.hide(user, id)?;
        success(format!("Notification {id} hidden"));
        return Ok(());
    }
    if *unread {
        println!("{}", center.unread_count(user)?);
        return Ok(());
    }

    let list = center.fetch(user).await?;
    if list.is_empty() {
        info("No notifications");
        return Ok(());
    }

    for n in list {
        let color = match n.kind {
            NotificationKind::Success => GREEN,
            NotificationKind::Alert => YELLOW,
            NotificationKind::Error => RED,
            NotificationKind::General => RESET,
        };
        let marker = if n.read { " " } else { "●" };
        println!(
            "{marker} {GREY}{}{RESET}  {color}{}{RESET}  {}",
            n.created_at
                .with_timezone(&engine.policy.offset)
                .format("%F %R"),
            n.title,
            n.message
        );
        println!("  {GREY}{}{RESET}", n.id);
    }
    Ok(())
}
