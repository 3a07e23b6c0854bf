use super::{instant, online_engine, profile};
use crate::cli::parser::{CaptureMethod, Cli, Commands};
use crate::config::Config;
use crate::core::outbox::Delivery;
use crate::core::punch::Capture;
use crate::db::log::ttlog_quiet;
use crate::errors::AppResult;
use crate::models::Method;
use crate::models::geo::Coordinates;
use crate::ui::messages::{detail, queued, success};
use crate::utils::formatting::colorize_condition;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Punch {
        method,
        lat,
        lon,
        pin,
        at,
    } = &cli.command
    {
        let now = instant(at)?;
        let engine = online_engine(cfg).await?;
        let profile = profile(&engine, cli)?;

        let capture = Capture {
            method: match method {
                CaptureMethod::Pin => Method::Pin,
                CaptureMethod::Qr => Method::Qr,
                CaptureMethod::Face => Method::Face,
            },
            position: Coordinates::new(*lat, *lon),
            pin: pin.clone(),
        };

        let outcome = engine.punches.record(&profile, &capture, now).await?;
        let ev = &outcome.event;
        let local = ev.timestamp.with_timezone(&engine.policy.offset);

        engine.store.db().with(|conn| {
            ttlog_quiet(
                conn,
                "punch",
                ev.kind.as_str(),
                &format!("{} {} via {}", profile.user_id, local.format("%F %R"), ev.method.as_str()),
            );
            Ok(())
        })?;

        match &outcome.delivery {
            Delivery::Submitted => success(format!(
                "{} registered at {} ({})",
                ev.kind.label(),
                local.format("%F %R"),
                colorize_condition(Some(ev.condition))
            )),
            Delivery::Queued(id) => queued(format!(
                "{} stored offline at {} ({}); queued as {}",
                ev.kind.label(),
                local.format("%F %R"),
                colorize_condition(Some(ev.condition)),
                id
            )),
        }
        detail("Distance to office", format!("{:.0} m", outcome.distance_meters));
    }
    Ok(())
}
