use super::{instant, online_engine, profile};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::incident::IncidentDraft;
use crate::core::outbox::Delivery;
use crate::errors::{AppError, AppResult};
use crate::models::incident::Attachment;
use crate::ui::messages::{info, queued, success};
use crate::utils::date::parse_date;
use crate::utils::formatting::colorize_condition;
use crate::utils::table::{Column, Table};
use std::fs;
use std::path::Path;

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

fn read_attachment(p: &str) -> AppResult<Attachment> {
    let path = Path::new(p);
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| p.to_string());
    Ok(Attachment {
        name,
        mime: mime_for(path).to_string(),
        bytes,
    })
}

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Incident {
        kind,
        description,
        date,
        attach,
        list,
        eligible,
        at,
    } = &cli.command
    {
        let engine = online_engine(cfg).await?;
        let profile = profile(&engine, cli)?;

        if *eligible {
            let dates = engine.incidents.eligible_dates(&profile.user_id).await?;
            if dates.is_empty() {
                info("No eligible dates known");
            }
            for d in dates {
                println!("{}  {}", d.date, colorize_condition(d.final_status));
            }
            return Ok(());
        }

        if *list {
            let incidents = engine.incidents.refresh(&profile.user_id).await?;
            if incidents.is_empty() {
                info("No incidents");
                return Ok(());
            }
            let mut table = Table::new(vec![
                Column::new("DATE"),
                Column::new("TYPE"),
                Column::new("STATUS"),
                Column::new("DESCRIPTION"),
            ]);
            for i in incidents {
                table.add_row(vec![
                    i.incident_date.to_string(),
                    i.kind,
                    i.status,
                    i.description,
                ]);
            }
            print!("{}", table.render());
            return Ok(());
        }

        let date_str = date.clone().unwrap_or_default();
        let incident_date = parse_date(&date_str).ok_or(AppError::InvalidDate(date_str))?;
        let attachments = attach
            .iter()
            .map(|p| read_attachment(p))
            .collect::<AppResult<Vec<_>>>()?;

        let draft = IncidentDraft {
            kind: kind.clone().unwrap_or_default(),
            description: description.clone().unwrap_or_default(),
            incident_date,
            attachments,
        };

        match engine.incidents.record(&profile, draft, instant(at)?).await? {
            Delivery::Submitted => success(format!("Incident for {} submitted", incident_date)),
            Delivery::Queued(id) => queued(format!(
                "Incident for {} stored offline; queued as {}",
                incident_date, id
            )),
        }
    }
    Ok(())
}
