use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::engine::Engine;
use crate::errors::AppResult;
use crate::models::mutation::{MutationKind, MutationPayload};
use crate::ui::messages::info;
use crate::utils::table::{Column, Table};

fn summarize(payload: &MutationPayload) -> String {
    match payload {
        MutationPayload::Attendance(e) => format!(
            "{} via {} ({})",
            e.kind.label(),
            e.method.as_str(),
            e.timestamp.to_rfc3339()
        ),
        MutationPayload::Incident(i) => format!("{} for {}", i.kind, i.incident_date),
        MutationPayload::Notification(n) => n.title.clone(),
    }
}

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Queue { all } = &cli.command else {
        return Ok(());
    };
    let engine = Engine::open(cfg)?;

    let mut table;
    if *all {
        table = Table::new(vec![
            Column::new("ID"),
            Column::new("TYPE"),
            Column::new("SAVED AT"),
        ]);
        for kind in MutationKind::ALL {
            for r in engine.store.records_with_prefix(&kind.prefix())? {
                table.add_row(vec![r.id, r.type_tag, r.saved_at.to_rfc3339()]);
            }
        }
    } else {
        let profile = engine.session.profile(cli.user.as_deref())?;
        table = Table::new(vec![
            Column::new("ID"),
            Column::new("KIND"),
            Column::new("SAVED AT"),
            Column::new("CONTENT"),
        ]);
        for m in engine.queue.drain_for_user(&profile.user_id)? {
            let content = match m.decode() {
                Some(Ok(p)) => summarize(&p),
                _ => "(unreadable)".to_string(),
            };
            let kind = m.kind().map(|k| k.to_string()).unwrap_or(m.type_tag.clone());
            table.add_row(vec![m.id, kind, m.saved_at.to_rfc3339(), content]);
        }
    }

    if table.is_empty() {
        info("Queue is empty");
    } else {
        print!("{}", table.render());
    }
    Ok(())
}
