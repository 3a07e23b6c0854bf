use super::{online_engine, profile};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::history::Source;
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use crate::utils::colors::colorize_optional;
use crate::utils::date::in_period;
use crate::utils::formatting::{bold, colorize_condition, percentage};
use crate::utils::table::{Column, Table};
use crate::utils::time::format_minutes;

pub async fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::History { period } = &cli.command {
        let engine = online_engine(cfg).await?;
        let profile = profile(&engine, cli)?;

        let report = engine.history.report(&profile).await?;
        if report.source == Source::Cache {
            warning("Showing cached attendance");
        }
        if report.queued > 0 {
            info(format!("{} punches waiting to sync are included", report.queued));
        }

        let records: Vec<_> = report
            .records
            .iter()
            .filter(|r| period.as_deref().is_none_or(|p| in_period(r.date, p)))
            .collect();

        if records.is_empty() {
            info("No attendance recorded");
            return Ok(());
        }

        let mut table = Table::new(vec![
            Column::new("DATE"),
            Column::new("IN"),
            Column::new("OUT"),
            Column::new("WORKED"),
            Column::new("ENTRY"),
            Column::new("EXIT"),
            Column::new("STATUS"),
        ]);

        for r in &records {
            let check_in = r.check_in_time.map(|t| t.format("%H:%M").to_string());
            let check_out = r.check_out_time.map(|t| t.format("%H:%M").to_string());
            let worked = r.worked_minutes.map(format_minutes);
            table.add_row(vec![
                r.date.to_string(),
                colorize_optional(check_in.as_deref()),
                colorize_optional(check_out.as_deref()),
                colorize_optional(worked.as_deref()),
                colorize_condition(r.entry_condition),
                colorize_condition(r.exit_condition),
                colorize_condition(Some(r.final_status)),
            ]);
        }

        println!("{}\n", bold(&format!("Attendance of {}", profile.full_name)));
        print!("{}", table.render());

        let s = &report.stats;
        println!();
        println!(
            "On time: {}  Late: {}  Incomplete: {}  Absent: {}  Punctuality: {}",
            s.on_time,
            s.late,
            s.incomplete,
            s.absent,
            percentage(s.percentage)
        );
    }
    Ok(())
}
