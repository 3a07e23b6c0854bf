//! rfieldclock library root.
//! Local-first sync engine for field attendance: encrypted store, pending
//! queue, reachability, replay, reconciliation and the CLI on top.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod remote;
pub mod security;
pub mod sync;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub async fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Login { .. } | Commands::Logout => cli::commands::login::handle(cli, cfg).await,
        Commands::Punch { .. } => cli::commands::punch::handle(cli, cfg).await,
        Commands::Incident { .. } => cli::commands::incident::handle(cli, cfg).await,
        Commands::History { .. } => cli::commands::history::handle(cli, cfg).await,
        Commands::Sync => cli::commands::sync::handle(cli, cfg).await,
        Commands::Status { .. } => cli::commands::status::handle(cli, cfg).await,
        Commands::Queue { .. } => cli::commands::queue::handle(cli, cfg),
        Commands::Notifications { .. } => cli::commands::notifications::handle(cli, cfg).await,
        Commands::Backfill { .. } => cli::commands::backfill::handle(cli, cfg).await,
        Commands::Watch { .. } => cli::commands::watch::handle(cli, cfg).await,
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
        cfg.key_file = std::path::Path::new(custom_db)
            .with_extension("key")
            .to_string_lossy()
            .to_string();
    }
    if let Some(remote) = &cli.remote {
        cfg.remote_url = remote.clone();
    }

    dispatch(&cli, &cfg).await
}
