use crate::config::Config;
use crate::db::log;
use crate::errors::AppResult;

use crate::cli::parser::Cli;
use crate::db::initialize::init_db;
use crate::security::DeviceKey;
use rusqlite::Connection;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file (skipped in test mode)
///  - the device key next to the database
///  - the SQLite database and all pending migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;

    let path = Config::config_file();
    let db_path = cfg.database.clone();
    let key_path = cfg.key_path();

    println!("⚙️  Initializing rfieldclock…");
    if !cli.test {
        println!("📄 Config file : {}", path.display());
    }
    println!("🗄️  Database   : {}", &db_path);
    println!("🔑 Device key : {}", key_path.display());

    let conn = Connection::open(&db_path)?;
    init_db(&conn)?;
    DeviceKey::load_or_create(&key_path)?;

    println!("✅ Database initialized at {}", &db_path);

    if let Err(e) = log::ttlog(
        &conn,
        "init",
        "Database initialized",
        &format!("Database initialized at {}", &db_path),
    ) {
        eprintln!("⚠️ Failed to write internal log: {}", e);
    }

    println!("🎉 rfieldclock initialization completed!");
    Ok(())
}
