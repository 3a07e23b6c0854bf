use crate::db::cache::Partition;
use crate::db::pool::DbPool;
use crate::models::mutation::MutationKind;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use rusqlite::OptionalExtension;
use std::fs;

/// Storage overview for `db --info`. Reads metadata only; nothing is
/// decrypted.
pub fn print_db_info(pool: &DbPool, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) PENDING MUTATIONS
    //
    let total: i64 = pool
        .conn
        .query_row("SELECT COUNT(*) FROM encrypted_data", [], |row| row.get(0))?;
    println!(
        "{}• Pending mutations:{} {}{}{}",
        CYAN, RESET, GREEN, total, RESET
    );

    for kind in MutationKind::ALL {
        let n: i64 = pool.conn.query_row(
            "SELECT COUNT(*) FROM encrypted_data WHERE substr(type_tag, 1, length(?1)) = ?1",
            [kind.prefix()],
            |row| row.get(0),
        )?;
        println!("    {:<13} {}", kind.as_str(), n);
    }

    //
    // 3) OLDEST ENTRY
    //
    let oldest: Option<String> = pool
        .conn
        .query_row(
            "SELECT saved_at FROM encrypted_data ORDER BY saved_at ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    println!(
        "{}• Oldest entry:{} {}",
        CYAN,
        RESET,
        oldest.unwrap_or_else(|| format!("{GREY}--{RESET}"))
    );

    //
    // 4) CACHE PARTITIONS
    //
    println!("{}• Cache partitions:{}", CYAN, RESET);
    for p in Partition::ALL {
        let n: i64 = pool.conn.query_row(
            "SELECT COUNT(*) FROM cache WHERE partition = ?1",
            [p.as_str()],
            |row| row.get(0),
        )?;
        println!("    {:<17} {}", p.as_str(), n);
    }

    println!();
    Ok(())
}
