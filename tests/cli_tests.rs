use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

mod common;
use common::{init_test_db, rfc, setup_test_db};

/// Nothing listens on the discard port, so every probe fails fast.
const DEAD_REMOTE: &str = "http://127.0.0.1:9/api";

#[test]
fn test_init_creates_database_and_key() {
    let db_path = setup_test_db("cli_init");

    rfc()
        .args(["--db", &db_path, "--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database").and(contains("Device key")));

    assert!(std::path::Path::new(&db_path).exists());
    assert!(std::path::Path::new(&db_path).with_extension("key").exists());
}

#[test]
fn test_log_print_after_init() {
    let db_path = setup_test_db("cli_log");
    init_test_db(&db_path);

    rfc()
        .args(["--db", &db_path, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("init"));
}

#[test]
fn test_db_info_and_check() {
    let db_path = setup_test_db("cli_db_info");
    init_test_db(&db_path);

    rfc()
        .args(["--db", &db_path, "db", "--info"])
        .assert()
        .success()
        .stdout(contains("Pending mutations").and(contains("eligible_dates")));

    rfc()
        .args(["--db", &db_path, "db", "--check"])
        .assert()
        .success();
}

#[test]
fn test_status_offline_without_user() {
    let db_path = setup_test_db("cli_status");
    init_test_db(&db_path);

    rfc()
        .args(["--db", &db_path, "--remote", DEAD_REMOTE, "status"])
        .assert()
        .success()
        .stdout(contains("unreachable").and(contains("No user logged in")));
}

#[test]
fn test_queue_all_is_empty_after_init() {
    let db_path = setup_test_db("cli_queue");
    init_test_db(&db_path);

    rfc()
        .args(["--db", &db_path, "queue", "--all"])
        .assert()
        .success()
        .stdout(contains("Queue is empty"));
}

#[test]
fn test_offline_login_needs_cached_credentials() {
    let db_path = setup_test_db("cli_login");
    init_test_db(&db_path);

    rfc()
        .args(["--db", &db_path, "--remote", DEAD_REMOTE, "login", "ana"])
        .env("RFIELDCLOCK_PASSWORD", "pw")
        .assert()
        .failure()
        .stderr(contains("no cached credentials"));
}

#[test]
fn test_punch_requires_a_session() {
    let db_path = setup_test_db("cli_punch");
    init_test_db(&db_path);

    rfc()
        .args([
            "--db",
            &db_path,
            "--remote",
            DEAD_REMOTE,
            "punch",
            "--lat",
            "19.43",
            "--lon",
            "-99.13",
        ])
        .assert()
        .failure()
        .stderr(contains("Unknown user"));
}

#[test]
fn test_incident_requires_fields() {
    let db_path = setup_test_db("cli_incident");

    rfc()
        .args(["--db", &db_path, "incident", "--type", "medical"])
        .assert()
        .failure()
        .stderr(contains("--description"));
}
