use rfieldclock::db::cache::{Partition, PartitionCache};
use rfieldclock::db::secure_store::SecureLocalStore;
use rfieldclock::errors::AppError;
use rfieldclock::security::{DeviceKey, RecordCipher};
use serde_json::{Value, json};

mod common;
use common::{USER, local, memory_store};

#[test]
fn test_put_get_and_upsert() {
    let store = memory_store();
    let at = local(2025, 10, 15, 8, 0);

    store
        .put("r1", "attendance-pending-r1", &json!({ "user_id": USER, "n": 1 }), at)
        .expect("put");
    store
        .put("r1", "attendance-pending-r1", &json!({ "user_id": USER, "n": 2 }), at)
        .expect("upsert");

    let v: Value = store.get("r1").expect("get").expect("present");
    assert_eq!(v["n"], 2);
    assert!(store.get::<Value>("missing").expect("get").is_none());

    assert!(store.delete("r1").expect("delete"));
    assert!(!store.delete("r1").expect("delete again"));
}

#[test]
fn test_ciphertext_does_not_contain_plaintext() {
    let store = memory_store();
    store
        .put("r1", "attendance-pending-r1", &json!({ "user_id": "visible-marker" }), local(2025, 10, 15, 8, 0))
        .expect("put");

    let raw = store.raw_record("r1").expect("read").expect("present");
    let haystack = String::from_utf8_lossy(&raw.ciphertext);
    assert!(!haystack.contains("visible-marker"));
}

#[test]
fn test_tampered_record_is_skipped_but_kept() {
    let store = memory_store();
    let at = local(2025, 10, 15, 8, 0);
    store
        .put("good", "attendance-pending-good", &json!({ "user_id": USER }), at)
        .expect("put");
    store
        .put("bad", "attendance-pending-bad", &json!({ "user_id": USER }), at)
        .expect("put");

    store
        .db()
        .with(|conn| {
            let mut bytes: Vec<u8> = conn.query_row(
                "SELECT ciphertext FROM encrypted_data WHERE id = 'bad'",
                [],
                |r| r.get(0),
            )?;
            bytes[14] ^= 0xff;
            conn.execute(
                "UPDATE encrypted_data SET ciphertext = ?1 WHERE id = 'bad'",
                [bytes],
            )?;
            Ok(())
        })
        .expect("tamper");

    let listed = store
        .list_by_user_and_prefix::<Value>(USER, "attendance-pending-")
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "good");

    assert!(store.get::<Value>("bad").expect("get").is_none());
    assert!(store.raw_record("bad").expect("read").is_some());

    let raw = store.raw_record("bad").expect("read").expect("present");
    let err = store
        .cipher()
        .open(&raw.id, &raw.ciphertext, &raw.integrity_tag)
        .expect_err("tampered");
    assert!(matches!(err, AppError::Integrity(id) if id == "bad"));
}

#[test]
fn test_records_sealed_with_another_key_are_unreadable() {
    let store = memory_store();
    store
        .put("r1", "attendance-pending-r1", &json!({ "user_id": USER }), local(2025, 10, 15, 8, 0))
        .expect("put");

    let other = SecureLocalStore::new(store.db().clone(), &DeviceKey::generate());
    assert!(other.get::<Value>("r1").expect("get").is_none());
    assert!(
        other
            .list_by_user_and_prefix::<Value>(USER, "")
            .expect("list")
            .is_empty()
    );
}

#[test]
fn test_listing_filters_by_user_and_prefix() {
    let store = memory_store();
    let at = local(2025, 10, 15, 8, 0);
    store
        .put("a", "attendance-pending-a", &json!({ "user_id": USER }), at)
        .expect("put");
    store
        .put("b", "attendance-pending-b", &json!({ "user_id": "u-200" }), at)
        .expect("put");
    store
        .put("c", "incident-pending-c", &json!({ "user_id": USER }), at)
        .expect("put");

    let mine = store
        .list_by_user_and_prefix::<Value>(USER, "attendance-pending-")
        .expect("list");
    assert_eq!(mine.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a"]);

    let everything = store.list_by_user_and_prefix::<Value>(USER, "").expect("list");
    assert_eq!(everything.len(), 2);
}

#[test]
fn test_cache_refresh_replaces_only_that_user() {
    let store = memory_store();
    let cache = PartitionCache::new(&store);

    cache
        .replace_for_user(Partition::Incidents, USER, &["x".to_string(), "y".to_string()], |s| s.clone())
        .expect("fill");
    cache
        .replace_for_user(Partition::Incidents, "u-200", &["z".to_string()], |s| s.clone())
        .expect("fill");
    cache
        .replace_for_user(Partition::Incidents, USER, &["w".to_string()], |s| s.clone())
        .expect("refresh");

    let mine: Vec<String> = cache.load_for_user(Partition::Incidents, USER).expect("load");
    let theirs: Vec<String> = cache.load_for_user(Partition::Incidents, "u-200").expect("load");
    assert_eq!(mine, vec!["w".to_string()]);
    assert_eq!(theirs, vec!["z".to_string()]);

    // partitions are independent
    let dates: Vec<String> = cache.load_for_user(Partition::EligibleDates, USER).expect("load");
    assert!(dates.is_empty());
}

#[test]
fn test_cipher_digests() {
    let cipher = RecordCipher::new(&DeviceKey::generate());
    let digest = cipher.credential_digest("ana", "pw");
    assert!(cipher.verify_credential("ana", "pw", &digest));
    assert!(!cipher.verify_credential("ana", "PW", &digest));
    assert!(!cipher.verify_credential("bob", "pw", &digest));

    assert_eq!(
        rfieldclock::security::cipher::pin_digest("1234"),
        "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
    );
}

#[test]
fn test_row_with_bad_timestamp_is_skipped_not_fatal() {
    let store = memory_store();
    let at = local(2025, 10, 15, 8, 0);
    for id in ["good", "bad"] {
        store
            .put(id, &format!("attendance-pending-{id}"), &json!({ "user_id": USER }), at)
            .expect("put");
    }
    store
        .db()
        .with(|conn| {
            conn.execute("UPDATE encrypted_data SET saved_at = 'garbage' WHERE id = 'bad'", [])?;
            Ok(())
        })
        .expect("corrupt");

    let listed = store
        .list_by_user_and_prefix::<Value>(USER, "attendance-pending-")
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "good");
    assert_eq!(store.records_with_prefix("").expect("raw list").len(), 1);
    assert!(store.get::<Value>("bad").expect("get").is_none());
}
