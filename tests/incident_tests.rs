use rfieldclock::core::incident::IncidentDraft;
use rfieldclock::core::outbox::Delivery;
use rfieldclock::db::cache::Partition;
use rfieldclock::errors::AppError;
use rfieldclock::models::Condition;
use rfieldclock::models::incident::{Attachment, EligibleDate};

mod common;
use common::{FakeRemote, USER, date, local, profile, settled_engine};

fn draft(day: u32) -> IncidentDraft {
    IncidentDraft {
        kind: "medical".into(),
        description: "clinic appointment".into(),
        incident_date: date(2025, 10, day),
        attachments: vec![Attachment {
            name: "note.pdf".into(),
            mime: "application/pdf".into(),
            bytes: vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff],
        }],
    }
}

fn eligible(days: &[u32]) -> Vec<EligibleDate> {
    days.iter()
        .map(|d| EligibleDate {
            date: date(2025, 10, *d),
            final_status: Some(Condition::Absent),
        })
        .collect()
}

#[tokio::test]
async fn test_online_incident_is_submitted_with_attachments() {
    let remote = FakeRemote::online();
    *remote.eligible.lock().expect("lock") = eligible(&[13, 14]);
    let engine = settled_engine(remote.clone()).await;

    let delivery = engine
        .incidents
        .record(&profile(), draft(14), local(2025, 10, 15, 9, 0))
        .await
        .expect("record");
    assert_eq!(delivery, Delivery::Submitted);

    let sent = remote.incidents.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachments[0].bytes, draft(14).attachments[0].bytes);

    let listed = engine.incidents.refresh(USER).await.expect("list");
    assert_eq!(listed[0].incident_date, date(2025, 10, 14));
}

#[tokio::test]
async fn test_incident_validation() {
    let remote = FakeRemote::online();
    *remote.eligible.lock().expect("lock") = eligible(&[13]);
    let engine = settled_engine(remote).await;
    let now = local(2025, 10, 15, 9, 0);

    let mut blank = draft(13);
    blank.description = "  ".into();
    let err = engine.incidents.record(&profile(), blank, now).await;
    assert!(matches!(err, Err(AppError::Validation(_))));

    let err = engine.incidents.record(&profile(), draft(14), now).await;
    assert!(matches!(err, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_offline_incident_queues_and_replays_intact() {
    let remote = FakeRemote::online();
    *remote.eligible.lock().expect("lock") = eligible(&[13, 14]);
    let engine = settled_engine(remote.clone()).await;

    // prime the eligible-date cache, then lose the server
    engine.incidents.eligible_dates(USER).await.expect("dates");
    remote.set_offline(true);
    engine.monitor.device_offline();

    let delivery = engine
        .incidents
        .record(&profile(), draft(13), local(2025, 10, 15, 9, 0))
        .await
        .expect("record");
    assert!(delivery.is_queued());

    let left: Vec<EligibleDate> = engine
        .cache
        .load_for_user(Partition::EligibleDates, USER)
        .expect("cache");
    assert_eq!(left, eligible(&[14]));

    remote.set_offline(false);
    engine.monitor.device_online().await;
    let synced = engine.dispatcher.run_once(USER).await.expect("sync");
    assert!(synced >= 1);

    let sent = remote.incidents.lock().expect("lock").clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].attachments[0].name, "note.pdf");
    assert_eq!(sent[0].attachments[0].bytes, draft(13).attachments[0].bytes);
}
