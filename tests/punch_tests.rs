use rfieldclock::core::outbox::Delivery;
use rfieldclock::core::punch::Capture;
use rfieldclock::errors::AppError;
use rfieldclock::models::geo::Coordinates;
use rfieldclock::models::mutation::MutationPayload;
use rfieldclock::models::notification::NotificationKind;
use rfieldclock::models::{Condition, Method, PunchKind};

mod common;
use common::{FakeRemote, OFFICE, PIN, USER, local, profile, punch, settled_engine};

fn at_office(method: Method) -> Capture {
    Capture {
        method,
        position: Coordinates::new(OFFICE.0, OFFICE.1),
        pin: None,
    }
}

fn with_pin(pin: &str) -> Capture {
    Capture {
        pin: Some(pin.to_string()),
        ..at_office(Method::Pin)
    }
}

#[tokio::test]
async fn test_online_punch_in_then_out() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote.clone()).await;
    let p = profile();

    let first = engine
        .punches
        .record(&p, &at_office(Method::Qr), local(2025, 10, 15, 8, 5))
        .await
        .expect("check-in");
    assert_eq!(first.event.kind, PunchKind::CheckIn);
    assert_eq!(first.event.condition, Condition::OnTime);
    assert_eq!(first.delivery, Delivery::Submitted);

    let second = engine
        .punches
        .record(&p, &at_office(Method::Qr), local(2025, 10, 15, 15, 30))
        .await
        .expect("check-out");
    assert_eq!(second.event.kind, PunchKind::CheckOut);
    assert_eq!(second.event.condition, Condition::Incomplete);

    let third = engine
        .punches
        .record(&p, &at_office(Method::Qr), local(2025, 10, 15, 16, 0))
        .await;
    assert!(matches!(third, Err(AppError::Validation(_))));

    assert_eq!(remote.submitted_attendance().len(), 2);
    let notes = remote.notifications.lock().expect("lock").clone();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.kind == NotificationKind::Success));
}

#[tokio::test]
async fn test_offline_punch_is_queued_and_counts_for_kind() {
    let remote = FakeRemote::offline();
    let engine = settled_engine(remote.clone()).await;
    let p = profile();

    let first = engine
        .punches
        .record(&p, &at_office(Method::Face), local(2025, 10, 15, 8, 30))
        .await
        .expect("check-in");
    assert!(first.delivery.is_queued());
    assert_eq!(first.event.condition, Condition::Late);

    let second = engine
        .punches
        .record(&p, &at_office(Method::Face), local(2025, 10, 15, 16, 10))
        .await
        .expect("check-out");
    assert_eq!(second.event.kind, PunchKind::CheckOut);

    // two punches plus two alert notices
    assert_eq!(engine.queue.count_for_user(USER).expect("count"), 4);
    let cached = engine.notifications.cached(USER).expect("cached");
    assert!(cached.iter().all(|n| n.kind == NotificationKind::Alert));
}

#[tokio::test]
async fn test_punch_validation() {
    let engine = settled_engine(FakeRemote::online()).await;
    let p = profile();

    // Saturday
    let weekend = engine
        .punches
        .record(&p, &at_office(Method::Qr), local(2025, 10, 18, 9, 0))
        .await;
    assert!(matches!(weekend, Err(AppError::Validation(_))));

    // before the capture window
    let early = engine
        .punches
        .record(&p, &at_office(Method::Qr), local(2025, 10, 15, 7, 0))
        .await;
    assert!(matches!(early, Err(AppError::Validation(_))));

    // roughly 1.1 km north of the office
    let far = Capture {
        position: Coordinates::new(OFFICE.0 + 0.01, OFFICE.1),
        ..at_office(Method::Qr)
    };
    let away = engine.punches.record(&p, &far, local(2025, 10, 15, 9, 0)).await;
    assert!(matches!(away, Err(AppError::Validation(_))));

    let mut no_schedule = profile();
    no_schedule.schedule = None;
    let missing = engine
        .punches
        .record(&no_schedule, &at_office(Method::Qr), local(2025, 10, 15, 9, 0))
        .await;
    assert!(matches!(missing, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_pin_checks() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote.clone()).await;
    let p = profile();
    let now = local(2025, 10, 15, 8, 0);

    let short = engine.punches.record(&p, &with_pin("12"), now).await;
    assert!(matches!(short, Err(AppError::Validation(_))));
    let wrong = engine.punches.record(&p, &with_pin("4321"), now).await;
    assert!(matches!(wrong, Err(AppError::Validation(_))));

    // two complete PIN days already this month
    {
        let mut sent = remote.attendance.lock().expect("lock");
        for day in [13, 14] {
            for (kind, h) in [(PunchKind::CheckIn, 8), (PunchKind::CheckOut, 16)] {
                let mut e = punch(kind, Condition::OnTime, local(2025, 10, day, h, 0));
                e.method = Method::Pin;
                sent.push(e);
            }
        }
    }
    let limited = engine.punches.record(&p, &with_pin(PIN), now).await;
    assert!(matches!(limited, Err(AppError::Validation(_))));

    // QR is unaffected by the PIN limit
    assert!(engine.punches.record(&p, &at_office(Method::Qr), now).await.is_ok());
}

#[tokio::test]
async fn test_pin_limit_resets_each_month() {
    let remote = FakeRemote::online();
    let engine = settled_engine(remote.clone()).await;
    {
        let mut sent = remote.attendance.lock().expect("lock");
        for day in [29, 30] {
            for (kind, h) in [(PunchKind::CheckIn, 8), (PunchKind::CheckOut, 16)] {
                let mut e = punch(kind, Condition::OnTime, local(2025, 9, day, h, 0));
                e.method = Method::Pin;
                sent.push(e);
            }
        }
    }

    let ok = engine
        .punches
        .record(&profile(), &with_pin(PIN), local(2025, 10, 1, 8, 0))
        .await
        .expect("new month");
    assert_eq!(ok.event.method, Method::Pin);
}

#[tokio::test]
async fn test_expired_queue_locks_punches() {
    let remote = FakeRemote::offline();
    let engine = settled_engine(remote).await;
    let now = local(2025, 10, 15, 9, 0);

    engine
        .queue
        .enqueue(
            &MutationPayload::Attendance(punch(
                PunchKind::CheckIn,
                Condition::OnTime,
                local(2025, 10, 13, 8, 0),
            )),
            now - chrono::Duration::hours(25),
        )
        .expect("enqueue");

    let locked = engine
        .punches
        .record(&profile(), &at_office(Method::Qr), now)
        .await;
    assert!(matches!(locked, Err(AppError::Locked(_))));
}
