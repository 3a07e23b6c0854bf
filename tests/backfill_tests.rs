use chrono::{TimeZone, Timelike, Utc};
use rfieldclock::core::backfill::{in_capture_window, plan};
use rfieldclock::core::punch::Capture;
use rfieldclock::models::mutation::MutationPayload;
use rfieldclock::models::geo::Coordinates;
use rfieldclock::models::{Condition, Method, PunchKind};
use rfieldclock::utils::date::local_date;

mod common;
use common::{FakeRemote, OFFICE, USER, date, local, policy, profile, punch, settled_engine};

#[test]
fn test_capture_window_bounds() {
    let p = policy();
    assert!(!in_capture_window(local(2025, 10, 15, 7, 49), &p));
    assert!(in_capture_window(local(2025, 10, 15, 7, 50), &p));
    assert!(in_capture_window(local(2025, 10, 15, 16, 40), &p));
    assert!(!in_capture_window(local(2025, 10, 15, 16, 41), &p));
}

#[test]
fn test_plan_fills_missing_past_days() {
    let known = vec![punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 13, 8, 0))];
    let absences = plan(USER, &known, local(2025, 10, 15, 17, 0), &policy());

    let days: Vec<_> = absences
        .iter()
        .map(|e| (local_date(&e.timestamp, &policy().offset), e.kind))
        .collect();
    assert_eq!(
        days,
        vec![
            (date(2025, 10, 13), PunchKind::CheckOut),
            (date(2025, 10, 14), PunchKind::CheckIn),
            (date(2025, 10, 14), PunchKind::CheckOut),
            (date(2025, 10, 15), PunchKind::CheckIn),
            (date(2025, 10, 15), PunchKind::CheckOut),
        ]
    );
    for e in &absences {
        assert_eq!(e.method, Method::None);
        assert_eq!(e.condition, Condition::Absent);
        assert_eq!(e.timestamp.hour(), 6);
        assert_eq!(e.user_id, USER);
    }
}

#[test]
fn test_plan_leaves_today_alone_before_window_opens() {
    let known = vec![punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 13, 8, 0))];
    let absences = plan(USER, &known, local(2025, 10, 15, 7, 0), &policy());

    assert_eq!(absences.len(), 3);
    assert!(
        absences
            .iter()
            .all(|e| local_date(&e.timestamp, &policy().offset) != date(2025, 10, 15))
    );
}

#[test]
fn test_plan_skips_today_inside_window() {
    let known = vec![punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 13, 8, 0))];
    let absences = plan(USER, &known, local(2025, 10, 15, 9, 0), &policy());
    assert_eq!(absences.len(), 3);
}

#[test]
fn test_plan_skips_weekends_and_complete_days() {
    let known = vec![
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 16, 8, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 16, 16, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 17, 16, 0)),
    ];
    // Monday evening, after the window closed
    let absences = plan(USER, &known, local(2025, 10, 20, 17, 0), &policy());

    assert_eq!(absences.len(), 3);
    assert_eq!(absences[0].kind, PunchKind::CheckIn);
    assert!(
        absences
            .iter()
            .all(|e| e.timestamp.date_naive() != date(2025, 10, 18)
                && e.timestamp.date_naive() != date(2025, 10, 19))
    );
}

#[test]
fn test_plan_without_history_is_empty() {
    assert!(plan(USER, &[], local(2025, 10, 15, 7, 0), &policy()).is_empty());
}

#[tokio::test]
async fn test_backfill_runs_once_per_session() {
    let remote = FakeRemote::online();
    remote
        .attendance
        .lock()
        .expect("lock")
        .push(punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 14, 8, 0)));
    let engine = settled_engine(remote.clone()).await;

    let first = engine
        .bootstrap(USER, local(2025, 10, 15, 17, 0))
        .await
        .expect("backfill");
    assert_eq!(first.len(), 3);
    assert_eq!(remote.submitted_attendance().len(), 4);

    let second = engine
        .bootstrap(USER, local(2025, 10, 15, 17, 0))
        .await
        .expect("backfill");
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_backfill_offline_queues_absences() {
    let remote = FakeRemote::offline();
    let engine = settled_engine(remote.clone()).await;

    engine
        .queue
        .enqueue(
            &MutationPayload::Attendance(punch(
                PunchKind::CheckIn,
                Condition::OnTime,
                local(2025, 10, 14, 8, 0),
            )),
            local(2025, 10, 14, 8, 0),
        )
        .expect("enqueue");

    let absences = engine
        .bootstrap(USER, local(2025, 10, 14, 18, 0))
        .await
        .expect("backfill");

    assert_eq!(absences.len(), 1);
    assert_eq!(absences[0].kind, PunchKind::CheckOut);
    assert_eq!(engine.queue.count_for_user(USER).expect("count"), 2);
    assert!(remote.submitted_attendance().is_empty());
}

#[tokio::test]
async fn test_morning_backfill_does_not_block_todays_punch() {
    let remote = FakeRemote::online();
    remote
        .attendance
        .lock()
        .expect("lock")
        .push(punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 14, 8, 0)));
    let engine = settled_engine(remote.clone()).await;

    let absences = engine
        .bootstrap(USER, local(2025, 10, 15, 7, 0))
        .await
        .expect("backfill");
    assert_eq!(absences.len(), 1);

    let capture = Capture {
        method: Method::Qr,
        position: Coordinates::new(OFFICE.0, OFFICE.1),
        pin: None,
    };
    let outcome = engine
        .punches
        .record(&profile(), &capture, local(2025, 10, 15, 7, 55))
        .await
        .expect("punch after morning backfill");
    assert_eq!(outcome.event.kind, PunchKind::CheckIn);
}

#[tokio::test]
async fn test_missing_check_out_reconciles_as_incomplete() {
    let remote = FakeRemote::online();
    remote
        .attendance
        .lock()
        .expect("lock")
        .push(punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 14, 7, 55)));
    let engine = settled_engine(remote.clone()).await;

    let absences = engine
        .bootstrap(USER, local(2025, 10, 14, 17, 0))
        .await
        .expect("backfill");
    assert_eq!(absences.len(), 1);
    assert_eq!(absences[0].kind, PunchKind::CheckOut);
    assert_eq!(absences[0].timestamp, Utc.with_ymd_and_hms(2025, 10, 14, 6, 0, 0).single().expect("valid instant"));

    let report = engine.history.report(&profile()).await.expect("history");
    let day = report
        .records
        .iter()
        .find(|r| r.date == date(2025, 10, 14))
        .expect("day present");
    assert_eq!(day.final_status, Condition::Incomplete);
}

#[tokio::test]
async fn test_day_without_punches_reconciles_as_absent() {
    let remote = FakeRemote::offline();
    let engine = settled_engine(remote.clone()).await;
    engine
        .queue
        .enqueue(
            &MutationPayload::Attendance(punch(
                PunchKind::CheckIn,
                Condition::OnTime,
                local(2025, 10, 13, 7, 55),
            )),
            local(2025, 10, 13, 7, 55),
        )
        .expect("enqueue");
    engine
        .queue
        .enqueue(
            &MutationPayload::Attendance(punch(
                PunchKind::CheckOut,
                Condition::OnTime,
                local(2025, 10, 13, 16, 0),
            )),
            local(2025, 10, 13, 16, 0),
        )
        .expect("enqueue");

    let absences = engine
        .bootstrap(USER, local(2025, 10, 14, 17, 0))
        .await
        .expect("backfill");
    assert_eq!(absences.len(), 2);

    let report = engine.history.report(&profile()).await.expect("history");
    let day = report
        .records
        .iter()
        .find(|r| r.date == date(2025, 10, 14))
        .expect("day present");
    assert_eq!(day.final_status, Condition::Absent);
}
