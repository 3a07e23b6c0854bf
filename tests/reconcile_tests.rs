use chrono::TimeZone;
use rfieldclock::core::reconcile::{Reconciler, WorkSchedule, final_status, stats};
use rfieldclock::models::{Condition, PunchKind};

mod common;
use common::{date, local, policy, profile, punch};

fn reconciler() -> Reconciler {
    Reconciler::for_schedule(policy().offset, profile().schedule.as_ref()).expect("schedule")
}

#[test]
fn test_final_status_table() {
    use Condition::*;

    assert_eq!(final_status(Some(OnTime), Some(OnTime)), OnTime);
    assert_eq!(final_status(Some(OnTime), Some(Incomplete)), Incomplete);
    assert_eq!(final_status(Some(OnTime), Some(Absent)), Incomplete);
    assert_eq!(final_status(Some(Late), Some(OnTime)), Late);
    assert_eq!(final_status(Some(Late), Some(Incomplete)), Incomplete);
    assert_eq!(final_status(Some(Late), Some(Absent)), Incomplete);
    assert_eq!(final_status(Some(Absent), Some(Absent)), Absent);
    assert_eq!(final_status(Some(Late), None), Late);
    assert_eq!(final_status(Some(OnTime), None), OnTime);
    assert_eq!(final_status(None, Some(OnTime)), Absent);
    assert_eq!(final_status(None, None), Absent);
}

#[test]
fn test_tolerance_boundary_is_inclusive() {
    let schedule = WorkSchedule::parse(profile().schedule.as_ref().expect("schedule"))
        .expect("parse");
    let t = |h, m, s| chrono::NaiveTime::from_hms_opt(h, m, s).expect("time");

    assert_eq!(schedule.entry_condition(t(8, 10, 0)), Condition::OnTime);
    // seconds are dropped before comparing
    assert_eq!(schedule.entry_condition(t(8, 10, 59)), Condition::OnTime);
    assert_eq!(schedule.entry_condition(t(8, 11, 0)), Condition::Late);

    assert_eq!(schedule.exit_condition(t(15, 59, 0)), Condition::Incomplete);
    assert_eq!(schedule.exit_condition(t(16, 0, 0)), Condition::OnTime);
}

#[test]
fn test_earliest_in_and_latest_out_per_day() {
    let events = vec![
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 15, 16, 5)),
        punch(PunchKind::CheckIn, Condition::Late, local(2025, 10, 15, 8, 30)),
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 15, 8, 2)),
        punch(PunchKind::CheckOut, Condition::Incomplete, local(2025, 10, 15, 12, 0)),
    ];

    let records = reconciler().reconcile(&events);
    assert_eq!(records.len(), 1);

    let r = &records[0];
    assert_eq!(r.date, date(2025, 10, 15));
    assert_eq!(r.check_in_time.map(|t| t.to_string()), Some("08:02:00".into()));
    assert_eq!(r.check_out_time.map(|t| t.to_string()), Some("16:05:00".into()));
    assert_eq!(r.worked_minutes, Some(483));
    assert_eq!(r.final_status, Condition::OnTime);
}

#[test]
fn test_input_order_does_not_matter() {
    let mut events = vec![
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 13, 8, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 13, 16, 0)),
        punch(PunchKind::CheckIn, Condition::Late, local(2025, 10, 14, 8, 45)),
    ];
    let forward = reconciler().reconcile(&events);
    events.reverse();
    let backward = reconciler().reconcile(&events);

    assert_eq!(forward, backward);
    assert_eq!(forward[0].date, date(2025, 10, 13));
    assert_eq!(forward[1].final_status, Condition::Late);
    assert_eq!(forward[1].worked_minutes, None);
}

#[test]
fn test_absence_placeholders_stay_absent() {
    let anchor = chrono::Utc
        .with_ymd_and_hms(2025, 10, 16, 6, 0, 0)
        .single()
        .expect("instant");
    let events = vec![
        punch(PunchKind::CheckIn, Condition::Absent, anchor),
        punch(PunchKind::CheckOut, Condition::Absent, anchor),
    ];

    let records = reconciler().reconcile(&events);
    assert_eq!(records[0].entry_condition, Some(Condition::Absent));
    assert_eq!(records[0].final_status, Condition::Absent);
    assert_eq!(records[0].worked_minutes, Some(0));
}

#[test]
fn test_late_utc_punch_lands_on_local_day() {
    // 23:30 local on the 14th is already the 15th in UTC
    let events = vec![punch(
        PunchKind::CheckOut,
        Condition::OnTime,
        local(2025, 10, 14, 17, 30) + chrono::Duration::hours(6),
    )];
    let records = reconciler().reconcile(&events);
    assert_eq!(records[0].date, date(2025, 10, 14));
}

#[test]
fn test_stats_percentage() {
    let events = vec![
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 13, 8, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 13, 16, 0)),
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 14, 8, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 14, 16, 30)),
        punch(PunchKind::CheckIn, Condition::OnTime, local(2025, 10, 15, 8, 20)),
    ];

    let s = stats(&reconciler().reconcile(&events));
    assert_eq!(s.on_time, 2);
    assert_eq!(s.late, 1);
    assert_eq!(s.percentage, 67);
}

#[test]
fn test_without_schedule_stored_conditions_apply() {
    let events = vec![
        punch(PunchKind::CheckIn, Condition::Late, local(2025, 10, 13, 7, 0)),
        punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 13, 16, 0)),
    ];
    let records = Reconciler::new(policy().offset, None).reconcile(&events);
    assert_eq!(records[0].entry_condition, Some(Condition::Late));
    assert_eq!(records[0].final_status, Condition::Late);
}

#[test]
fn test_same_instant_punches_resolve_regardless_of_order() {
    let at = local(2025, 10, 13, 8, 0);
    let late_in = punch(PunchKind::CheckIn, Condition::Late, at);
    let on_time_in = punch(PunchKind::CheckIn, Condition::OnTime, at);
    let out_a = punch(PunchKind::CheckOut, Condition::OnTime, local(2025, 10, 13, 15, 0));
    let out_b = punch(PunchKind::CheckOut, Condition::Incomplete, local(2025, 10, 13, 15, 0));

    let without_schedule = Reconciler::new(policy().offset, None);
    let forward = without_schedule.reconcile(&[
        late_in.clone(),
        on_time_in.clone(),
        out_a.clone(),
        out_b.clone(),
    ]);
    let backward = without_schedule.reconcile(&[out_b, out_a, on_time_in, late_in]);

    assert_eq!(forward, backward);
    assert_eq!(forward[0].entry_condition, Some(Condition::OnTime));
}
