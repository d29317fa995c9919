use chrono::{DateTime, Duration, TimeZone, Utc};
use personal_ops::core::store::Store;
use personal_ops::plugins::timer::{TimerStatus, render_status, start_timer, timer_status};
use std::fs;
use tempfile::tempdir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

#[test]
fn test_timer_arithmetic_at_boundary() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("timer.start", |doc| start_timer(doc, "Deep work", 50, t0()))
        .unwrap();
    let doc = store.load().unwrap();

    let status = timer_status(&doc, t0() + Duration::minutes(49) + Duration::seconds(59));
    match &status {
        TimerStatus::Running { remaining_secs, .. } => assert_eq!(*remaining_secs, 1),
        other => panic!("expected running timer, got {:?}", other),
    }

    for later in [Duration::minutes(50), Duration::minutes(51), Duration::days(2)] {
        let status = timer_status(&doc, t0() + later);
        assert!(matches!(status, TimerStatus::Finished { .. }), "{:?}", later);
    }
}

#[test]
fn test_finished_state_is_never_written() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("timer.start", |doc| start_timer(doc, "Short", 1, t0()))
        .unwrap();
    let before = fs::read(&store.path).unwrap();

    let doc = store.load().unwrap();
    let status = timer_status(&doc, t0() + Duration::hours(1));
    assert_eq!(render_status(&status), "Timer 'Short' finished.");
    assert_eq!(fs::read(&store.path).unwrap(), before);
}

#[test]
fn test_zero_minutes_leaves_prior_timer() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("timer.start", |doc| start_timer(doc, "Reading", 25, t0()))
        .unwrap();
    let before = fs::read(&store.path).unwrap();

    let err = store
        .transaction("timer.start", |doc| start_timer(doc, "Deep work", 0, t0()))
        .unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(fs::read(&store.path).unwrap(), before);
    assert_eq!(
        store.load().unwrap().timer.map(|t| t.label),
        Some("Reading".to_string())
    );
}

#[test]
fn test_replacement_is_reported() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("timer.start", |doc| start_timer(doc, "Reading", 25, t0()))
        .unwrap();
    let started = store
        .transaction("timer.start", |doc| {
            start_timer(doc, "Deep work", 50, t0() + Duration::minutes(3))
        })
        .unwrap();
    let replaced = started.replaced.expect("prior timer reported");
    assert_eq!(replaced.label, "Reading");
    assert_eq!(replaced.minutes, 25);

    let stored = store.load().unwrap().timer.unwrap();
    assert_eq!(stored.label, "Deep work");
    assert_eq!(stored.started_at, t0() + Duration::minutes(3));
}
