use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use personal_ops::core::error::OpsError;
use personal_ops::core::schemas::Document;
use personal_ops::core::store::Store;
use personal_ops::plugins::todo::{DoneOutcome, add_todo, list_todos, mark_done};
use proptest::prelude::*;
use std::fs;
use tempfile::tempdir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 27, 18, 0, 0).unwrap()
}

#[test]
fn test_todo_lifecycle() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("data").join("ops_data.json"));

    // 1. Add
    let todo = store
        .transaction("todo.add", |doc| add_todo(doc, "Pay rent", Some("2026-03-01"), t0()))
        .unwrap();
    assert_eq!(todo.id, 1);

    // 2. List shows one open item
    let doc = store.load().unwrap();
    let items = list_todos(&doc, false);
    assert_eq!(items.len(), 1);
    assert!(!items[0].done);
    assert_eq!(items[0].due, NaiveDate::from_ymd_opt(2026, 3, 1));

    // 3. Done
    let done_at = t0() + Duration::hours(1);
    let outcome = store
        .transaction("todo.done", |doc| mark_done(doc, 1, done_at))
        .unwrap();
    assert!(matches!(outcome, DoneOutcome::Completed(_)));

    // 4. Open filter is empty, unfiltered shows the done item
    let doc = store.load().unwrap();
    assert!(list_todos(&doc, true).is_empty());
    let all = list_todos(&doc, false);
    assert_eq!(all.len(), 1);
    assert!(all[0].done);
    assert_eq!(all[0].completed_at, Some(done_at));
}

#[test]
fn test_done_twice_keeps_first_completion() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("todo.add", |doc| add_todo(doc, "x", None, t0()))
        .unwrap();

    let first = t0() + Duration::minutes(10);
    store
        .transaction("todo.done", |doc| mark_done(doc, 1, first))
        .unwrap();
    let bytes_after_first = fs::read(&store.path).unwrap();

    let outcome = store
        .transaction("todo.done", |doc| mark_done(doc, 1, first + Duration::days(3)))
        .unwrap();
    assert!(matches!(outcome, DoneOutcome::AlreadyDone(_)));
    assert_eq!(outcome.todo().completed_at, Some(first));
    assert_eq!(fs::read(&store.path).unwrap(), bytes_after_first);
}

#[test]
fn test_done_unknown_id_is_not_found() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    let err = store
        .transaction("todo.done", |doc| mark_done(doc, 7, t0()))
        .unwrap_err();
    assert!(matches!(err, OpsError::NotFound(_)));
    assert!(!store.path.exists());
}

#[test]
fn test_malformed_due_date_leaves_store_unchanged() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("todo.add", |doc| add_todo(doc, "first", None, t0()))
        .unwrap();
    let before = fs::read(&store.path).unwrap();

    let err = store
        .transaction("todo.add", |doc| add_todo(doc, "second", Some("next friday"), t0()))
        .unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(fs::read(&store.path).unwrap(), before);

    let todo = store
        .transaction("todo.add", |doc| add_todo(doc, "third", None, t0()))
        .unwrap();
    assert_eq!(todo.id, 2);
}

proptest! {
    #[test]
    fn prop_open_filter_returns_exact_subset(done_mask in prop::collection::vec(any::<bool>(), 0..16)) {
        let mut doc = Document::default();
        for (i, done) in done_mask.iter().enumerate() {
            add_todo(&mut doc, &format!("t{}", i), None, t0()).unwrap();
            if *done {
                mark_done(&mut doc, (i + 1) as u64, t0()).unwrap();
            }
        }

        let open: Vec<u64> = list_todos(&doc, true).iter().map(|t| t.id).collect();
        let expected: Vec<u64> = done_mask
            .iter()
            .enumerate()
            .filter(|(_, done)| !**done)
            .map(|(i, _)| (i + 1) as u64)
            .collect();
        prop_assert_eq!(open, expected);
        prop_assert_eq!(list_todos(&doc, false).len(), done_mask.len());
    }
}
