use chrono::{DateTime, Duration, TimeZone, Utc};
use personal_ops::core::schemas::Document;
use personal_ops::core::store::Store;
use personal_ops::plugins::note::{add_note, list_notes, parse_tags};
use personal_ops::plugins::todo::add_todo;
use proptest::prelude::*;
use tempfile::tempdir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap()
}

#[test]
fn test_note_ids_are_sequential_across_todo_interleaving() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("data").join("ops_data.json"));

    for i in 0..5u64 {
        let now = t0() + Duration::minutes(i as i64);
        store
            .transaction("note.add", |doc| {
                Ok(add_note(doc, &format!("note {}", i), vec![], now))
            })
            .unwrap();
        if i % 2 == 0 {
            store
                .transaction("todo.add", |doc| add_todo(doc, "interleaved", None, now))
                .unwrap();
        }
    }

    let doc = store.load().unwrap();
    let ids: Vec<u64> = doc.notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    let texts: Vec<&str> = doc.notes.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["note 0", "note 1", "note 2", "note 3", "note 4"]);
    assert_eq!(doc.counters.note_id, 5);
    assert_eq!(doc.counters.todo_id, 3);
}

#[test]
fn test_note_survives_reload_with_tags() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    store
        .transaction("note.add", |doc| {
            Ok(add_note(doc, "Read 10 pages", parse_tags("learning, reading"), t0()))
        })
        .unwrap();

    let doc = store.load().unwrap();
    assert_eq!(doc.notes.len(), 1);
    assert_eq!(doc.notes[0].tags, vec!["learning", "reading"]);
    assert_eq!(doc.notes[0].created_at, t0());
}

#[test]
fn test_note_list_does_not_write() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path().join("ops.json"));
    let doc = store.load().unwrap();
    assert!(list_notes(&doc, Some("anything")).is_empty());
    assert!(!store.path.exists());
}

proptest! {
    #[test]
    fn prop_tag_filter_returns_exact_subset(
        tag_sets in prop::collection::vec(
            prop::collection::vec(prop::sample::select(vec!["home", "work", "urgent", "misc"]), 0..4),
            0..12,
        ),
        wanted in prop::sample::select(vec!["home", "work", "urgent", "misc", "absent"]),
    ) {
        let mut doc = Document::default();
        for tags in &tag_sets {
            add_note(&mut doc, "n", tags.iter().map(|t| t.to_string()).collect(), t0());
        }

        let hits: Vec<u64> = list_notes(&doc, Some(wanted)).iter().map(|n| n.id).collect();
        let expected: Vec<u64> = doc
            .notes
            .iter()
            .filter(|n| n.tags.iter().any(|t| t == wanted))
            .map(|n| n.id)
            .collect();
        prop_assert_eq!(hits, expected);
    }
}
