//! Session store tests: degraded reads, append/reload ordering, legacy nested
//! form, and the flag-flip operations.
//!
//! Run with: `cargo test --test session_store_test`

use warmline_core::{Interaction, SessionStore};

fn store_in(dir: &tempfile::TempDir) -> SessionStore {
    SessionStore::new(dir.path().join("interactions.json"))
}

fn turn(session_id: &str, user: &str, message: &str) -> Interaction {
    Interaction::new_user_turn(session_id, user, message)
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().expect("create temp dir");
    assert!(store_in(&dir).load().is_empty());
}

#[test]
fn empty_file_loads_empty() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("interactions.json");
    std::fs::write(&path, "").unwrap();
    assert!(SessionStore::new(&path).load().is_empty());
}

#[test]
fn malformed_json_loads_empty() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("interactions.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(SessionStore::new(&path).load().is_empty());
}

#[test]
fn append_then_reload_preserves_order() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    for i in 0..7 {
        store
            .append(turn("s1", "dana", &format!("message {}", i)))
            .expect("append");
    }
    let loaded = store.load();
    assert_eq!(loaded.len(), 7);
    for (i, interaction) in loaded.iter().enumerate() {
        assert_eq!(interaction.message, format!("message {}", i));
    }
}

#[test]
fn legacy_nested_form_loads_like_flat() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("interactions.json");
    // Old writers wrapped the list in a singleton outer list.
    let nested = serde_json::json!([[
        {
            "session_id": "s1",
            "user": "dana",
            "message": "hello",
            "timestamp": "2026-01-01T10:00:00+00:00",
            "ai": {"message": "hi there", "timestamp": "2026-01-01T10:00:01+00:00"},
            "comments": [],
            "admin_involved": false
        }
    ]]);
    std::fs::write(&path, serde_json::to_string_pretty(&nested).unwrap()).unwrap();

    let store = SessionStore::new(&path);
    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].message, "hello");
    // Field absent in the legacy record defaults to false.
    assert!(!loaded[0].new_user_message);

    // A rewrite lands in the flat form and still loads.
    store.save(&loaded).unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.as_array().unwrap()[0].is_object());
    assert_eq!(store.load().len(), 1);
}

#[test]
fn comment_delivered_exactly_once() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    store.append(turn("s1", "dana", "first")).unwrap();
    store.append(turn("s1", "dana", "second")).unwrap();
    store
        .append_comment("s1", "Admin", "a human will take it from here")
        .unwrap();

    let first = store.take_undisplayed_comments("s1").unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].message, "a human will take it from here");

    let second = store.take_undisplayed_comments("s1").unwrap();
    assert!(second.is_empty());
}

#[test]
fn comment_lands_on_latest_interaction() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    store.append(turn("s1", "dana", "first")).unwrap();
    store.append(turn("s1", "dana", "second")).unwrap();
    store.append_comment("s1", "Admin", "note").unwrap();

    let transcript = store.session_transcript("s1");
    assert!(transcript[0].comments.is_empty());
    assert_eq!(transcript[1].comments.len(), 1);
    assert!(transcript[1].admin_involved);
}

#[test]
fn comment_on_empty_session_is_an_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    assert!(store.append_comment("ghost", "Admin", "hello?").is_err());
}

#[test]
fn release_clears_takeover_on_every_interaction() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    for i in 0..3 {
        let mut t = turn("s1", "dana", &format!("message {}", i));
        t.admin_involved = true;
        store.append(t).unwrap();
    }
    assert!(store.is_admin_involved("s1"));

    store.set_admin_involved("s1", false).unwrap();
    assert!(!store.is_admin_involved("s1"));
    assert!(store.load().iter().all(|i| !i.admin_involved));
}

#[test]
fn release_leaves_other_sessions_alone() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    let mut taken = turn("s1", "dana", "help");
    taken.admin_involved = true;
    store.append(taken).unwrap();
    let mut other = turn("s2", "omer", "hi");
    other.admin_involved = true;
    store.append(other).unwrap();

    store.set_admin_involved("s1", false).unwrap();
    assert!(!store.is_admin_involved("s1"));
    assert!(store.is_admin_involved("s2"));
}

#[test]
fn mark_session_read_clears_unread_flags() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    store.append(turn("s1", "dana", "one")).unwrap();
    store.append(turn("s1", "dana", "two")).unwrap();
    store.append(turn("s2", "omer", "hi")).unwrap();

    store.mark_session_read("s1").unwrap();
    let unread = store.new_message_sessions();
    assert!(!unread.contains("s1"));
    assert!(unread.contains("s2"));
}

#[test]
fn summaries_sort_unread_first_then_recency() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);

    let mut old_read = turn("old-read", "a", "x");
    old_read.timestamp = "2026-01-01T08:00:00+00:00".to_string();
    old_read.new_user_message = false;
    let mut new_read = turn("new-read", "b", "x");
    new_read.timestamp = "2026-01-01T12:00:00+00:00".to_string();
    new_read.new_user_message = false;
    let mut old_unread = turn("old-unread", "c", "x");
    old_unread.timestamp = "2026-01-01T09:00:00+00:00".to_string();
    let mut new_unread = turn("new-unread", "d", "x");
    new_unread.timestamp = "2026-01-01T11:00:00+00:00".to_string();

    for t in [old_read, new_read, old_unread, new_unread] {
        store.append(t).unwrap();
    }

    let order: Vec<String> = store
        .session_summaries()
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(order, vec!["new-unread", "old-unread", "new-read", "old-read"]);
}

#[test]
fn transcript_sorts_ascending_by_timestamp() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = store_in(&dir);
    let mut late = turn("s1", "dana", "later");
    late.timestamp = "2026-01-01T12:00:00+00:00".to_string();
    let mut early = turn("s1", "dana", "earlier");
    early.timestamp = "2026-01-01T08:00:00+00:00".to_string();
    store.append(late).unwrap();
    store.append(early).unwrap();

    let transcript = store.session_transcript("s1");
    assert_eq!(transcript[0].message, "earlier");
    assert_eq!(transcript[1].message, "later");
}
