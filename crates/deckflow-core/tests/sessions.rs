//! Session aggregation integration tests.

use deckflow_config::SessionsConfig;
use deckflow_core::SessionAggregator;
use deckflow_store::{
    AssemblyPayload, EditingPayload, MemorySubstrate, OutlinePayload, StageKind,
    StageRecordStore, StoreError, Substrate,
};
use deckflow_test_utils::{FailingSubstrate, ManualClock};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    clock: Arc<ManualClock>,
    substrate: Arc<MemorySubstrate>,
    store: StageRecordStore,
    sessions: SessionAggregator,
}

fn fixture(now: i64) -> Fixture {
    fixture_with_config(now, SessionsConfig::default())
}

fn fixture_with_config(now: i64, config: SessionsConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(now));
    let substrate = Arc::new(MemorySubstrate::new());
    let store = StageRecordStore::with_clock(substrate.clone(), clock.clone());
    let sessions = SessionAggregator::new(store.clone(), config);
    Fixture {
        clock,
        substrate,
        store,
        sessions,
    }
}

fn outline(text: &str, language: &str, model: &str) -> OutlinePayload {
    OutlinePayload {
        outline: text.to_string(),
        language: language.to_string(),
        model: model.to_string(),
        images: None,
    }
}

/// The most recently written stage decides the reported progress.
#[test]
fn progress_follows_latest_stage() {
    let fx = fixture(1_000);
    fx.store
        .write(&outline("Launch plan\n- goals", "English", "m1"), Some("1000"))
        .expect("outline");
    fx.clock.set(2_000);
    fx.store
        .write_with_progress(&AssemblyPayload::default(), Some("1000"), "ppt")
        .expect("assembly");

    assert_eq!(fx.sessions.get_progress("1000"), "ppt");

    fx.clock.set(3_000);
    fx.store
        .write_with_progress(
            &outline("Launch plan v2", "English", "m1"),
            Some("1000"),
            "outline-edited",
        )
        .expect("outline rewrite");
    assert_eq!(fx.sessions.get_progress("1000"), "outline-edited");
}

/// Records written in the same millisecond favor outline over editing.
#[test]
fn progress_tie_prefers_outline_over_editor() {
    let fx = fixture(5_000);
    fx.store
        .write(&EditingPayload::default(), Some("5000"))
        .expect("editor");
    fx.store
        .write(&outline("Deck", "", ""), Some("5000"))
        .expect("outline");
    assert_eq!(fx.sessions.get_progress("5000"), "outline");
}

/// Legacy records share the id timestamp; assembly, then outline, decide.
#[test]
fn legacy_progress_ties_rank_assembly_first() {
    let fx = fixture(2_000_000_000_000);
    fx.substrate
        .set_item("outline_1700000000000", r#"{"outline":"Old deck"}"#)
        .expect("outline");
    fx.substrate
        .set_item("editor_1700000000000", "{}")
        .expect("editor");
    assert_eq!(fx.sessions.get_progress("1700000000000"), "outline");

    fx.substrate
        .set_item("ppt_1700000000000", r#"{"slides":[],"theme":{}}"#)
        .expect("ppt");
    assert_eq!(fx.sessions.get_progress("1700000000000"), "ppt");
    assert_eq!(
        fx.sessions.get_session_summary("1700000000000").progress,
        "ppt"
    );
}

/// A session with no records reports the outline stage.
#[test]
fn progress_defaults_to_outline() {
    let fx = fixture(1);
    assert_eq!(fx.sessions.get_progress("404"), "outline");
}

/// Summary merges every stage and takes the newest timestamp.
#[test]
fn summary_merges_stages() {
    let fx = fixture(1_700_000_000_000);
    let id = fx
        .store
        .write(&outline("  Quarterly review \nAgenda", "English", "m-large"), None)
        .expect("outline");
    assert_eq!(id, "1700000000000");
    fx.clock.advance(500);
    fx.store
        .write(&AssemblyPayload::default(), Some(id.as_str()))
        .expect("assembly");
    fx.clock.advance(500);
    fx.store
        .write(&EditingPayload::default(), Some(id.as_str()))
        .expect("editor");

    let summary = fx.sessions.get_session_summary(&id);
    assert_eq!(summary.session_id, id);
    assert_eq!(summary.title, "Quarterly review");
    assert_eq!(
        summary.outline.as_deref(),
        Some("  Quarterly review \nAgenda")
    );
    assert_eq!(summary.progress, "editor");
    assert_eq!(summary.updated_at, 1_700_000_001_000);
    assert_eq!(summary.created_at, Some(1_700_000_000_000));
    assert_eq!(summary.language, "English");
    assert_eq!(summary.model, "m-large");
}

/// Empty outline fields fall back to the configured defaults.
#[test]
fn summary_applies_defaults() {
    let fx = fixture(10);
    fx.store
        .write(&outline("", "", ""), Some("10"))
        .expect("outline");

    let summary = fx.sessions.get_session_summary("10");
    assert_eq!(summary.title, "未命名PPT");
    assert_eq!(summary.language, "中文");
    assert_eq!(summary.model, "qwen3-235b");
    assert_eq!(summary.outline.as_deref(), Some(""));
}

/// Configured defaults replace the built-in ones.
#[test]
fn summary_uses_configured_defaults() {
    let config = SessionsConfig {
        default_language: "English".to_string(),
        untitled_title: "Untitled deck".to_string(),
        title_max_chars: 5,
        ..SessionsConfig::default()
    };
    let fx = fixture_with_config(10, config);
    fx.store
        .write(&outline("Too long for five", "", ""), Some("10"))
        .expect("outline");

    let summary = fx.sessions.get_session_summary("10");
    assert_eq!(summary.title, "Untitled deck");
    assert_eq!(summary.language, "English");
}

/// Without records the session id stands in for both timestamps.
#[test]
fn summary_without_records_uses_session_id() {
    let fx = fixture(99);
    let summary = fx.sessions.get_session_summary("1234");
    assert_eq!(summary.updated_at, 1234);
    assert_eq!(summary.created_at, Some(1234));
    assert_eq!(summary.outline, None);
    assert_eq!(summary.progress, "outline");

    let summary = fx.sessions.get_session_summary("draft-a");
    assert_eq!(summary.updated_at, 0);
    assert_eq!(summary.created_at, None);
}

/// Assembly-only sessions still summarize with placeholder values.
#[test]
fn summary_without_outline_uses_placeholder() {
    let fx = fixture(42);
    fx.store
        .write(&AssemblyPayload::default(), Some("42"))
        .expect("assembly");
    let summary = fx.sessions.get_session_summary("42");
    assert_eq!(summary.title, "未命名PPT");
    assert_eq!(summary.progress, "ppt");
    assert_eq!(summary.outline, None);
}

/// One summary per session, newest first, ties by ascending id.
#[test]
fn session_summaries_are_unique_and_ordered() {
    let fx = fixture(100);
    fx.store.write(&outline("A", "", ""), Some("a")).expect("a");
    fx.store
        .write(&AssemblyPayload::default(), Some("a"))
        .expect("a ppt");
    fx.store.write(&outline("C", "", ""), Some("c")).expect("c");
    fx.store.write(&outline("B", "", ""), Some("b")).expect("b");
    fx.clock.set(200);
    fx.store
        .write(&EditingPayload::default(), Some("z"))
        .expect("z");

    let ids: Vec<String> = fx
        .sessions
        .list_session_summaries()
        .into_iter()
        .map(|summary| summary.session_id)
        .collect();
    assert_eq!(ids, vec!["z", "a", "b", "c"]);
}

/// Corrupt values and foreign keys never hide valid records.
#[test]
fn listing_skips_corrupt_and_foreign_keys() {
    let fx = fixture(300);
    fx.store
        .write(&outline("Good", "", ""), Some("300"))
        .expect("good");
    fx.substrate.set_item("outline_bad", "{not json").expect("bad");
    fx.substrate.set_item("theme", "dark").expect("foreign");
    fx.substrate
        .set_item("outlineless", "{}")
        .expect("prefix only");

    let records = fx.sessions.list_all_sessions();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, "300");

    let summaries = fx.sessions.list_session_summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "Good");
}

/// Values written before timestamps existed are back-filled from the id.
#[test]
fn legacy_records_are_backfilled() {
    let fx = fixture(2_000_000_000_000);
    fx.substrate
        .set_item(
            "outline_1700000000000",
            &json!({ "outline": "Old deck", "language": "English" }).to_string(),
        )
        .expect("legacy");

    let records = fx.sessions.list_all_sessions();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].progress, "outline");
    assert_eq!(records[0].created_at, 1_700_000_000_000);
    assert_eq!(records[0].updated_at, 1_700_000_000_000);

    let summary = fx.sessions.get_session_summary("1700000000000");
    assert_eq!(summary.title, "Old deck");
    assert_eq!(summary.updated_at, 1_700_000_000_000);
}

/// Grouping collects each session's records in stage order.
#[test]
fn group_sessions_orders_records() {
    let fx = fixture(10);
    fx.store
        .write(&EditingPayload::default(), Some("s1"))
        .expect("editor");
    fx.store
        .write(&outline("S1", "", ""), Some("s1"))
        .expect("outline");
    fx.clock.set(20);
    fx.store
        .write(&AssemblyPayload::default(), Some("s2"))
        .expect("s2");

    let groups = fx.sessions.group_sessions();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].session_id, "s2");
    assert_eq!(groups[1].session_id, "s1");
    let stages: Vec<StageKind> = groups[1].records.iter().map(|record| record.stage).collect();
    assert_eq!(stages, vec![StageKind::Outline, StageKind::Editing]);
}

/// Records older than the maximum age are removed; corrupt values stay.
#[test]
fn clear_expired_removes_stale_records() {
    let fx = fixture(0);
    fx.store.write(&outline("Old", "", ""), Some("old")).expect("old");
    fx.clock.set(100_000);
    fx.store
        .write(&outline("Fresh", "", ""), Some("fresh"))
        .expect("fresh");
    fx.substrate.set_item("ppt_broken", "nope").expect("broken");
    fx.clock.set(200_000);

    let removed = fx
        .sessions
        .clear_expired(Duration::from_millis(150_000))
        .expect("clear");
    assert_eq!(removed, 1);
    assert_eq!(fx.store.read::<OutlinePayload>("old"), None);
    assert!(fx.store.read::<OutlinePayload>("fresh").is_some());
    assert_eq!(fx.substrate.get_item("ppt_broken").as_deref(), Some("nope"));
}

/// The configured policy drives expiry; `None` disables it.
#[test]
fn clear_expired_with_policy_respects_config() {
    let fx = fixture_with_config(
        0,
        SessionsConfig {
            max_age_ms: None,
            ..SessionsConfig::default()
        },
    );
    fx.store.write(&outline("Old", "", ""), Some("old")).expect("old");
    fx.clock.set(i64::MAX / 2);
    assert_eq!(fx.sessions.clear_expired_with_policy().expect("clear"), 0);

    let fx = fixture_with_config(
        0,
        SessionsConfig {
            max_age_ms: Some(1_000),
            ..SessionsConfig::default()
        },
    );
    fx.store.write(&outline("Old", "", ""), Some("old")).expect("old");
    fx.clock.set(5_000);
    assert_eq!(fx.sessions.clear_expired_with_policy().expect("clear"), 1);
    assert!(fx.sessions.list_all_sessions().is_empty());
}

/// Substrate write failures reach the caller unchanged.
#[test]
fn write_failures_propagate() {
    let substrate = Arc::new(FailingSubstrate::quota(16));
    let store = StageRecordStore::with_clock(substrate.clone(), Arc::new(ManualClock::new(7)));

    let err = store
        .write(&outline("Deck", "", ""), Some("7"))
        .unwrap_err();
    assert!(matches!(err, StoreError::QuotaExceeded { limit: 16, .. }));
    assert_eq!(store.read::<OutlinePayload>("7"), None);

    substrate.set_failure(None);
    store
        .write(&outline("Deck", "", ""), Some("7"))
        .expect("write after recovery");
    assert!(store.read::<OutlinePayload>("7").is_some());
}
