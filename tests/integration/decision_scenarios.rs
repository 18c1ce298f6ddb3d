//! S5 — decision contradiction detection (spec §8).

use sunwell_memory_core::decision::{DecisionStore, RejectedOption};

fn exclusive_pairs() -> Vec<(String, String)> {
    vec![
        ("sqlite".to_string(), "postgres".to_string()),
        ("sync".to_string(), "async".to_string()),
    ]
}

#[test]
fn redis_proposal_contradicts_rejected_option() {
    let mut store = DecisionStore::new(exclusive_pairs());
    store
        .record(
            "database",
            "How should we persist data?",
            "SQLAlchemy with SQLite",
            vec![RejectedOption::new("Redis caching", "Too much complexity", None)],
            "simple and sufficient for our scale",
            "",
            "s1",
            0.9,
            None,
        )
        .unwrap();

    assert!(store
        .check_contradiction("Let's add Redis caching", "database")
        .is_some());
    assert!(store.check_contradiction("Keep using SQLite", "database").is_none());
}

#[test]
fn supersession_chain_excludes_superseded_from_active_queries() {
    let mut store = DecisionStore::new(exclusive_pairs());
    let d1 = store
        .record("database", "How persist?", "SQLite", vec![], "simple", "", "s1", 0.9, None)
        .unwrap();
    let d2 = store
        .record(
            "database",
            "How persist?",
            "Postgres",
            vec![],
            "need scale now",
            "",
            "s1",
            0.9,
            Some(d1.id.clone()),
        )
        .unwrap();

    let active = store.get(Some("database"), true);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, d2.id);

    let all = store.get(Some("database"), false);
    assert_eq!(all.len(), 2);
    assert_eq!(all.iter().find(|d| d.id == d2.id).unwrap().supersedes, Some(d1.id));
}

#[test]
fn rerecording_an_identical_decision_is_a_no_op() {
    let mut store = DecisionStore::new(exclusive_pairs());
    let first = store
        .record("database", "How persist?", "SQLite", vec![], "simple", "", "s1", 0.9, None)
        .unwrap();
    let second = store
        .record("database", "How persist?", "SQLite", vec![], "unused rationale", "", "s1", 0.1, None)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.rationale, second.rationale);
    assert_eq!(store.len(), 1);
}

#[test]
fn mutually_exclusive_pair_is_flagged_regardless_of_phrasing() {
    let mut store = DecisionStore::new(exclusive_pairs());
    store
        .record("concurrency", "Sync or async I/O?", "use sync I/O", vec![], "simpler to reason about", "", "s1", 0.9, None)
        .unwrap();

    assert!(store
        .check_contradiction("let's switch to asynchronous handlers", "concurrency")
        .is_some());
}

#[test]
fn persists_to_disk_and_recovers_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decisions.jsonl");
    {
        let mut store = DecisionStore::open(&path, exclusive_pairs()).unwrap();
        store
            .record("database", "How persist?", "SQLite", vec![], "simple", "", "s1", 0.9, None)
            .unwrap();
    }
    let reopened = DecisionStore::open(&path, exclusive_pairs()).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(reopened.get(Some("database"), true).len() == 1);
}
