//! S1 — cross-process learning propagation (spec §8).
//!
//! Two `LearningJournal` handles opened against the same file stand in
//! for two processes sharing nothing but the journal on disk.

use sunwell_memory_core::journal::{JournalWatcher, LearningJournal};
use sunwell_memory_core::types::Learning;

#[test]
fn learning_appended_by_one_handle_is_observed_by_another() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learnings.jsonl");

    let process_x = LearningJournal::open(&path).unwrap();
    let process_y = LearningJournal::open(&path).unwrap();

    process_x
        .append(Learning::new("Project uses Python", "project", 0.9, vec![]).unwrap())
        .unwrap();

    let mut delivered = Vec::new();
    let mut watcher = JournalWatcher::new(|entry| delivered.push(entry.learning.fact));

    let first_check = watcher.check_for_updates(&process_y).unwrap();
    assert_eq!(first_check, 1);
    assert_eq!(delivered, vec!["Project uses Python".to_string()]);

    let second_check = watcher.check_for_updates(&process_y).unwrap();
    assert_eq!(second_check, 0);
    assert_eq!(delivered.len(), 1);
}

#[test]
fn watcher_fires_exactly_n_times_for_n_new_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learnings.jsonl");
    let writer = LearningJournal::open(&path).unwrap();
    let reader = LearningJournal::open(&path).unwrap();

    let mut calls = 0;
    let mut watcher = JournalWatcher::new(|_| calls += 1);
    watcher.check_for_updates(&reader).unwrap();
    assert_eq!(calls, 0);

    for i in 0..5 {
        writer
            .append(Learning::new(format!("fact {i}"), "project", 0.5, vec![]).unwrap())
            .unwrap();
    }

    let n = watcher.check_for_updates(&reader).unwrap();
    assert_eq!(n, 5);
    assert_eq!(calls, 5);
}
