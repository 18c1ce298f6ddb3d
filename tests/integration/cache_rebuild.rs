//! S2 — cache rebuild from the journal (spec §8).

use sunwell_memory_cache::LearningCache;
use sunwell_memory_core::journal::LearningJournal;
use sunwell_memory_core::types::Learning;

#[tokio::test]
async fn rebuilding_the_cache_reproduces_the_live_state() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("learnings.jsonl");
    let cache_path = dir.path().join("cache.sqlite");

    let journal = LearningJournal::open(&journal_path).unwrap();
    let facts = [
        ("Project uses Python", "project"),
        ("Prefer f-strings", "pattern"),
        ("The API rate-limits at 10 rps", "project"),
        ("Retry with exponential back-off", "pattern"),
        ("python version is 3.12", "project"),
    ];
    for (fact, category) in facts {
        journal
            .append(Learning::new(fact, category, 0.8, vec![]).unwrap())
            .unwrap();
    }

    let cache = LearningCache::open(&cache_path).await.unwrap();
    let applied = cache.sync_from_journal(&journal).await.unwrap();
    assert_eq!(applied, 5);
    assert_eq!(cache.count().await.unwrap(), 5);

    drop(cache);
    std::fs::remove_file(&cache_path).ok();

    let rebuilt = LearningCache::open(&cache_path).await.unwrap();
    let rebuilt_applied = rebuilt.sync_from_journal(&journal).await.unwrap();
    assert_eq!(rebuilt_applied, 5);
    assert_eq!(rebuilt.count().await.unwrap(), 5);

    let project = rebuilt.get_by_category("project").await.unwrap();
    assert_eq!(project.len(), 3);

    let python_hits = rebuilt.search_facts("python").await.unwrap();
    assert_eq!(python_hits.len(), 2);
}

#[tokio::test]
async fn sync_is_idempotent_once_caught_up() {
    let dir = tempfile::tempdir().unwrap();
    let journal = LearningJournal::open(dir.path().join("learnings.jsonl")).unwrap();
    let cache = LearningCache::open(dir.path().join("cache.sqlite")).await.unwrap();

    journal
        .append(Learning::new("fact one", "project", 0.7, vec![]).unwrap())
        .unwrap();
    assert_eq!(cache.sync_from_journal(&journal).await.unwrap(), 1);
    assert_eq!(cache.sync_from_journal(&journal).await.unwrap(), 0);
}
