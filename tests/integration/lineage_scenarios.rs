//! S3/S4 — artifact rename-with-content-preservation and import
//! impact analysis (spec §8).

use sunwell_memory_lineage::{EditSource, LineageStore};

#[tokio::test]
async fn artifact_move_preserves_id_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    let created = store
        .record_create(
            "src/auth.py",
            b"class Auth: pass",
            Some("g1".to_string()),
            None,
            "Auth module",
            Some("m".to_string()),
        )
        .await
        .unwrap();

    store.record_delete("src/auth.py", Some("g2".to_string())).await.unwrap();
    assert!(store.get_by_path("src/auth.py").await.unwrap().is_none());

    let moved = store
        .record_create(
            "src/auth/main.py",
            b"class Auth: pass",
            Some("g3".to_string()),
            None,
            "Moved",
            Some("m".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(created.id, moved.id);
    assert_eq!(moved.origin_reason, "Auth module");

    let at_new_path = store.get_by_path("src/auth/main.py").await.unwrap().unwrap();
    assert_eq!(at_new_path.id, created.id);
    assert!(at_new_path
        .edits
        .iter()
        .any(|e| matches!(e.kind, sunwell_memory_lineage::EditKind::Delete)));
}

#[tokio::test]
async fn byte_different_content_after_delete_gets_a_new_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    let created = store
        .record_create("a.rs", b"fn a() {}", None, None, "created", None)
        .await
        .unwrap();
    store.record_delete("a.rs", None).await.unwrap();

    let recreated = store
        .record_create("a.rs", b"fn a() { different }", None, None, "recreated", None)
        .await
        .unwrap();

    assert_ne!(created.id, recreated.id);
}

#[tokio::test]
async fn import_inverse_symmetry_holds_after_updates() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    store.record_create("base.rs", b"base", None, None, "c", None).await.unwrap();
    store.record_create("derived.rs", b"derived", None, None, "c", None).await.unwrap();

    store
        .update_imports("derived.rs", vec!["base.rs".to_string()])
        .await
        .unwrap();

    let base = store.get_by_path("base.rs").await.unwrap().unwrap();
    assert_eq!(base.imported_by, vec!["derived.rs".to_string()]);

    store.update_imports("derived.rs", vec![]).await.unwrap();
    let base_after = store.get_by_path("base.rs").await.unwrap().unwrap();
    assert!(base_after.imported_by.is_empty());
}

#[tokio::test]
async fn impact_analysis_follows_the_inverse_import_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    for path in ["base.rs", "derived1.rs", "derived2.rs"] {
        store.record_create(path, path.as_bytes(), None, None, "c", None).await.unwrap();
    }
    store
        .update_imports("derived1.rs", vec!["base.rs".to_string()])
        .await
        .unwrap();
    store
        .update_imports("derived2.rs", vec!["base.rs".to_string()])
        .await
        .unwrap();

    let impact = store.impact("base.rs").await.unwrap();
    assert_eq!(impact.max_depth, 1);
    let mut affected = impact.affected_files.clone();
    affected.sort();
    assert_eq!(affected, vec!["derived1.rs".to_string(), "derived2.rs".to_string()]);

    store.record_create("top.rs", b"top", None, None, "c", None).await.unwrap();
    store
        .update_imports("top.rs", vec!["derived1.rs".to_string()])
        .await
        .unwrap();

    let impact2 = store.impact("base.rs").await.unwrap();
    assert_eq!(impact2.max_depth, 2);
    assert!(impact2.affected_files.contains(&"top.rs".to_string()));
}

#[tokio::test]
async fn edit_on_untracked_path_creates_external_lineage() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    store
        .record_edit("legacy.py", None, None, 3, 0, EditSource::Human, None, None)
        .await
        .unwrap();

    let artifact = store.get_by_path("legacy.py").await.unwrap().unwrap();
    assert!(artifact.human_edited);
    assert!(artifact.origin_goal_id.is_none());
}

#[tokio::test]
async fn impact_terminates_on_mutual_imports() {
    let dir = tempfile::tempdir().unwrap();
    let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();

    store.record_create("a.rs", b"a", None, None, "c", None).await.unwrap();
    store.record_create("b.rs", b"b", None, None, "c", None).await.unwrap();
    store.update_imports("a.rs", vec!["b.rs".to_string()]).await.unwrap();
    store.update_imports("b.rs", vec!["a.rs".to_string()]).await.unwrap();

    let impact = tokio::time::timeout(std::time::Duration::from_secs(5), store.impact("a.rs"))
        .await
        .expect("impact analysis must terminate on a cycle")
        .unwrap();
    assert!(impact.affected_files.contains(&"b.rs".to_string()));
}
