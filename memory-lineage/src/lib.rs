//! Embedded artifact lineage store (spec §4.12, C12).
//!
//! Tracks per-project artifact history — creation, edits, renames,
//! deletions, and the import graph between artifacts — in a redb
//! database. Connection setup (the `with_db_timeout` spawn_blocking
//! wrapper around redb's synchronous API, `TableDefinition` constants,
//! write-transaction/commit shape) is grounded on the teacher's
//! `memory-storage-redb` crate (`src/lib.rs`, `src/episodes.rs`);
//! records are serialized with `serde_json` rather than the teacher's
//! `postcard`, matching the format the rest of this workspace already
//! uses for durable state (journal, snapshots).

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sunwell_memory_core::identity::content_hash;
use sunwell_memory_core::{Error, Result};
use tracing::{debug, info, instrument};

const ARTIFACTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artifacts");
const PATH_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("path_index");
const DELETED_HASH_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("deleted_hash_index");

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a blocking redb operation off the async runtime with a timeout,
/// matching the teacher's `with_db_timeout` helper.
async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::Lineage(format!("task join error: {join_err}"))),
        Err(_) => Err(Error::Lineage(format!(
            "lineage operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}

/// Who performed an edit (spec §4.12 `record_edit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditSource {
    /// The agent made the edit.
    Agent,
    /// A human made the edit.
    Human,
}

/// The kind of history entry appended to an artifact (spec §4.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// The artifact was created (including rename-recovery).
    Create,
    /// The artifact's content was modified.
    Edit,
    /// The artifact's path changed.
    Rename,
    /// The artifact was deleted.
    Delete,
}

/// One append-only history entry on an artifact (spec §4.12 state
/// invariants: "Edits are append-only within an artifact").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRecord {
    /// The kind of change this entry records.
    pub kind: EditKind,
    /// Goal this change was performed for, if any.
    pub goal_id: Option<String>,
    /// Task this change was performed for, if any.
    pub task_id: Option<String>,
    /// Lines added by this change.
    pub lines_added: usize,
    /// Lines removed by this change.
    pub lines_removed: usize,
    /// Who made the change.
    pub source: EditSource,
    /// Model that made the change, if applicable.
    pub model: Option<String>,
    /// When the change was recorded.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Prior path, set only for `Rename` entries.
    pub old_path: Option<String>,
}

/// The full provenance record for one tracked artifact (spec §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable id, preserved across renames and content-preserving
    /// recreations.
    pub id: uuid::Uuid,
    /// Current path, or last-known path if deleted.
    pub path: String,
    /// Content hash of the artifact's current (or last known) contents.
    pub content_hash: String,
    /// When this artifact was first created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Goal that created this artifact, `None` for externally-discovered
    /// artifacts (spec §4.12 `record_edit` on an untracked path).
    pub origin_goal_id: Option<String>,
    /// Task that created this artifact.
    pub origin_task_id: Option<String>,
    /// Human-readable reason for the artifact's creation.
    pub origin_reason: String,
    /// Model that created this artifact, if applicable.
    pub origin_model: Option<String>,
    /// Whether a human has ever edited this artifact.
    pub human_edited: bool,
    /// Paths this artifact imports (outgoing edges).
    pub imports: Vec<String>,
    /// Paths that import this artifact (inverse edges).
    pub imported_by: Vec<String>,
    /// Append-only change history.
    pub edits: Vec<EditRecord>,
    /// Set when the artifact is deleted; cleared on rename-recovery.
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Artifact {
    fn goal_ids(&self) -> impl Iterator<Item = &str> {
        self.origin_goal_id
            .as_deref()
            .into_iter()
            .chain(self.edits.iter().filter_map(|e| e.goal_id.as_deref()))
    }
}

/// Impact analysis result for one artifact (spec §4.12 `impact`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Every path reachable by following inverse import edges.
    pub affected_files: Vec<String>,
    /// The union of goal ids found on affected artifacts' origin or edits.
    pub affected_goals: Vec<String>,
    /// The greatest BFS distance reached from the starting path.
    pub max_depth: usize,
}

/// Persistent per-project store of artifact lineage.
pub struct LineageStore {
    db: Arc<Database>,
}

impl LineageStore {
    /// Open (creating if absent) the lineage database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the
    /// tables cannot be initialized.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::Lineage(format!("failed to open lineage database: {e}")))
        })
        .await?;

        let store = Self { db: Arc::new(db) };
        store.initialize_tables().await?;
        info!("opened lineage store");
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            {
                txn.open_table(ARTIFACTS_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open artifacts table: {e}")))?;
                txn.open_table(PATH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
                txn.open_table(DELETED_HASH_INDEX_TABLE).map_err(|e| {
                    Error::Lineage(format!("failed to open deleted-hash index: {e}"))
                })?;
            }
            txn.commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    fn load_artifact_by_id(
        txn: &redb::ReadTransaction,
        id: &str,
    ) -> Result<Option<Artifact>> {
        let table = txn
            .open_table(ARTIFACTS_TABLE)
            .map_err(|e| Error::Lineage(format!("failed to open artifacts table: {e}")))?;
        match table
            .get(id)
            .map_err(|e| Error::Lineage(format!("failed to read artifact: {e}")))?
        {
            Some(bytes) => {
                let artifact: Artifact = serde_json::from_slice(bytes.value())?;
                Ok(Some(artifact))
            }
            None => Ok(None),
        }
    }

    fn write_artifact(
        txn: &redb::WriteTransaction,
        artifact: &Artifact,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(artifact)?;
        let mut table = txn
            .open_table(ARTIFACTS_TABLE)
            .map_err(|e| Error::Lineage(format!("failed to open artifacts table: {e}")))?;
        table
            .insert(artifact.id.to_string().as_str(), bytes.as_slice())
            .map_err(|e| Error::Lineage(format!("failed to write artifact: {e}")))?;
        Ok(())
    }

    fn lookup_path(txn: &redb::ReadTransaction, path: &str) -> Result<Option<String>> {
        let table = txn
            .open_table(PATH_INDEX_TABLE)
            .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
        Ok(table
            .get(path)
            .map_err(|e| Error::Lineage(format!("failed to read path index: {e}")))?
            .map(|v| v.value().to_string()))
    }

    /// Create a new artifact, or — if a recently-deleted artifact has
    /// identical content — revive it under its original id (spec §4.12
    /// content-preserving move; §4.15 artifact lifecycle rename
    /// recovery).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    #[instrument(skip(self, content), fields(path))]
    pub async fn record_create(
        &self,
        path: impl Into<String>,
        content: &[u8],
        goal_id: Option<String>,
        task_id: Option<String>,
        reason: impl Into<String>,
        model: Option<String>,
    ) -> Result<Artifact> {
        let path = path.into();
        let reason = reason.into();
        let hash = content_hash(content);
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let deleted_table = read_txn
                .open_table(DELETED_HASH_INDEX_TABLE)
                .map_err(|e| Error::Lineage(format!("failed to open deleted-hash index: {e}")))?;
            let revive_id = deleted_table
                .get(hash.as_str())
                .map_err(|e| Error::Lineage(format!("failed to read deleted-hash index: {e}")))?
                .map(|v| v.value().to_string());
            drop(deleted_table);

            let now = chrono::Utc::now();
            let artifact = if let Some(id) = revive_id {
                let mut artifact = Self::load_artifact_by_id(&read_txn, &id)?
                    .ok_or_else(|| Error::Lineage("deleted-hash index pointed at missing artifact".to_string()))?;
                artifact.path = path.clone();
                artifact.deleted_at = None;
                artifact.edits.push(EditRecord {
                    kind: EditKind::Create,
                    goal_id: goal_id.clone(),
                    task_id: task_id.clone(),
                    lines_added: 0,
                    lines_removed: 0,
                    source: EditSource::Agent,
                    model: model.clone(),
                    timestamp: now,
                    old_path: None,
                });
                artifact
            } else {
                Artifact {
                    id: sunwell_memory_core::identity::new_id(),
                    path: path.clone(),
                    content_hash: hash.clone(),
                    created_at: now,
                    origin_goal_id: goal_id,
                    origin_task_id: task_id,
                    origin_reason: reason,
                    origin_model: model,
                    human_edited: false,
                    imports: Vec::new(),
                    imported_by: Vec::new(),
                    edits: Vec::new(),
                    deleted_at: None,
                }
            };
            drop(read_txn);

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            {
                let mut path_table = write_txn
                    .open_table(PATH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
                path_table
                    .insert(path.as_str(), artifact.id.to_string().as_str())
                    .map_err(|e| Error::Lineage(format!("failed to update path index: {e}")))?;
                let mut deleted_table = write_txn
                    .open_table(DELETED_HASH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open deleted-hash index: {e}")))?;
                deleted_table
                    .remove(hash.as_str())
                    .map_err(|e| Error::Lineage(format!("failed to clear deleted-hash index: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(artifact)
        })
        .await
    }

    /// Record a content edit on a tracked (or previously-untracked)
    /// artifact (spec §4.12 `record_edit`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    #[instrument(skip(self, content), fields(path))]
    #[allow(clippy::too_many_arguments)]
    pub async fn record_edit(
        &self,
        path: impl Into<String>,
        goal_id: Option<String>,
        task_id: Option<String>,
        lines_added: usize,
        lines_removed: usize,
        source: EditSource,
        model: Option<String>,
        content: Option<&[u8]>,
    ) -> Result<()> {
        let path = path.into();
        let hash = content.map(content_hash);
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let existing_id = Self::lookup_path(&read_txn, &path)?;
            let now = chrono::Utc::now();

            let mut artifact = if let Some(id) = existing_id {
                Self::load_artifact_by_id(&read_txn, &id)?
                    .ok_or_else(|| Error::Lineage("path index pointed at missing artifact".to_string()))?
            } else {
                Artifact {
                    id: sunwell_memory_core::identity::new_id(),
                    path: path.clone(),
                    content_hash: hash.clone().unwrap_or_default(),
                    created_at: now,
                    origin_goal_id: None,
                    origin_task_id: None,
                    origin_reason: "pre-existing file (first observed during edit)".to_string(),
                    origin_model: None,
                    human_edited: matches!(source, EditSource::Human),
                    imports: Vec::new(),
                    imported_by: Vec::new(),
                    edits: Vec::new(),
                    deleted_at: None,
                }
            };
            drop(read_txn);

            if let Some(hash) = hash {
                artifact.content_hash = hash;
            }
            if matches!(source, EditSource::Human) {
                artifact.human_edited = true;
            }
            artifact.edits.push(EditRecord {
                kind: EditKind::Edit,
                goal_id,
                task_id,
                lines_added,
                lines_removed,
                source,
                model,
                timestamp: now,
                old_path: None,
            });

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            {
                let mut path_table = write_txn
                    .open_table(PATH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
                path_table
                    .insert(path.as_str(), artifact.id.to_string().as_str())
                    .map_err(|e| Error::Lineage(format!("failed to update path index: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            debug!(artifact_id = %artifact.id, "recorded edit");
            Ok(())
        })
        .await
    }

    /// Rename a tracked artifact, preserving its id and history (spec
    /// §4.12 `record_rename`).
    ///
    /// # Errors
    ///
    /// Returns an error if `old` is not tracked, or the database
    /// operation fails.
    pub async fn record_rename(
        &self,
        old: impl Into<String>,
        new: impl Into<String>,
        goal_id: Option<String>,
    ) -> Result<()> {
        let old = old.into();
        let new = new.into();
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let id = Self::lookup_path(&read_txn, &old)?
                .ok_or_else(|| Error::Lineage(format!("no tracked artifact at path {old}")))?;
            let mut artifact = Self::load_artifact_by_id(&read_txn, &id)?
                .ok_or_else(|| Error::Lineage("path index pointed at missing artifact".to_string()))?;
            drop(read_txn);

            artifact.path = new.clone();
            artifact.edits.push(EditRecord {
                kind: EditKind::Rename,
                goal_id,
                task_id: None,
                lines_added: 0,
                lines_removed: 0,
                source: EditSource::Agent,
                model: None,
                timestamp: chrono::Utc::now(),
                old_path: Some(old.clone()),
            });

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            {
                let mut path_table = write_txn
                    .open_table(PATH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
                path_table
                    .remove(old.as_str())
                    .map_err(|e| Error::Lineage(format!("failed to clear old path index: {e}")))?;
                path_table
                    .insert(new.as_str(), artifact.id.to_string().as_str())
                    .map_err(|e| Error::Lineage(format!("failed to update path index: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Mark a tracked artifact deleted, indexing it by content hash for
    /// rename detection (spec §4.12 `record_delete`).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not tracked, or the database
    /// operation fails.
    pub async fn record_delete(&self, path: impl Into<String>, goal_id: Option<String>) -> Result<()> {
        let path = path.into();
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let id = Self::lookup_path(&read_txn, &path)?
                .ok_or_else(|| Error::Lineage(format!("no tracked artifact at path {path}")))?;
            let mut artifact = Self::load_artifact_by_id(&read_txn, &id)?
                .ok_or_else(|| Error::Lineage("path index pointed at missing artifact".to_string()))?;
            drop(read_txn);

            let now = chrono::Utc::now();
            artifact.deleted_at = Some(now);
            artifact.edits.push(EditRecord {
                kind: EditKind::Delete,
                goal_id,
                task_id: None,
                lines_added: 0,
                lines_removed: 0,
                source: EditSource::Agent,
                model: None,
                timestamp: now,
                old_path: None,
            });
            let hash = artifact.content_hash.clone();

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            {
                let mut path_table = write_txn
                    .open_table(PATH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open path index: {e}")))?;
                path_table
                    .remove(path.as_str())
                    .map_err(|e| Error::Lineage(format!("failed to clear path index: {e}")))?;
                let mut deleted_table = write_txn
                    .open_table(DELETED_HASH_INDEX_TABLE)
                    .map_err(|e| Error::Lineage(format!("failed to open deleted-hash index: {e}")))?;
                deleted_table
                    .insert(hash.as_str(), artifact.id.to_string().as_str())
                    .map_err(|e| Error::Lineage(format!("failed to update deleted-hash index: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Replace an artifact's outgoing imports, synchronously updating
    /// each affected target's inverse `imported_by` edge (spec §4.12
    /// `update_imports`).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not tracked, or the database
    /// operation fails.
    pub async fn update_imports(&self, path: impl Into<String>, imports: Vec<String>) -> Result<()> {
        let path = path.into();
        let db = Arc::clone(&self.db);

        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let id = Self::lookup_path(&read_txn, &path)?
                .ok_or_else(|| Error::Lineage(format!("no tracked artifact at path {path}")))?;
            let mut artifact = Self::load_artifact_by_id(&read_txn, &id)?
                .ok_or_else(|| Error::Lineage("path index pointed at missing artifact".to_string()))?;

            let old: HashSet<String> = artifact.imports.iter().cloned().collect();
            let new: HashSet<String> = imports.iter().cloned().collect();
            let removed: Vec<String> = old.difference(&new).cloned().collect();
            let added: Vec<String> = new.difference(&old).cloned().collect();

            let mut targets = Vec::new();
            for target_path in removed.iter().chain(added.iter()) {
                if let Some(target_id) = Self::lookup_path(&read_txn, target_path)? {
                    if let Some(target) = Self::load_artifact_by_id(&read_txn, &target_id)? {
                        targets.push(target);
                    }
                }
            }
            drop(read_txn);

            artifact.imports = imports;
            for target in &mut targets {
                if removed.contains(&target.path) {
                    target.imported_by.retain(|p| p != &path);
                } else if added.contains(&target.path) {
                    if !target.imported_by.contains(&path) {
                        target.imported_by.push(path.clone());
                    }
                }
            }

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            for target in &targets {
                Self::write_artifact(&write_txn, target)?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Add one inverse `imported_by` edge directly (spec §4.12
    /// `add_imported_by`).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not tracked, or the database
    /// operation fails.
    pub async fn add_imported_by(&self, path: impl Into<String>, importer: impl Into<String>) -> Result<()> {
        self.mutate_imported_by(path.into(), importer.into(), true).await
    }

    /// Remove one inverse `imported_by` edge directly (spec §4.12
    /// `remove_imported_by`).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not tracked, or the database
    /// operation fails.
    pub async fn remove_imported_by(&self, path: impl Into<String>, importer: impl Into<String>) -> Result<()> {
        self.mutate_imported_by(path.into(), importer.into(), false).await
    }

    async fn mutate_imported_by(&self, path: String, importer: String, add: bool) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let id = Self::lookup_path(&read_txn, &path)?
                .ok_or_else(|| Error::Lineage(format!("no tracked artifact at path {path}")))?;
            let mut artifact = Self::load_artifact_by_id(&read_txn, &id)?
                .ok_or_else(|| Error::Lineage("path index pointed at missing artifact".to_string()))?;
            drop(read_txn);

            if add {
                if !artifact.imported_by.contains(&importer) {
                    artifact.imported_by.push(importer);
                }
            } else {
                artifact.imported_by.retain(|p| p != &importer);
            }

            let write_txn = db
                .begin_write()
                .map_err(|e| Error::Lineage(format!("failed to begin write transaction: {e}")))?;
            Self::write_artifact(&write_txn, &artifact)?;
            write_txn
                .commit()
                .map_err(|e| Error::Lineage(format!("failed to commit transaction: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Look up the artifact currently tracked at `path` (spec §4.12
    /// `get_by_path`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_by_path(&self, path: impl Into<String>) -> Result<Option<Artifact>> {
        let path = path.into();
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let Some(id) = Self::lookup_path(&read_txn, &path)? else {
                return Ok(None);
            };
            Self::load_artifact_by_id(&read_txn, &id)
        })
        .await
    }

    /// All artifacts whose creation or any edit carries `goal_id`
    /// (spec §4.12 `get_by_goal`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_by_goal(&self, goal_id: impl Into<String>) -> Result<Vec<Artifact>> {
        let goal_id = goal_id.into();
        let all = self.all_artifacts().await?;
        Ok(all
            .into_iter()
            .filter(|a| a.goal_ids().any(|g| g == goal_id))
            .collect())
    }

    /// Paths that import `path` (spec §4.12 `get_dependents`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_dependents(&self, path: impl Into<String>) -> Result<Vec<String>> {
        Ok(self
            .get_by_path(path)
            .await?
            .map(|a| a.imported_by)
            .unwrap_or_default())
    }

    /// Paths that `path` imports (spec §4.12 `get_dependencies`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_dependencies(&self, path: impl Into<String>) -> Result<Vec<String>> {
        Ok(self
            .get_by_path(path)
            .await?
            .map(|a| a.imports)
            .unwrap_or_default())
    }

    /// BFS over inverse import edges from `path`, reporting every
    /// reachable file, the union of goal ids on affected artifacts, and
    /// the maximum distance reached (spec §4.12 `impact`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn impact(&self, path: impl Into<String>) -> Result<ImpactReport> {
        let start = path.into();
        let Some(start_artifact) = self.get_by_path(&start).await? else {
            return Ok(ImpactReport::default());
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.clone());
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((start.clone(), 0));

        let mut affected_files = Vec::new();
        let mut affected_goals: HashSet<String> = HashSet::new();
        let mut max_depth = 0usize;

        let _ = &start_artifact;
        while let Some((current, depth)) = queue.pop_front() {
            let Some(artifact) = self.get_by_path(&current).await? else {
                continue;
            };
            if current != start {
                affected_files.push(current.clone());
                affected_goals.extend(artifact.goal_ids().map(str::to_string));
                max_depth = max_depth.max(depth);
            }
            for dependent in &artifact.imported_by {
                if visited.insert(dependent.clone()) {
                    queue.push_back((dependent.clone(), depth + 1));
                }
            }
        }

        Ok(ImpactReport {
            affected_files,
            affected_goals: affected_goals.into_iter().collect(),
            max_depth,
        })
    }

    /// Artifacts deleted within the last `hours` (spec §4.12
    /// `get_recently_deleted`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_recently_deleted(&self, hours: i64) -> Result<Vec<Artifact>> {
        let cutoff = chrono::Utc::now() - chrono::Duration::hours(hours);
        let all = self.all_artifacts().await?;
        Ok(all
            .into_iter()
            .filter(|a| a.deleted_at.is_some_and(|t| t >= cutoff))
            .collect())
    }

    async fn all_artifacts(&self) -> Result<Vec<Artifact>> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::Lineage(format!("failed to begin read transaction: {e}")))?;
            let table = read_txn
                .open_table(ARTIFACTS_TABLE)
                .map_err(|e| Error::Lineage(format!("failed to open artifacts table: {e}")))?;
            let mut out = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| Error::Lineage(format!("failed to iterate artifacts: {e}")))?;
            for entry in iter {
                let (_, bytes) =
                    entry.map_err(|e| Error::Lineage(format!("failed to read artifact entry: {e}")))?;
                let artifact: Artifact = serde_json::from_slice(bytes.value())?;
                out.push(artifact);
            }
            Ok(out)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (LineageStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = LineageStore::open(dir.path().join("lineage.redb")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn record_create_then_get_by_path_round_trips() {
        let (store, _dir) = store().await;
        let artifact = store
            .record_create("src/lib.rs", b"fn main() {}", Some("goal-1".to_string()), None, "scaffold", None)
            .await
            .unwrap();

        let fetched = store.get_by_path("src/lib.rs").await.unwrap().unwrap();
        assert_eq!(fetched.id, artifact.id);
        assert_eq!(fetched.origin_goal_id.as_deref(), Some("goal-1"));
    }

    #[tokio::test]
    async fn delete_then_recreate_with_same_content_reuses_id() {
        let (store, _dir) = store().await;
        let content = b"fn helper() {}";
        let created = store
            .record_create("src/helper.rs", content, None, None, "scaffold", None)
            .await
            .unwrap();
        store.record_delete("src/helper.rs", None).await.unwrap();
        assert!(store.get_by_path("src/helper.rs").await.unwrap().is_none());

        let revived = store
            .record_create("src/util/helper.rs", content, None, None, "moved", None)
            .await
            .unwrap();
        assert_eq!(revived.id, created.id);
        assert!(revived.deleted_at.is_none());
    }

    #[tokio::test]
    async fn record_edit_on_untracked_path_creates_external_artifact() {
        let (store, _dir) = store().await;
        store
            .record_edit(
                "README.md",
                None,
                None,
                3,
                1,
                EditSource::Human,
                None,
                Some(b"# Title"),
            )
            .await
            .unwrap();

        let artifact = store.get_by_path("README.md").await.unwrap().unwrap();
        assert!(artifact.human_edited);
        assert!(artifact.origin_goal_id.is_none());
        assert_eq!(artifact.edits.len(), 1);
    }

    #[tokio::test]
    async fn update_imports_maintains_inverse_edge() {
        let (store, _dir) = store().await;
        store.record_create("a.rs", b"a", None, None, "scaffold", None).await.unwrap();
        store.record_create("b.rs", b"b", None, None, "scaffold", None).await.unwrap();

        store
            .update_imports("a.rs", vec!["b.rs".to_string()])
            .await
            .unwrap();
        assert_eq!(store.get_dependents("b.rs").await.unwrap(), vec!["a.rs".to_string()]);

        store.update_imports("a.rs", vec![]).await.unwrap();
        assert!(store.get_dependents("b.rs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn impact_bfs_reports_depth_and_goals() {
        let (store, _dir) = store().await;
        store.record_create("a.rs", b"a", Some("goal-a".to_string()), None, "scaffold", None).await.unwrap();
        store.record_create("b.rs", b"b", Some("goal-b".to_string()), None, "scaffold", None).await.unwrap();
        store.record_create("c.rs", b"c", Some("goal-c".to_string()), None, "scaffold", None).await.unwrap();
        store.update_imports("b.rs", vec!["a.rs".to_string()]).await.unwrap();
        store.update_imports("c.rs", vec!["b.rs".to_string()]).await.unwrap();

        let report = store.impact("a.rs").await.unwrap();
        assert_eq!(report.max_depth, 2);
        assert!(report.affected_files.contains(&"b.rs".to_string()));
        assert!(report.affected_files.contains(&"c.rs".to_string()));
        assert!(report.affected_goals.contains(&"goal-b".to_string()));
        assert!(report.affected_goals.contains(&"goal-c".to_string()));
    }

    #[tokio::test]
    async fn get_recently_deleted_filters_by_retention() {
        let (store, _dir) = store().await;
        store.record_create("old.rs", b"x", None, None, "scaffold", None).await.unwrap();
        store.record_delete("old.rs", None).await.unwrap();

        let recent = store.get_recently_deleted(24).await.unwrap();
        assert_eq!(recent.len(), 1);
        let none = store.get_recently_deleted(0).await.unwrap();
        assert!(none.is_empty());
    }

    proptest::proptest! {
        /// `update_imports` keeps the forward `imports` edge and the
        /// inverse `imported_by` edge in agreement for any subset of
        /// candidate targets (spec §4.12, §8 property: import-inverse
        /// symmetry).
        #[test]
        fn update_imports_inverse_edge_matches_any_subset(
            include_b in proptest::bool::ANY,
            include_c in proptest::bool::ANY,
            include_d in proptest::bool::ANY,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), proptest::test_runner::TestCaseError> = rt.block_on(async {
                let (store, _dir) = store().await;
                store.record_create("a.rs", b"a", None, None, "scaffold", None).await.unwrap();
                store.record_create("b.rs", b"b", None, None, "scaffold", None).await.unwrap();
                store.record_create("c.rs", b"c", None, None, "scaffold", None).await.unwrap();
                store.record_create("d.rs", b"d", None, None, "scaffold", None).await.unwrap();

                let mut imports = Vec::new();
                if include_b {
                    imports.push("b.rs".to_string());
                }
                if include_c {
                    imports.push("c.rs".to_string());
                }
                if include_d {
                    imports.push("d.rs".to_string());
                }
                store.update_imports("a.rs", imports).await.unwrap();

                for (target, included) in
                    [("b.rs", include_b), ("c.rs", include_c), ("d.rs", include_d)]
                {
                    let dependents = store.get_dependents(target).await.unwrap();
                    proptest::prop_assert_eq!(dependents.contains(&"a.rs".to_string()), included);
                }
                Ok(())
            });
            result?;
        }
    }
}
