//! SQLite (via libsql) read cache rebuilt from the learning journal
//! (spec §4.11, C11).
//!
//! The cache is a **disposable derived view**: deleting the database
//! file and rerunning [`LearningCache::sync_from_journal`] rebuilds it
//! exactly from the journal, which remains the sole authority (spec
//! §4.16). Connection setup, WAL/busy-timeout PRAGMAs, and the
//! retry-on-contention loop are grounded on the teacher's
//! `memory-storage-turso` crate (`lib_impls/constructors_basic.rs`,
//! `lib_impls/helpers.rs::execute_with_retry`), generalized to use
//! `sunwell_memory_core::config::BackoffSchedule` in place of the
//! teacher's ad hoc delay fields.

use libsql::{Builder, Connection, Database};
use std::path::Path;
use sunwell_memory_core::config::BackoffSchedule;
use sunwell_memory_core::journal::LearningJournal;
use sunwell_memory_core::types::Learning;
use sunwell_memory_core::{Error, Result};
use tracing::{debug, instrument, warn};

const CREATE_LEARNINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS learnings (
    id TEXT PRIMARY KEY NOT NULL,
    fact TEXT NOT NULL,
    category TEXT NOT NULL,
    confidence REAL NOT NULL,
    source_file TEXT,
    superseded_by TEXT,
    timestamp TEXT NOT NULL
)
"#;

const CREATE_CATEGORY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_learnings_category ON learnings(category)
"#;

const CREATE_FACTS_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS learnings_fts USING fts5(id UNINDEXED, fact)
"#;

const CREATE_META_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cache_meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Key under which the journal high-water mark is stored in `cache_meta`.
const HIGH_WATER_MARK_KEY: &str = "journal_seq";

/// SQLite-backed read model of the learning journal, keyed by learning
/// id with a `category` index and an `fact` full-text index.
pub struct LearningCache {
    db: Database,
    backoff: BackoffSchedule,
    fts_available: bool,
}

impl LearningCache {
    /// Open (creating if absent) the cache database at `path`, applying
    /// the schema idempotently, using the default back-off schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_backoff(path, BackoffSchedule::default()).await
    }

    /// Open with a caller-supplied retry schedule (spec §4.11
    /// concurrency, §9 config objects).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn with_backoff(path: impl AsRef<Path>, backoff: BackoffSchedule) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::Cache(format!("failed to open cache database: {e}")))?;

        let mut cache = Self {
            db,
            backoff,
            fts_available: false,
        };
        let conn = cache.connect().await?;
        cache.execute_pragmas(&conn).await?;
        cache
            .execute_with_retry(&conn, CREATE_LEARNINGS_TABLE)
            .await?;
        cache
            .execute_with_retry(&conn, CREATE_CATEGORY_INDEX)
            .await?;
        cache.execute_with_retry(&conn, CREATE_META_TABLE).await?;
        cache.fts_available = conn.execute(CREATE_FACTS_FTS, ()).await.is_ok();
        if !cache.fts_available {
            warn!("fts5 unavailable in this libsql build, search_facts will fall back to LIKE");
        }
        Ok(cache)
    }

    async fn connect(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::Cache(format!("failed to open connection: {e}")))
    }

    /// Enable WAL mode and a generous busy timeout so concurrent
    /// readers and a single writer proceed without blocking (spec
    /// §4.11/§5).
    async fn execute_pragmas(&self, conn: &Connection) -> Result<()> {
        if let Ok(mut rows) = conn.query("PRAGMA journal_mode=WAL", ()).await {
            while rows.next().await.is_ok_and(|r| r.is_some()) {}
        }
        if let Ok(mut rows) = conn.query("PRAGMA busy_timeout=30000", ()).await {
            while rows.next().await.is_ok_and(|r| r.is_some()) {}
        }
        Ok(())
    }

    /// Execute a statement, retrying on contention with exponential
    /// back-off up to `backoff.max_attempts` (spec §4.16: "Cache write
    /// failures on busy retry with exponential back-off; after a
    /// configured ceiling the caller sees an error").
    async fn execute_with_retry(&self, conn: &Connection, sql: &str) -> Result<()> {
        self.execute_params_with_retry(conn, sql, ()).await
    }

    async fn execute_params_with_retry(
        &self,
        conn: &Connection,
        sql: &str,
        params: impl libsql::params::IntoParams + Clone,
    ) -> Result<()> {
        let mut attempt = 0u32;
        let mut delay = self.backoff.initial;
        loop {
            match conn.execute(sql, params.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.backoff.max_attempts {
                        return Err(Error::Cache(format!(
                            "sql failed after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(attempt, error = %e, "cache write contended, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.backoff.multiplier);
                }
            }
        }
    }

    /// Insert or replace one learning (spec §4.11 `add`).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails after exhausting retries.
    #[instrument(skip(self, learning), fields(id = %learning.id))]
    pub async fn add(&self, learning: &Learning) -> Result<()> {
        let conn = self.connect().await?;
        self.upsert(&conn, learning).await
    }

    async fn upsert(&self, conn: &Connection, learning: &Learning) -> Result<()> {
        let sql = r#"
            INSERT INTO learnings (id, fact, category, confidence, source_file, superseded_by, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                fact = excluded.fact,
                category = excluded.category,
                confidence = excluded.confidence,
                source_file = excluded.source_file,
                superseded_by = excluded.superseded_by,
                timestamp = excluded.timestamp
        "#;
        let params = libsql::params![
            learning.id.to_string(),
            learning.fact.clone(),
            learning.category.clone(),
            f64::from(learning.confidence),
            learning.source_file.clone(),
            learning.superseded_by.map(|id| id.to_string()),
            learning.timestamp.to_rfc3339(),
        ];
        self.execute_params_with_retry(conn, sql, params).await?;

        if self.fts_available {
            let delete_fts = "DELETE FROM learnings_fts WHERE id = ?";
            self.execute_params_with_retry(
                conn,
                delete_fts,
                libsql::params![learning.id.to_string()],
            )
            .await?;
            let insert_fts = "INSERT INTO learnings_fts (id, fact) VALUES (?, ?)";
            self.execute_params_with_retry(
                conn,
                insert_fts,
                libsql::params![learning.id.to_string(), learning.fact.clone()],
            )
            .await?;
        }
        Ok(())
    }

    /// Replay journal entries from the cache's stored high-water mark
    /// and apply each newly-seen learning, advancing the mark (spec
    /// §4.11 `sync_from_journal`, §8 property 1 "journal replay
    /// equivalence", §3 scenario S2 "cache rebuild").
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or a write fails
    /// after exhausting retries.
    #[instrument(skip(self, journal))]
    pub async fn sync_from_journal(&self, journal: &LearningJournal) -> Result<usize> {
        let conn = self.connect().await?;
        let mark = self.high_water_mark(&conn).await?;
        let entries = journal.read_from(mark + 1)?;
        let mut applied = 0usize;
        let mut highest = mark;
        for entry in entries {
            self.upsert(&conn, &entry.learning).await?;
            highest = highest.max(entry.seq);
            applied += 1;
        }
        if applied > 0 {
            self.set_high_water_mark(&conn, highest).await?;
        }
        debug!(applied, mark = highest, "synced cache from journal");
        Ok(applied)
    }

    async fn high_water_mark(&self, conn: &Connection) -> Result<u64> {
        let sql = "SELECT value FROM cache_meta WHERE key = ?";
        let mut rows = conn
            .query(sql, libsql::params![HIGH_WATER_MARK_KEY])
            .await
            .map_err(|e| Error::Cache(format!("failed to read high-water mark: {e}")))?;
        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Cache(format!("failed to fetch high-water mark row: {e}")))?
        {
            let value: String = row
                .get(0)
                .map_err(|e| Error::Cache(format!("malformed high-water mark: {e}")))?;
            Ok(value.parse().unwrap_or(0))
        } else {
            Ok(0)
        }
    }

    async fn set_high_water_mark(&self, conn: &Connection, seq: u64) -> Result<()> {
        let sql = r#"
            INSERT INTO cache_meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#;
        let params = libsql::params![HIGH_WATER_MARK_KEY, seq.to_string()];
        self.execute_params_with_retry(conn, sql, params).await
    }

    /// Learnings in `category`, most recent first (spec §4.11
    /// `get_by_category`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_by_category(&self, category: &str) -> Result<Vec<Learning>> {
        let conn = self.connect().await?;
        let sql = r#"
            SELECT id, fact, category, confidence, source_file, superseded_by, timestamp
            FROM learnings WHERE category = ? ORDER BY timestamp DESC
        "#;
        let mut rows = conn
            .query(sql, libsql::params![category])
            .await
            .map_err(|e| Error::Cache(format!("failed to query category: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Cache(format!("failed to fetch row: {e}")))?
        {
            out.push(Self::row_to_learning(&row)?);
        }
        Ok(out)
    }

    /// Full-text search over `fact`, falling back to a `LIKE` scan when
    /// fts5 is unavailable (spec §4.11 `search_facts`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search_facts(&self, text: &str) -> Result<Vec<Learning>> {
        let conn = self.connect().await?;
        let mut out = Vec::new();
        if self.fts_available {
            let sql = r#"
                SELECT l.id, l.fact, l.category, l.confidence, l.source_file, l.superseded_by, l.timestamp
                FROM learnings_fts f JOIN learnings l ON l.id = f.id
                WHERE learnings_fts MATCH ?
                ORDER BY l.timestamp DESC
            "#;
            let mut rows = conn
                .query(sql, libsql::params![text])
                .await
                .map_err(|e| Error::Cache(format!("failed to search facts: {e}")))?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| Error::Cache(format!("failed to fetch row: {e}")))?
            {
                out.push(Self::row_to_learning(&row)?);
            }
        } else {
            let sql = r#"
                SELECT id, fact, category, confidence, source_file, superseded_by, timestamp
                FROM learnings WHERE fact LIKE ? ORDER BY timestamp DESC
            "#;
            let pattern = format!("%{text}%");
            let mut rows = conn
                .query(sql, libsql::params![pattern])
                .await
                .map_err(|e| Error::Cache(format!("failed to search facts: {e}")))?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| Error::Cache(format!("failed to fetch row: {e}")))?
            {
                out.push(Self::row_to_learning(&row)?);
            }
        }
        Ok(out)
    }

    /// The `limit` most recently recorded learnings (spec §4.11
    /// `get_recent`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<Learning>> {
        let conn = self.connect().await?;
        let sql = "SELECT id, fact, category, confidence, source_file, superseded_by, timestamp FROM learnings ORDER BY timestamp DESC LIMIT ?";
        let mut rows = conn
            .query(sql, libsql::params![limit as i64])
            .await
            .map_err(|e| Error::Cache(format!("failed to query recent: {e}")))?;
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Cache(format!("failed to fetch row: {e}")))?
        {
            out.push(Self::row_to_learning(&row)?);
        }
        Ok(out)
    }

    /// Total number of learnings cached (spec §4.11 `count`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<usize> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM learnings", ())
            .await
            .map_err(|e| Error::Cache(format!("failed to count learnings: {e}")))?;
        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::Cache(format!("failed to fetch count: {e}")))?
        {
            let count: i64 = row
                .get(0)
                .map_err(|e| Error::Cache(format!("malformed count: {e}")))?;
            Ok(count as usize)
        } else {
            Ok(0)
        }
    }

    fn row_to_learning(row: &libsql::Row) -> Result<Learning> {
        let id: String = row
            .get(0)
            .map_err(|e| Error::Cache(format!("malformed id: {e}")))?;
        let fact: String = row
            .get(1)
            .map_err(|e| Error::Cache(format!("malformed fact: {e}")))?;
        let category: String = row
            .get(2)
            .map_err(|e| Error::Cache(format!("malformed category: {e}")))?;
        let confidence: f64 = row
            .get(3)
            .map_err(|e| Error::Cache(format!("malformed confidence: {e}")))?;
        let source_file: Option<String> = row.get(4).ok();
        let superseded_by: Option<String> = row.get(5).ok();
        let timestamp: String = row
            .get(6)
            .map_err(|e| Error::Cache(format!("malformed timestamp: {e}")))?;

        Ok(Learning {
            id: id
                .parse()
                .map_err(|e| Error::Cache(format!("malformed id uuid: {e}")))?,
            fact,
            category,
            confidence: confidence as f32,
            source_turns: Vec::new(),
            source_file,
            superseded_by: superseded_by
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| Error::Cache(format!("malformed superseded_by uuid: {e}")))?,
            embedding: None,
            template_data: None,
            timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| Error::Cache(format!("malformed timestamp: {e}")))?
                .with_timezone(&chrono::Utc),
        })
    }
}
