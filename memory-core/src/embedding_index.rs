//! In-memory approximate vector index (spec §4.4, C5).
//!
//! Not the canonical store — rebuildable from the nodes' embeddings.
//! Uses brute-force cosine similarity; at the scale this crate targets
//! (single-process, per-session memory) that is the right trade-off
//! over standing up an HNSW graph, and it keeps the `save`/`load`
//! format trivial to reason about.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// One vector entry plus arbitrary metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    vector: Vec<f32>,
    metadata: serde_json::Value,
}

/// A fixed-dimension, in-memory approximate vector index.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    dim: usize,
    entries: HashMap<Uuid, Entry>,
}

/// On-disk representation for `save`/`load`.
#[derive(Debug, Serialize, Deserialize)]
struct Persisted {
    dim: usize,
    ids: Vec<Uuid>,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<serde_json::Value>,
}

impl EmbeddingIndex {
    /// Create an empty index with a fixed dimension. Callers must
    /// reinitialize the index if the embedder's dimension changes
    /// (spec §4.4).
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            entries: HashMap::new(),
        }
    }

    /// The fixed vector dimension this index was constructed with.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Insert a vector under `id`; an existing entry for the same id is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `vector.len() != self.dim()`.
    pub fn add(
        &mut self,
        id: Uuid,
        vector: Vec<f32>,
        metadata: serde_json::Value,
    ) -> crate::Result<()> {
        if vector.len() != self.dim {
            return Err(crate::Error::InvalidInput(format!(
                "vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dim
            )));
        }
        self.entries.insert(id, Entry { vector, metadata });
        Ok(())
    }

    /// Remove an entry. No-op if `id` was not present.
    pub fn delete(&mut self, id: Uuid) {
        self.entries.remove(&id);
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cosine-similarity search, descending by score.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if `query.len() != self.dim()`.
    pub fn search(&self, query: &[f32], top_k: usize) -> crate::Result<Vec<(Uuid, f32)>> {
        if query.len() != self.dim {
            return Err(crate::Error::InvalidInput(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dim
            )));
        }
        let mut scored: Vec<(Uuid, f32)> = self
            .entries
            .iter()
            .map(|(id, entry)| (*id, cosine_similarity(query, &entry.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Persist the index to `dir/embeddings.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, dir: &Path) -> crate::Result<()> {
        std::fs::create_dir_all(dir)?;
        let mut ids = Vec::with_capacity(self.entries.len());
        let mut vectors = Vec::with_capacity(self.entries.len());
        let mut metadata = Vec::with_capacity(self.entries.len());
        for (id, entry) in &self.entries {
            ids.push(*id);
            vectors.push(entry.vector.clone());
            metadata.push(entry.metadata.clone());
        }
        let persisted = Persisted {
            dim: self.dim,
            ids,
            vectors,
            metadata,
        };
        let path = dir.join("embeddings.json");
        let bytes = serde_json::to_vec(&persisted)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load an index previously written by [`EmbeddingIndex::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, malformed, or its
    /// dimension does not match `expected_dim`.
    pub fn load(dir: &Path, expected_dim: usize) -> crate::Result<Self> {
        let path = dir.join("embeddings.json");
        let bytes = std::fs::read(path)?;
        let persisted: Persisted = serde_json::from_slice(&bytes)?;
        if persisted.dim != expected_dim {
            return Err(crate::Error::InvalidInput(format!(
                "stored index dimension {} does not match expected dimension {expected_dim}",
                persisted.dim
            )));
        }
        let mut entries = HashMap::with_capacity(persisted.ids.len());
        for ((id, vector), metadata) in persisted
            .ids
            .into_iter()
            .zip(persisted.vectors)
            .zip(persisted.metadata)
        {
            entries.insert(id, Entry { vector, metadata });
        }
        Ok(Self {
            dim: expected_dim,
            entries,
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_ranks_by_similarity() {
        let mut index = EmbeddingIndex::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        index.add(a, vec![1.0, 0.0], json!({})).unwrap();
        index.add(b, vec![0.0, 1.0], json!({})).unwrap();

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, a);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn replace_on_same_id() {
        let mut index = EmbeddingIndex::new(2);
        let id = Uuid::new_v4();
        index.add(id, vec![1.0, 0.0], json!({})).unwrap();
        index.add(id, vec![0.0, 1.0], json!({})).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let mut index = EmbeddingIndex::new(3);
        assert!(index.add(Uuid::new_v4(), vec![1.0, 0.0], json!({})).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = EmbeddingIndex::new(2);
        let id = Uuid::new_v4();
        index.add(id, vec![0.6, 0.8], json!({"k": "v"})).unwrap();
        index.save(dir.path()).unwrap();

        let loaded = EmbeddingIndex::load(dir.path(), 2).unwrap();
        assert_eq!(loaded.len(), 1);
        let results = loaded.search(&[0.6, 0.8], 1).unwrap();
        assert_eq!(results[0].0, id);
    }

    #[test]
    fn load_rejects_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddingIndex::new(2);
        index.save(dir.path()).unwrap();
        assert!(EmbeddingIndex::load(dir.path(), 5).is_err());
    }
}
