//! Configuration loading and storage-path resolution.
//!
//! Thin wrapper around [`sunwell_memory_core::config::MemoryConfig`],
//! following the teacher CLI's pattern of loading an optional TOML
//! file and falling back to defaults (`memory-cli/src/config.rs`).

use std::path::{Path, PathBuf};
use sunwell_memory_core::config::MemoryConfig;

/// Load the memory configuration from `path`, or from the default
/// `~/.config/sunwell-memory/config.toml` location if `path` is `None`.
/// A missing file yields [`MemoryConfig::default`].
///
/// # Errors
///
/// Returns an error if a file exists at the resolved path but cannot
/// be read or parsed.
pub fn load_memory_config(path: Option<&Path>) -> anyhow::Result<MemoryConfig> {
    let resolved = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path(),
    };
    Ok(MemoryConfig::load(&resolved)?)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sunwell-memory")
        .join("config.toml")
}

/// File paths for one project's durable memory state, all rooted
/// under [`MemoryConfig::resolve_storage_root`].
pub struct StoragePaths {
    /// Append-only learning journal.
    pub journal: PathBuf,
    /// Derived SQLite read cache.
    pub cache: PathBuf,
    /// Embedded artifact lineage store.
    pub lineage: PathBuf,
    /// Append-only decision log.
    pub decisions: PathBuf,
}

impl StoragePaths {
    /// Resolve every storage path for `project` under `config`'s
    /// storage root.
    #[must_use]
    pub fn resolve(config: &MemoryConfig, project: &str) -> Self {
        let root = config.resolve_storage_root(project);
        Self {
            journal: root.join("journal.jsonl"),
            cache: root.join("cache.db"),
            lineage: root.join("lineage.redb"),
            decisions: root.join("decisions.jsonl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let config = load_memory_config(Some(&path)).unwrap();
        assert!((config.focus_decay - MemoryConfig::default().focus_decay).abs() < f32::EPSILON);
    }

    #[test]
    fn existing_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut written = MemoryConfig::default();
        written.focus_decay = 0.42;
        std::fs::write(&path, toml::to_string(&written).unwrap()).unwrap();

        let loaded = load_memory_config(Some(&path)).unwrap();
        assert!((loaded.focus_decay - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn storage_paths_are_rooted_under_the_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MemoryConfig::default();
        config.storage_root = Some(dir.path().to_path_buf());
        let paths = StoragePaths::resolve(&config, "my-project");
        assert!(paths.journal.starts_with(dir.path()));
        assert_eq!(paths.journal.file_name().unwrap(), "journal.jsonl");
    }
}
