//! Identity and content hashing (spec §4.1, C1).
//!
//! Stable ids for nodes and artifacts, a deterministic hash for
//! decision ids, a collision-safe slug generator, a `sunwell:` URI
//! grammar, and a wide content hash for files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Mint a fresh, globally unique id for a node or artifact.
#[must_use]
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

/// A wide cryptographic digest over raw file bytes. Equal hashes imply
/// equal content (spec §4.1).
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Deterministic decision id: a hash over `category:question:choice`
/// so the same decision can never be recorded twice under different
/// ids (spec §3, Global invariant 1).
#[must_use]
pub fn decision_id(category: &str, question: &str, choice: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b":");
    hasher.update(question.as_bytes());
    hasher.update(b":");
    hasher.update(choice.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Produces lower-case, hyphen-joined, length-capped slugs with
/// `~N` disambiguation on collision.
///
/// One `SlugGenerator` tracks the collision counters for a namespace;
/// it does not need to re-scan already-issued slugs.
#[derive(Debug, Default, Clone)]
pub struct SlugGenerator {
    seen: HashMap<String, u32>,
}

/// Maximum length of the base slug before a `~N` suffix is appended.
const MAX_SLUG_LEN: usize = 30;

impl SlugGenerator {
    /// Create an empty slug generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slugify `text` and disambiguate it against previously issued
    /// slugs in this generator.
    #[must_use]
    pub fn slugify(&mut self, text: &str) -> String {
        let base = Self::base_slug(text);
        match self.seen.get_mut(&base) {
            None => {
                self.seen.insert(base.clone(), 0);
                base
            }
            Some(count) => {
                *count += 1;
                format!("{base}~{count}")
            }
        }
    }

    fn base_slug(text: &str) -> String {
        let mut slug = String::new();
        let mut last_was_hyphen = true; // suppress leading hyphen
        for ch in text.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_was_hyphen = false;
            } else if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str("item");
        }
        slug
    }
}

/// The kind component of a `sunwell:` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriKind {
    /// A procedural-memory lens.
    Lens,
    /// A configuration binding.
    Binding,
    /// A project namespace root.
    Project,
}

impl std::fmt::Display for UriKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UriKind::Lens => "lens",
            UriKind::Binding => "binding",
            UriKind::Project => "project",
        };
        write!(f, "{s}")
    }
}

/// A parsed `sunwell:<kind>/<namespace>/<slug>` identity URI (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunwellUri {
    /// The resource kind.
    pub kind: UriKind,
    /// `global` or a project slug.
    pub namespace: String,
    /// `[a-z0-9][a-z0-9-]{0,29}` optionally followed by `~<digits>`.
    pub slug: String,
}

impl std::fmt::Display for SunwellUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sunwell:{}/{}/{}", self.kind, self.namespace, self.slug)
    }
}

impl SunwellUri {
    /// Build a URI from parts.
    #[must_use]
    pub fn new(kind: UriKind, namespace: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            slug: slug.into(),
        }
    }

    /// Parse a `sunwell:<kind>/<namespace>/<slug>` string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix("sunwell:")?;
        let mut parts = rest.splitn(3, '/');
        let kind = match parts.next()? {
            "lens" => UriKind::Lens,
            "binding" => UriKind::Binding,
            "project" => UriKind::Project,
            _ => return None,
        };
        let namespace = parts.next()?.to_string();
        let slug = parts.next()?.to_string();
        if namespace.is_empty() || slug.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            namespace,
            slug,
        })
    }
}
