//! Focus model (spec §4.2, C2).
//!
//! A weighted `{topic → weight}` map plus an explicit-set mask that
//! lets retrieval adapt to conversation drift without re-ranking every
//! record on every query.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Initial weight assigned to a newly observed topic.
const INITIAL_TOPIC_WEIGHT: f32 = 0.5;

/// The agent's current attention over topics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Focus {
    weights: HashMap<String, f32>,
    explicit: std::collections::HashSet<String>,
    decay: f32,
}

impl Focus {
    /// Create a focus model with the given per-query decay factor
    /// (spec §9: `focus_decay`, default 0.9).
    #[must_use]
    pub fn new(decay: f32) -> Self {
        Self {
            weights: HashMap::new(),
            explicit: std::collections::HashSet::new(),
            decay,
        }
    }

    /// Tokenize `text`, add new topics at the initial weight, and decay
    /// existing non-explicit topics by the configured factor.
    pub fn update_from_query(&mut self, text: &str) {
        let tokens = tokenize(text);

        for (topic, weight) in &mut self.weights {
            if !self.explicit.contains(topic) {
                *weight *= self.decay;
            }
        }

        for token in tokens {
            self.weights
                .entry(token)
                .or_insert(INITIAL_TOPIC_WEIGHT);
        }
    }

    /// Pin a topic to an explicit weight; it will not decay until
    /// [`Focus::clear_explicit`] is called.
    pub fn set_explicit(&mut self, topic: impl Into<String>, weight: f32) {
        let topic = topic.into();
        self.weights.insert(topic.clone(), weight.clamp(0.0, 1.0));
        self.explicit.insert(topic);
    }

    /// Release a topic from the explicit set, or clear all focus when
    /// `topic` is `None`.
    pub fn clear_explicit(&mut self, topic: Option<&str>) {
        match topic {
            Some(t) => {
                self.explicit.remove(t);
            }
            None => {
                self.weights.clear();
                self.explicit.clear();
            }
        }
    }

    /// Topics whose weight is strictly above `threshold`.
    #[must_use]
    pub fn active_topics(&self, threshold: f32) -> Vec<String> {
        let mut topics: Vec<String> = self
            .weights
            .iter()
            .filter(|(_, &w)| w > threshold)
            .map(|(t, _)| t.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Weight currently assigned to `topic`, or 0.0 if untracked.
    #[must_use]
    pub fn weight_of(&self, topic: &str) -> f32 {
        self.weights.get(topic).copied().unwrap_or(0.0)
    }

    /// Score arbitrary text content (and an optional category/facet
    /// list) by summing the focus weight of every topic found in it.
    /// Deterministic and monotonic in weight.
    #[must_use]
    pub fn score(&self, content: &str, extra_fields: &[&str]) -> f32 {
        let haystack_tokens: std::collections::HashSet<String> = tokenize(content)
            .into_iter()
            .chain(extra_fields.iter().flat_map(|f| tokenize(f)))
            .collect();

        self.weights
            .iter()
            .filter(|(topic, _)| haystack_tokens.contains(*topic))
            .map(|(_, w)| *w)
            .sum()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}
