//! Training corpus - the verbatim (input, output) exemplars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for training pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairId(pub Uuid);

impl PairId {
    /// Create a new random pair ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PairId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One verbatim training exemplar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPair {
    pub id: PairId,
    pub input: String,
    pub output: String,
    pub created_at: DateTime<Utc>,

    /// Times the synthesizer selected this pair.
    pub usage_count: u32,

    pub category: Option<String>,
    pub tags: Vec<String>,
    pub score: f32,
}

impl TrainingPair {
    /// Create a new pair.
    pub fn new(input: impl Into<String>, output: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: PairId::new(),
            input: input.into(),
            output: output.into(),
            created_at: now,
            usage_count: 0,
            category: None,
            tags: Vec::new(),
            score: 0.0,
        }
    }

    /// Set the optional category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add free-form tags.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }
}

/// Append-only list of training pairs. Duplicates are allowed; callers
/// dedup if they care.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrainingCorpus {
    pairs: Vec<TrainingPair>,
}

impl TrainingCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair and return its id.
    pub fn add(&mut self, input: impl Into<String>, output: impl Into<String>, now: DateTime<Utc>) -> PairId {
        let pair = TrainingPair::new(input, output, now);
        let id = pair.id;
        self.pairs.push(pair);
        id
    }

    /// Append an already-built pair.
    pub fn push(&mut self, pair: TrainingPair) -> PairId {
        let id = pair.id;
        self.pairs.push(pair);
        id
    }

    /// Get a pair by id.
    pub fn get(&self, id: PairId) -> Option<&TrainingPair> {
        self.pairs.iter().find(|p| p.id == id)
    }

    /// Increment a pair's usage count. Returns false for unknown ids.
    pub fn record_usage(&mut self, id: PairId) -> bool {
        if let Some(pair) = self.pairs.iter_mut().find(|p| p.id == id) {
            pair.usage_count += 1;
            true
        } else {
            false
        }
    }

    /// Iterate over all pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrainingPair> {
        self.pairs.iter()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
