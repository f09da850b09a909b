//! Relation definitions - weighted, decaying edges between the two sides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default starting weight for dependency and association.
pub const DEFAULT_WEIGHT: f32 = 50.0;

/// Starting weight for sampled bidirectional relations, slightly lower
/// than the primary default.
pub const BIDIRECTIONAL_WEIGHT: f32 = 40.0;

/// Weight added per reinforcement of an existing relation.
pub const REINFORCE_STEP: f32 = 5.0;

/// Largest weight a single weaken sweep may remove.
pub const MAX_DECAY_LOSS: f32 = 15.0;

/// Unique identifier for relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationId(pub Uuid);

impl RelationId {
    /// Create a new random relation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive relation tag. Does not change propagation math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RelationKind {
    #[default]
    Semantic,
    Temporal,
    Causal,
    Hierarchical,
}

/// A directed pairing between an input-side word and an output-side word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,

    /// Input-side word, stored lowercase.
    pub source_word: String,

    /// Output-side word, stored lowercase.
    pub target_word: String,

    /// In [1, 100].
    pub dependency: f32,

    /// In [1, 100].
    pub association: f32,

    /// Average of dependency and association.
    pub strength: f32,

    /// In [0, 1]; grows with `learning_count`.
    pub confidence: f32,

    /// User-supplied signed adjustment in [-100, 100].
    pub feedback: f32,

    pub frequency: u32,

    /// Position of the source word within its utterance at creation time.
    pub order: usize,

    pub bidirectional: bool,

    pub kind: RelationKind,

    pub learning_count: u32,

    /// Source utterances recorded at creation.
    pub context: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Relation {
    /// Create a relation with default weights.
    pub fn new(source: impl Into<String>, target: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: RelationId::new(),
            source_word: source.into().to_lowercase(),
            target_word: target.into().to_lowercase(),
            dependency: DEFAULT_WEIGHT,
            association: DEFAULT_WEIGHT,
            strength: DEFAULT_WEIGHT,
            confidence: 0.5,
            feedback: 0.0,
            frequency: 1,
            order: 1,
            bidirectional: false,
            kind: RelationKind::default(),
            learning_count: 0,
            context: Vec::new(),
            created_at: now,
            last_used_at: now,
        }
    }

    /// Set the starting dependency and association weights.
    pub fn with_weights(mut self, dependency: f32, association: f32) -> Self {
        self.dependency = dependency.clamp(1.0, 100.0);
        self.association = association.clamp(1.0, 100.0);
        self.strength = (self.dependency + self.association) / 2.0;
        self
    }

    /// Set the source word's position within its utterance.
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Set the descriptive relation kind.
    pub fn with_kind(mut self, kind: RelationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the relation as bidirectional.
    pub fn with_bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    /// Record the utterance this relation was learned from.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Reinforce the relation: raise both weights by `amount` (clamped to
    /// [1, 100]), recompute strength and confidence, bump usage metadata.
    pub fn reinforce(&mut self, amount: f32, feedback_delta: Option<f32>, now: DateTime<Utc>) {
        self.dependency = (self.dependency + amount).clamp(1.0, 100.0);
        self.association = (self.association + amount).clamp(1.0, 100.0);
        self.strength = (self.dependency + self.association) / 2.0;
        self.learning_count += 1;
        self.frequency += 1;
        self.last_used_at = now;
        if let Some(delta) = feedback_delta {
            self.feedback = (self.feedback + delta).clamp(-100.0, 100.0);
        }
        self.confidence = (0.5 + self.learning_count as f32 / 20.0).clamp(0.0, 1.0);
    }

    /// Apply time decay if the relation has been unused for more than a day.
    ///
    /// Returns true when any weight changed. Weights floor at 1, confidence
    /// at 0.1; relations are never hard-deleted.
    pub fn weaken(&mut self, decay_factor: f32, now: DateTime<Utc>) -> bool {
        let days_unused = (now - self.last_used_at).num_seconds() as f32 / 86_400.0;
        if days_unused <= 1.0 {
            return false;
        }
        let loss = (decay_factor * days_unused).min(MAX_DECAY_LOSS);
        self.dependency = (self.dependency - loss).max(1.0);
        self.association = (self.association - loss).max(1.0);
        self.strength = (self.strength - loss).max(1.0);
        self.confidence = (self.confidence * (1.0 - loss / 100.0)).max(0.1);
        true
    }
}

/// Holds every relation: the primary directed ledger plus the separate,
/// randomly sparsified bidirectional ledger.
///
/// Invariant: at most one relation per ordered (source, target) pair in each
/// ledger. Re-creation reinforces the existing entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelationLedger {
    primary: Vec<Relation>,
    bidirectional: Vec<Relation>,
}

impl RelationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a relation, or reinforce the entry already covering its
    /// ordered word pair. Routes on the relation's `bidirectional` flag.
    /// Returns the id of the stored relation.
    pub fn upsert(&mut self, relation: Relation, now: DateTime<Utc>) -> RelationId {
        let ledger = if relation.bidirectional {
            &mut self.bidirectional
        } else {
            &mut self.primary
        };

        if let Some(existing) = ledger
            .iter_mut()
            .find(|r| r.source_word == relation.source_word && r.target_word == relation.target_word)
        {
            existing.reinforce(REINFORCE_STEP, None, now);
            for ctx in relation.context {
                if !existing.context.contains(&ctx) {
                    existing.context.push(ctx);
                }
            }
            existing.id
        } else {
            let id = relation.id;
            ledger.push(relation);
            id
        }
    }

    /// Find a primary relation by its ordered word pair.
    pub fn find(&self, source: &str, target: &str) -> Option<&Relation> {
        let (source, target) = (source.to_lowercase(), target.to_lowercase());
        self.primary
            .iter()
            .find(|r| r.source_word == source && r.target_word == target)
    }

    /// Mutable lookup of a primary relation by its ordered word pair.
    pub fn find_mut(&mut self, source: &str, target: &str) -> Option<&mut Relation> {
        let (source, target) = (source.to_lowercase(), target.to_lowercase());
        self.primary
            .iter_mut()
            .find(|r| r.source_word == source && r.target_word == target)
    }

    /// All relations (either ledger) whose source matches `word`.
    pub fn relations_from<'a>(&'a self, word: &str) -> Vec<&'a Relation> {
        let word = word.to_lowercase();
        self.primary
            .iter()
            .chain(self.bidirectional.iter())
            .filter(|r| r.source_word == word)
            .collect()
    }

    /// Bidirectional relations whose target matches `word` (the reverse
    /// traversal direction).
    pub fn reverse_relations_to<'a>(&'a self, word: &str) -> Vec<&'a Relation> {
        let word = word.to_lowercase();
        self.bidirectional
            .iter()
            .filter(|r| r.target_word == word)
            .collect()
    }

    /// Iterate over every relation in both ledgers.
    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.primary.iter().chain(self.bidirectional.iter())
    }

    /// Total relation count across both ledgers.
    pub fn len(&self) -> usize {
        self.primary.len() + self.bidirectional.len()
    }

    /// Whether both ledgers are empty.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.bidirectional.is_empty()
    }

    /// Number of primary relations.
    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    /// Maintenance sweep: decay every relation unused for more than a day.
    /// Returns how many were weakened.
    pub fn weaken_all(&mut self, decay_factor: f32, now: DateTime<Utc>) -> usize {
        self.primary
            .iter_mut()
            .chain(self.bidirectional.iter_mut())
            .map(|r| r.weaken(decay_factor, now))
            .filter(|&weakened| weakened)
            .count()
    }

    /// Reinforce every relation between words of `sources` and `targets`
    /// (the write-back path after a successful corpus match).
    pub fn reinforce_pairs(
        &mut self,
        sources: &[String],
        targets: &[String],
        amount: f32,
        now: DateTime<Utc>,
    ) -> usize {
        let mut touched = 0;
        for source in sources {
            for target in targets {
                if let Some(rel) = self.find_mut(source, target) {
                    rel.reinforce(amount, None, now);
                    touched += 1;
                }
            }
        }
        touched
    }

    /// Apply a signed feedback delta to every relation between the words of
    /// `sources` and `targets`.
    pub fn apply_feedback(
        &mut self,
        sources: &[String],
        targets: &[String],
        delta: f32,
        now: DateTime<Utc>,
    ) -> usize {
        let mut touched = 0;
        for source in sources {
            for target in targets {
                if let Some(rel) = self.find_mut(source, target) {
                    rel.reinforce(0.0, Some(delta), now);
                    touched += 1;
                }
            }
        }
        touched
    }
}
