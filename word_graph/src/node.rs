//! Word node definitions - the vertices of the associative graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::similarity::fold_turkish;

/// How many past activation values a node remembers.
pub const ACTIVATION_HISTORY_LIMIT: usize = 20;

/// Activation assigned to a freshly created node.
pub const INITIAL_ACTIVATION: f32 = 0.8;

/// How much a reinforcement bumps activation toward 1.0.
pub const REINFORCE_ACTIVATION_STEP: f32 = 0.1;

/// Initial weight of a fresh parent/child connection.
pub const INITIAL_CONNECTION_WEIGHT: f32 = 0.5;

/// How much an existing connection strengthens on re-linking.
pub const CONNECTION_WEIGHT_STEP: f32 = 0.1;

/// Length of the display-only semantic vector.
pub const SEMANTIC_VECTOR_LEN: usize = 8;

/// Unique identifier for word nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the graph a node lives on.
///
/// A word is unique per side: "merhaba" seen in user input and "merhaba"
/// produced in a response are distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Words seen in user input.
    Input,
    /// Words produced in system output.
    Output,
}

/// Coarse part-of-speech-like tag derived from suffix/keyword heuristics.
///
/// Descriptive only - propagation does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WordCategory {
    Verb,
    Adjective,
    Question,
    Pronoun,
    #[default]
    General,
}

/// One occurrence-class of a word on one side of the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordNode {
    pub id: NodeId,

    /// Case-preserving display form; matching is case-insensitive.
    pub word: String,

    pub side: Side,

    /// Layer index within the side's grid. Affects placement capacity only.
    pub layer: usize,

    /// Current spreading-activation level in [0, 1].
    pub activation: f32,

    /// Bounded log of past activation values, oldest first.
    pub activation_history: Vec<f32>,

    /// Times this word has been reinforced.
    pub count: u32,

    /// Neighboring node ids, undirected for traversal.
    pub connections: HashSet<NodeId>,

    /// Per-neighbor edge weight in [0, 1].
    pub connection_strengths: HashMap<NodeId, f32>,

    /// Words that caused this node to be created. Provenance only.
    pub parent_words: Vec<String>,

    pub category: WordCategory,

    /// Keyword-based sentiment in [-1, 1].
    pub sentiment: f32,

    /// Display weight, grows slowly with reinforcement.
    pub importance: f32,

    /// Deterministic pseudo-random vector seeded by the word's characters.
    /// Display only - NOT a real embedding.
    pub semantic_vector: Vec<f32>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub last_activation_at: DateTime<Utc>,
}

impl WordNode {
    /// Create a new node for a first-seen word.
    pub fn new(word: impl Into<String>, side: Side, layer: usize, now: DateTime<Utc>) -> Self {
        let word = word.into();
        Self {
            id: NodeId::new(),
            category: derive_category(&word),
            sentiment: derive_sentiment(&word),
            semantic_vector: derive_semantic_vector(&word),
            word,
            side,
            layer,
            activation: INITIAL_ACTIVATION,
            activation_history: vec![INITIAL_ACTIVATION],
            count: 1,
            connections: HashSet::new(),
            connection_strengths: HashMap::new(),
            parent_words: Vec::new(),
            importance: 0.5,
            created_at: now,
            modified_at: now,
            last_activation_at: now,
        }
    }

    /// The case-insensitive lookup key for this node's word.
    pub fn key(&self) -> String {
        self.word.to_lowercase()
    }

    /// Reinforce the node on a repeat occurrence: bump count and push
    /// activation toward 1.0.
    pub fn reinforce(&mut self, now: DateTime<Utc>) {
        self.count += 1;
        self.importance = (self.importance + 0.02).min(1.0);
        let bumped = (self.activation + REINFORCE_ACTIVATION_STEP).min(1.0);
        self.set_activation(bumped, now);
    }

    /// Record a new activation value, appending to the bounded history.
    pub fn set_activation(&mut self, value: f32, now: DateTime<Utc>) {
        self.activation = value.clamp(0.0, 1.0);
        self.activation_history.push(self.activation);
        if self.activation_history.len() > ACTIVATION_HISTORY_LIMIT {
            let overflow = self.activation_history.len() - ACTIVATION_HISTORY_LIMIT;
            self.activation_history.drain(..overflow);
        }
        self.last_activation_at = now;
        self.modified_at = now;
    }

    /// Add or strengthen an undirected edge to a neighbor.
    pub fn connect(&mut self, neighbor: NodeId) {
        let _ = self.connections.insert(neighbor);
        let weight = self
            .connection_strengths
            .entry(neighbor)
            .or_insert(INITIAL_CONNECTION_WEIGHT - CONNECTION_WEIGHT_STEP);
        *weight = (*weight + CONNECTION_WEIGHT_STEP).min(1.0);
    }

    /// Drop all edges to a neighbor (used by capacity eviction).
    pub fn disconnect(&mut self, neighbor: NodeId) {
        let _ = self.connections.remove(&neighbor);
        let _ = self.connection_strengths.remove(&neighbor);
    }

    /// Record that `parent` caused or re-triggered this node.
    pub fn record_parent(&mut self, parent: &str) {
        if !self.parent_words.iter().any(|p| p.eq_ignore_ascii_case(parent)) {
            self.parent_words.push(parent.to_string());
        }
    }
}

/// Derive a coarse category from Turkish suffix/keyword heuristics.
pub fn derive_category(word: &str) -> WordCategory {
    let w = fold_turkish(word);
    const QUESTIONS: [&str; 7] = ["ne", "nedir", "nasıl", "neden", "kim", "nerede", "niçin"];
    const PRONOUNS: [&str; 6] = ["ben", "sen", "o", "biz", "siz", "onlar"];

    if QUESTIONS.contains(&w.as_str()) {
        WordCategory::Question
    } else if PRONOUNS.contains(&w.as_str()) {
        WordCategory::Pronoun
    } else if w.ends_with("mek") || w.ends_with("mak") || w.ends_with("yor") {
        WordCategory::Verb
    } else if w.ends_with("lı")
        || w.ends_with("li")
        || w.ends_with("lu")
        || w.ends_with("lü")
        || w.ends_with("sız")
        || w.ends_with("siz")
    {
        WordCategory::Adjective
    } else {
        WordCategory::General
    }
}

/// Keyword-based sentiment in [-1, 1].
pub fn derive_sentiment(word: &str) -> f32 {
    const POSITIVE: [&str; 8] = [
        "güzel", "iyi", "harika", "mutlu", "sevgi", "teşekkür", "mükemmel", "başarı",
    ];
    const NEGATIVE: [&str; 8] = [
        "kötü", "üzgün", "korkunç", "nefret", "sorun", "hata", "berbat", "kaygı",
    ];

    let w = fold_turkish(word);
    let mut score: f32 = 0.0;
    for p in POSITIVE {
        if w.contains(p) {
            score += 0.5;
        }
    }
    for n in NEGATIVE {
        if w.contains(n) {
            score -= 0.5;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Deterministic pseudo-random vector seeded by the word's characters.
///
/// Uses a small xorshift stream so the same word always yields the same
/// vector. Display only.
pub fn derive_semantic_vector(word: &str) -> Vec<f32> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    for c in fold_turkish(word).chars() {
        state = state.wrapping_mul(31).wrapping_add(c as u64);
    }
    if state == 0 {
        state = 1;
    }
    (0..SEMANTIC_VECTOR_LEN)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f32 / 1000.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = WordNode::new("Merhaba", Side::Input, 0, Utc::now());
        assert_eq!(node.word, "Merhaba");
        assert_eq!(node.key(), "merhaba");
        assert_eq!(node.count, 1);
        assert!((node.activation - INITIAL_ACTIVATION).abs() < f32::EPSILON);
        assert_eq!(node.semantic_vector.len(), SEMANTIC_VECTOR_LEN);
    }

    #[test]
    fn test_reinforce_bumps_activation_capped() {
        let now = Utc::now();
        let mut node = WordNode::new("test", Side::Input, 0, now);
        for _ in 0..10 {
            node.reinforce(now);
        }
        assert_eq!(node.count, 11);
        assert!(node.activation <= 1.0);
        assert!((node.activation - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_activation_history_bounded() {
        let now = Utc::now();
        let mut node = WordNode::new("test", Side::Input, 0, now);
        for i in 0..50 {
            node.set_activation(i as f32 / 50.0, now);
        }
        assert_eq!(node.activation_history.len(), ACTIVATION_HISTORY_LIMIT);
    }

    #[test]
    fn test_connect_strengthens_existing() {
        let now = Utc::now();
        let mut node = WordNode::new("a", Side::Input, 0, now);
        let other = NodeId::new();

        node.connect(other);
        let first = node.connection_strengths[&other];
        node.connect(other);
        let second = node.connection_strengths[&other];

        assert_eq!(node.connections.len(), 1);
        assert!(second > first);
        assert!(second <= 1.0);
    }

    #[test]
    fn test_category_heuristics() {
        assert_eq!(derive_category("gitmek"), WordCategory::Verb);
        assert_eq!(derive_category("akıllı"), WordCategory::Adjective);
        assert_eq!(derive_category("nedir"), WordCategory::Question);
        assert_eq!(derive_category("ben"), WordCategory::Pronoun);
        assert_eq!(derive_category("Ankara"), WordCategory::General);
    }

    #[test]
    fn test_sentiment_keywords() {
        assert!(derive_sentiment("güzel") > 0.0);
        assert!(derive_sentiment("kötü") < 0.0);
        assert_eq!(derive_sentiment("masa"), 0.0);
    }

    #[test]
    fn test_semantic_vector_deterministic() {
        assert_eq!(derive_semantic_vector("kedi"), derive_semantic_vector("KEDİ"));
        assert_ne!(derive_semantic_vector("kedi"), derive_semantic_vector("köpek"));
        for v in derive_semantic_vector("kedi") {
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_record_parent_no_duplicates() {
        let mut node = WordNode::new("child", Side::Input, 0, Utc::now());
        node.record_parent("anne");
        node.record_parent("Anne");
        assert_eq!(node.parent_words.len(), 1);
    }
}
