//! Topic clusters - soft groupings of episodic memories.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use word_graph::similarity::tokenize;

/// Minimum character length for a word to seed a cluster topic.
pub const TOPIC_WORD_MIN_LEN: usize = 4;

/// How many words make up an auto-derived topic.
pub const TOPIC_WORD_COUNT: usize = 3;

/// Unique identifier for memory clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub Uuid);

impl ClusterId {
    /// Create a new random cluster ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

/// A soft grouping of memories under a shared topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCluster {
    pub id: ClusterId,

    /// Auto-derived short phrase from member content.
    pub topic: String,

    /// Member memory contents, in join order.
    pub memories: Vec<String>,

    /// Grows with each new member.
    pub strength: f32,

    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl MemoryCluster {
    /// Seed a new cluster from a memory's content. Returns `None` when the
    /// content has fewer than three usable words.
    pub fn seed(content: &str, rng: &mut impl Rng, now: DateTime<Utc>) -> Option<Self> {
        let tokens = tokenize(content);
        if tokens.len() < TOPIC_WORD_COUNT {
            return None;
        }

        let long_words: Vec<&String> = tokens
            .iter()
            .filter(|t| t.chars().count() >= TOPIC_WORD_MIN_LEN)
            .collect();
        let pool: Vec<&String> = if long_words.len() >= TOPIC_WORD_COUNT {
            long_words
        } else {
            tokens.iter().collect()
        };

        let topic = pool
            .choose_multiple(rng, TOPIC_WORD_COUNT)
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            id: ClusterId::new(),
            topic,
            memories: vec![content.to_string()],
            strength: 1.0,
            created_at: now,
            last_accessed_at: now,
        })
    }

    /// How well a memory's content fits this cluster: +1 per token shared
    /// with the topic, +0.5 per member sharing any token with it.
    pub fn affinity(&self, content: &str) -> f32 {
        let tokens = tokenize(content);
        if tokens.is_empty() {
            return 0.0;
        }
        let topic_tokens = tokenize(&self.topic);

        let mut score = 0.0;
        for token in &tokens {
            if topic_tokens.contains(token) {
                score += 1.0;
            }
        }
        for member in &self.memories {
            let member_tokens = tokenize(member);
            if tokens.iter().any(|t| member_tokens.contains(t)) {
                score += 0.5;
            }
        }
        score
    }

    /// Add a member and strengthen the cluster.
    pub fn join(&mut self, content: &str, now: DateTime<Utc>) {
        if !self.memories.iter().any(|m| m == content) {
            self.memories.push(content.to_string());
            self.strength += 0.1;
        }
        self.last_accessed_at = now;
    }

    /// Whether the given content belongs to this cluster.
    pub fn contains(&self, content: &str) -> bool {
        self.memories.iter().any(|m| m == content)
    }

    /// Whether the topic shares any token with `query`.
    pub fn topic_matches(&self, query: &str) -> bool {
        let query_tokens = tokenize(query);
        tokenize(&self.topic).iter().any(|t| query_tokens.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_requires_three_words() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Utc::now();

        assert!(MemoryCluster::seed("sadece iki", &mut rng, now).is_none());
        let cluster = MemoryCluster::seed("bugün yazılım dersi çalıştım", &mut rng, now).unwrap();
        assert_eq!(tokenize(&cluster.topic).len(), TOPIC_WORD_COUNT);
        assert_eq!(cluster.memories.len(), 1);
    }

    #[test]
    fn test_seed_prefers_long_words() {
        let mut rng = StdRng::seed_from_u64(2);
        let cluster =
            MemoryCluster::seed("iki üç yazılım bilgisayar teknoloji", &mut rng, Utc::now())
                .unwrap();
        for word in tokenize(&cluster.topic) {
            assert!(word.chars().count() >= TOPIC_WORD_MIN_LEN, "{word}");
        }
    }

    #[test]
    fn test_affinity_counts_topic_and_members() {
        let mut rng = StdRng::seed_from_u64(3);
        let now = Utc::now();
        let mut cluster =
            MemoryCluster::seed("yazılım projesi bitti bugün", &mut rng, now).unwrap();
        cluster.join("yeni yazılım aracı denedim", now);

        let related = cluster.affinity("yazılım öğreniyorum");
        let unrelated = cluster.affinity("akşam yemeği yedim");
        assert!(related > unrelated);
    }

    #[test]
    fn test_join_grows_strength_once_per_member() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(4);
        let mut cluster = MemoryCluster::seed("spor salonu kayıt oldum", &mut rng, now).unwrap();
        let before = cluster.strength;

        cluster.join("koşu bandı denedim", now);
        cluster.join("koşu bandı denedim", now);

        assert!((cluster.strength - before - 0.1).abs() < 0.001);
        assert_eq!(cluster.memories.len(), 2);
    }
}
