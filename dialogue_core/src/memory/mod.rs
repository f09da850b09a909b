//! Episodic Memory Store - short/long-term items, topic clusters, emotional
//! scoring, and a time-based forgetting curve.
//!
//! Memory identity is the content string: re-adding identical content
//! reinforces the existing item instead of storing a duplicate. The store is
//! independent of the word graph; it shares only the decay philosophy.

mod cluster;

pub use cluster::*;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use word_graph::similarity::tokenize;

/// Shared decay constant for both tiers.
pub const DEFAULT_FORGETTING_RATE: f32 = 0.05;

/// Minimum retrieval score for inclusion in similarity results.
pub const MIN_RETRIEVAL_SCORE: f32 = 2.0;

/// Affinity a memory must reach to join an existing cluster.
pub const CLUSTER_JOIN_THRESHOLD: f32 = 1.5;

/// Short-term / long-term classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTier {
    ShortTerm,
    LongTerm,
}

/// Keyword bucket a memory falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemoryCategory {
    Tech,
    Health,
    Education,
    Daily,
    Emotional,
    #[default]
    General,
}

/// One remembered utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub content: String,
    pub timestamp: DateTime<Utc>,

    /// In [0, 100]; starts at 100, decays, boosted on reinforcement.
    pub relevance: f32,

    pub tier: MemoryTier,

    /// Free-form associated content strings.
    pub related: Vec<String>,

    pub context: Option<String>,

    /// In [-100, 100], from fixed keyword lists.
    pub emotional_score: f32,

    /// Content strings of similar memories found at creation.
    pub connections: Vec<String>,

    pub category: MemoryCategory,

    pub learning_count: u32,
}

impl Memory {
    /// Create a memory, deriving emotional score and category from content.
    pub fn new(content: impl Into<String>, tier: MemoryTier, now: DateTime<Utc>) -> Self {
        let content = content.into();
        Self {
            emotional_score: emotional_score(&content),
            category: categorize(&content),
            content,
            timestamp: now,
            relevance: 100.0,
            tier,
            related: Vec::new(),
            context: None,
            connections: Vec::new(),
            learning_count: 0,
        }
    }

    /// Boost relevance and the learning count.
    pub fn reinforce(&mut self, amount: f32) {
        self.relevance = (self.relevance + amount).clamp(0.0, 100.0);
        self.learning_count += 1;
    }

    /// Days since this memory was created.
    pub fn age_days(&self, now: DateTime<Utc>) -> f32 {
        (now - self.timestamp).num_seconds().max(0) as f32 / 86_400.0
    }

    /// Whether this memory qualifies for short-to-long promotion.
    pub fn promotable(&self, now: DateTime<Utc>) -> bool {
        self.age_days(now) > 1.0 && (self.relevance > 50.0 || self.learning_count > 2)
    }
}

/// Signed emotional score from fixed Turkish keyword lists, ±10 per match.
pub fn emotional_score(content: &str) -> f32 {
    const POSITIVE: [&str; 10] = [
        "mutlu", "güzel", "harika", "sevindim", "başardım", "teşekkür", "sevgi", "keyif",
        "mükemmel", "iyi",
    ];
    const NEGATIVE: [&str; 10] = [
        "üzgün", "kötü", "korkunç", "sinirli", "kaybettim", "hata", "yorgun", "endişe",
        "berbat", "ağladım",
    ];

    let lower = content.to_lowercase();
    let mut score: f32 = 0.0;
    for word in POSITIVE {
        if lower.contains(word) {
            score += 10.0;
        }
    }
    for word in NEGATIVE {
        if lower.contains(word) {
            score -= 10.0;
        }
    }
    score.clamp(-100.0, 100.0)
}

/// Fixed keyword buckets.
pub fn categorize(content: &str) -> MemoryCategory {
    const BUCKETS: [(&[&str], MemoryCategory); 5] = [
        (
            &["bilgisayar", "telefon", "internet", "yazılım", "teknoloji", "uygulama"],
            MemoryCategory::Tech,
        ),
        (
            &["sağlık", "doktor", "hastane", "ilaç", "spor", "egzersiz"],
            MemoryCategory::Health,
        ),
        (
            &["okul", "ders", "öğren", "kitap", "sınav", "ödev"],
            MemoryCategory::Education,
        ),
        (
            &["yemek", "uyku", "alışveriş", "hava", "kahvaltı", "akşam"],
            MemoryCategory::Daily,
        ),
        (
            &["mutlu", "üzgün", "sevgi", "korku", "heyecan", "özledim"],
            MemoryCategory::Emotional,
        ),
    ];

    let lower = content.to_lowercase();
    for (keywords, category) in BUCKETS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return category;
        }
    }
    MemoryCategory::General
}

/// Capacities and decay tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub short_capacity: usize,
    pub long_capacity: usize,
    pub forgetting_rate: f32,
    pub cluster_capacity: usize,
    pub cluster_join_threshold: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_capacity: 50,
            long_capacity: 200,
            forgetting_rate: DEFAULT_FORGETTING_RATE,
            cluster_capacity: 10,
            cluster_join_threshold: CLUSTER_JOIN_THRESHOLD,
        }
    }
}

/// Aggregate memory counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct MemoryStats {
    pub short_term: usize,
    pub long_term: usize,
    pub clusters: usize,
}

/// The episodic store: two tiers plus topic clusters.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemoryStore {
    short_term: Vec<Memory>,
    long_term: Vec<Memory>,
    clusters: Vec<MemoryCluster>,
    #[serde(default)]
    config: MemoryConfig,
}

impl MemoryStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create an empty store with the given configuration.
    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            short_term: Vec::new(),
            long_term: Vec::new(),
            clusters: Vec::new(),
            config,
        }
    }

    /// Add a memory, or reinforce the one already holding this content.
    ///
    /// New memories get up to three similar existing contents recorded as
    /// connections, are routed into a cluster, and may trigger capacity
    /// eviction of their tier.
    pub fn add_memory(
        &mut self,
        content: &str,
        tier: MemoryTier,
        related: Vec<String>,
        context: Option<String>,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> Memory {
        let content = content.trim();

        // Same content, same logical memory.
        if let Some(memory) = self.find_by_content_mut(content) {
            memory.reinforce(10.0);
            return memory.clone();
        }

        let connections: Vec<String> = self
            .find_similar(content, 3, now)
            .into_iter()
            .map(|m| m.content.clone())
            .collect();

        let mut memory = Memory::new(content, tier, now);
        memory.related = related;
        memory.context = context;
        memory.connections = connections;
        let snapshot = memory.clone();

        match tier {
            MemoryTier::ShortTerm => {
                self.short_term.push(memory);
                if self.short_term.len() > self.config.short_capacity {
                    self.process_short_term(now);
                }
            }
            MemoryTier::LongTerm => {
                self.long_term.push(memory);
                if self.long_term.len() > self.config.long_capacity {
                    self.evict_long_term(now);
                }
            }
        }

        self.update_clusters(content, rng, now);
        snapshot
    }

    fn find_by_content(&self, content: &str) -> Option<&Memory> {
        self.short_term
            .iter()
            .chain(self.long_term.iter())
            .find(|m| m.content == content)
    }

    fn find_by_content_mut(&mut self, content: &str) -> Option<&mut Memory> {
        self.short_term
            .iter_mut()
            .chain(self.long_term.iter_mut())
            .find(|m| m.content == content)
    }

    /// Memories similar to `content`, best first, capped at `limit`.
    ///
    /// Blends token overlap, recency, stored relevance, and category match;
    /// items below the minimum score are excluded.
    pub fn find_similar(&self, content: &str, limit: usize, now: DateTime<Utc>) -> Vec<&Memory> {
        let query_category = categorize(content);
        let mut scored: Vec<(f32, &Memory)> = self
            .short_term
            .iter()
            .chain(self.long_term.iter())
            .filter_map(|m| {
                let score = retrieval_score(m, content, query_category, now);
                (score >= MIN_RETRIEVAL_SCORE).then_some((score, m))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(limit).map(|(_, m)| m).collect()
    }

    /// Contextual retrieval: similarity blended with cluster membership and
    /// connection overlap. Reinforces what it returns.
    pub fn get_contextual(&mut self, query: &str, limit: usize, now: DateTime<Utc>) -> Vec<Memory> {
        let query_category = categorize(query);
        let query_tokens = tokenize(query);

        let mut scored: Vec<(f32, String)> = Vec::new();
        for memory in self.short_term.iter().chain(self.long_term.iter()) {
            let mut score = retrieval_score(memory, query, query_category, now);

            if self
                .clusters
                .iter()
                .any(|c| c.contains(&memory.content) && c.topic_matches(query))
            {
                score += 2.0;
            }
            for connection in &memory.connections {
                let connection_tokens = tokenize(connection);
                if query_tokens.iter().any(|t| connection_tokens.contains(t)) {
                    score += 1.0;
                }
            }

            if score >= MIN_RETRIEVAL_SCORE {
                scored.push((score, memory.content.clone()));
            }
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut results = Vec::new();
        for (_, content) in scored.into_iter().take(limit) {
            if let Some(memory) = self.find_by_content_mut(&content) {
                memory.reinforce(5.0);
                results.push(memory.clone());
            }
        }
        results
    }

    /// Boost the memory holding `content`. Returns false when unknown.
    pub fn reinforce(&mut self, content: &str, amount: f32) -> bool {
        match self.find_by_content_mut(content.trim()) {
            Some(memory) => {
                memory.reinforce(amount);
                true
            }
            None => false,
        }
    }

    /// Promotion sweep: move qualifying short-term memories to long-term.
    pub fn consolidate(&mut self, now: DateTime<Utc>) {
        let mut index = 0;
        while index < self.short_term.len() {
            if self.short_term[index].promotable(now) {
                let mut memory = self.short_term.remove(index);
                memory.tier = MemoryTier::LongTerm;
                self.long_term.push(memory);
            } else {
                index += 1;
            }
        }
        while self.long_term.len() > self.config.long_capacity {
            self.evict_long_term(now);
        }
    }

    /// Over-capacity handling for short-term: promote the best old candidate
    /// if one qualifies, otherwise drop the least relevant item.
    fn process_short_term(&mut self, now: DateTime<Utc>) {
        let candidate = self
            .short_term
            .iter()
            .enumerate()
            .filter(|(_, m)| m.promotable(now))
            .min_by(|(_, a), (_, b)| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then(b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal))
            })
            .map(|(i, _)| i);

        if let Some(index) = candidate {
            let mut memory = self.short_term.remove(index);
            memory.tier = MemoryTier::LongTerm;
            self.long_term.push(memory);
            if self.long_term.len() > self.config.long_capacity {
                self.evict_long_term(now);
            }
        } else if let Some(index) = self
            .short_term
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.relevance
                    .partial_cmp(&b.relevance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
        {
            let _ = self.short_term.remove(index);
        }
    }

    /// Drop the long-term item with the lowest age-discounted relevance.
    fn evict_long_term(&mut self, now: DateTime<Utc>) {
        if let Some(index) = self
            .long_term
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let score_a = a.relevance / (1.0 + a.age_days(now));
                let score_b = b.relevance / (1.0 + b.age_days(now));
                score_a.partial_cmp(&score_b).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
        {
            let _ = self.long_term.remove(index);
        }
    }

    /// The forgetting curve. Relevance floors at 0; decay alone never
    /// deletes an item.
    pub fn apply_forgetting(&mut self, now: DateTime<Utc>) {
        let rate = self.config.forgetting_rate;
        for memory in &mut self.short_term {
            let days = memory.age_days(now);
            if days > 1.0 {
                memory.relevance = (memory.relevance - 2.0 * rate * (days - 1.0)).max(0.0);
            }
        }
        for memory in &mut self.long_term {
            let days = memory.age_days(now);
            if days > 7.0 {
                let slowed = rate / (memory.learning_count.max(1) as f32);
                memory.relevance = (memory.relevance - slowed * (days - 7.0)).max(0.0);
            }
        }
    }

    /// Short reminder strings from the strongest long-term memories.
    pub fn daily_reminders(&self) -> Vec<String> {
        let mut strongest: Vec<&Memory> = self
            .long_term
            .iter()
            .filter(|m| m.relevance >= 70.0)
            .collect();
        strongest.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        strongest
            .into_iter()
            .take(3)
            .map(|m| format!("Hatırlatma: {}", m.content))
            .collect()
    }

    /// Route a new memory into the best cluster, or seed a new one.
    fn update_clusters(&mut self, content: &str, rng: &mut impl Rng, now: DateTime<Utc>) {
        let best = self
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (c.affinity(content), i))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((score, index)) if score >= self.config.cluster_join_threshold => {
                self.clusters[index].join(content, now);
                let over = self.clusters[index]
                    .memories
                    .len()
                    .saturating_sub(self.config.cluster_capacity);
                if over > 0 {
                    let members = self.clusters[index].memories.clone();
                    let evict = self.least_relevant_of(&members, over);
                    self.clusters[index].memories.retain(|m| !evict.contains(m));
                }
            }
            _ => {
                if let Some(cluster) = MemoryCluster::seed(content, rng, now) {
                    self.clusters.push(cluster);
                }
            }
        }
    }

    /// The `count` members with the lowest stored relevance (unknown
    /// contents count as zero).
    fn least_relevant_of(&self, contents: &[String], count: usize) -> Vec<String> {
        let mut scored: Vec<(f32, &String)> = contents
            .iter()
            .map(|c| {
                let relevance = self.find_by_content(c).map_or(0.0, |m| m.relevance);
                (relevance, c)
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(count).map(|(_, c)| c.clone()).collect()
    }

    /// Iterate short-term memories, oldest first.
    pub fn short_term(&self) -> &[Memory] {
        &self.short_term
    }

    /// Iterate long-term memories.
    pub fn long_term(&self) -> &[Memory] {
        &self.long_term
    }

    /// The current clusters.
    pub fn clusters(&self) -> &[MemoryCluster] {
        &self.clusters
    }

    /// Aggregate counts.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            short_term: self.short_term.len(),
            long_term: self.long_term.len(),
            clusters: self.clusters.len(),
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.short_term.clear();
        self.long_term.clear();
        self.clusters.clear();
    }
}

/// Blended similarity score: token overlap, recency, relevance, category.
fn retrieval_score(
    memory: &Memory,
    query: &str,
    query_category: MemoryCategory,
    now: DateTime<Utc>,
) -> f32 {
    let query_tokens = tokenize(query);
    let memory_tokens = tokenize(&memory.content);

    let mut score = 0.0;
    for qt in &query_tokens {
        for mt in &memory_tokens {
            if qt == mt {
                score += 2.0;
            } else if qt.contains(mt.as_str()) || mt.contains(qt.as_str()) {
                score += 1.0;
            }
        }
    }

    let age_hours = (now - memory.timestamp).num_seconds().max(0) as f32 / 3600.0;
    score += (1.0 - age_hours / 24.0).max(0.0) * 3.0;
    score += memory.relevance * 0.05;
    if memory.category == query_category {
        score += 2.0;
    }
    score
}
