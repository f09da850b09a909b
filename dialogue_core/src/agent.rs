//! The dialogue agent - owns all state and orchestrates training, querying,
//! feedback, and maintenance.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use word_graph::{
    similarity::tokenize, PairId, RelationLedger, Side, TrainingCorpus, WordGrid, REINFORCE_STEP,
};

use crate::memory::{MemoryConfig, MemoryStats, MemoryStore, MemoryTier};
use crate::propagation::{ActivationResult, PropagationConfig, PropagationEngine};
use crate::search::SearchProvider;
use crate::snapshot::{Snapshot, SNAPSHOT_VERSION};
use crate::synthesizer::ResponseSynthesizer;
use crate::trainer::{
    BatchTrainer, TrainingReport, TrainingStats, DEFAULT_BIDIRECTIONAL_RATE,
};

/// Default daily decay factor applied to unused relations.
pub const DEFAULT_RELATION_DECAY: f32 = 2.0;

/// Tuning knobs for a whole agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub propagation: PropagationConfig,
    pub memory: MemoryConfig,

    /// Sampling rate for reverse-traversable relations during training.
    pub bidirectional_rate: f32,

    /// Daily decay factor passed to the relation weaken sweep.
    pub relation_decay: f32,

    /// Fixed RNG seed; None draws from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            propagation: PropagationConfig::default(),
            memory: MemoryConfig::default(),
            bidirectional_rate: DEFAULT_BIDIRECTIONAL_RATE,
            relation_decay: DEFAULT_RELATION_DECAY,
            rng_seed: None,
        }
    }
}

/// What a query produced, with the full activation trace attached.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub response: String,
    /// In [0, 1].
    pub confidence: f32,
    pub used_training: Option<PairId>,
    pub activation: ActivationResult,
}

/// What a maintenance sweep did.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceReport {
    pub relations_weakened: usize,
    pub memory: MemoryStats,
}

/// A self-contained dialogue agent over the two-sided word graph.
pub struct DialogueAgent {
    input_grid: WordGrid,
    output_grid: WordGrid,
    ledger: RelationLedger,
    corpus: TrainingCorpus,
    memory: MemoryStore,
    engine: PropagationEngine,
    synthesizer: ResponseSynthesizer,
    trainer: BatchTrainer,
    rng: StdRng,
    config: AgentConfig,
    training_count: u64,
    last_training_at: Option<DateTime<Utc>>,
    last_used_pair: Option<PairId>,
}

impl Default for DialogueAgent {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

impl DialogueAgent {
    /// Create an empty agent.
    pub fn new(config: AgentConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            input_grid: WordGrid::new(Side::Input),
            output_grid: WordGrid::new(Side::Output),
            ledger: RelationLedger::new(),
            corpus: TrainingCorpus::new(),
            memory: MemoryStore::with_config(config.memory.clone()),
            engine: PropagationEngine::new(config.propagation.clone()),
            synthesizer: ResponseSynthesizer::new(),
            trainer: BatchTrainer::new(config.bidirectional_rate),
            rng,
            config,
            training_count: 0,
            last_training_at: None,
            last_used_pair: None,
        }
    }

    /// Learn a single (input, output) pair immediately.
    pub fn train_one(&mut self, input: &str, output: &str, now: DateTime<Utc>) -> TrainingReport {
        let report = self.trainer.train_one(
            &mut self.input_grid,
            &mut self.output_grid,
            &mut self.ledger,
            &mut self.corpus,
            input,
            output,
            &mut self.rng,
            now,
        );
        if report.trained > 0 {
            self.training_count += report.trained as u64;
            self.last_training_at = Some(now);
        }
        report
    }

    /// Learn a batch of pairs. The live state is replaced only after the
    /// whole batch has been trained into a working copy.
    pub fn train_batch(&mut self, pairs: &[(String, String)], now: DateTime<Utc>) -> TrainingReport {
        let (workspace, report) = self.trainer.train_batch(
            &self.input_grid,
            &self.output_grid,
            &self.ledger,
            &self.corpus,
            pairs,
            &mut self.rng,
            now,
        );
        self.input_grid = workspace.input_grid;
        self.output_grid = workspace.output_grid;
        self.ledger = workspace.ledger;
        self.corpus = workspace.corpus;
        if report.trained > 0 {
            self.training_count += report.trained as u64;
            self.last_training_at = Some(now);
        }
        info!(
            trained = report.trained,
            skipped = report.skipped,
            "batch committed"
        );
        report
    }

    /// Answer an utterance: propagate, synthesize, reinforce what was used,
    /// and remember the exchange.
    pub fn query(&mut self, utterance: &str, now: DateTime<Utc>) -> QueryOutcome {
        let activation = self.engine.propagate(
            &mut self.input_grid,
            &mut self.output_grid,
            &self.ledger,
            utterance,
            now,
        );
        let output =
            self.synthesizer
                .respond(&activation, &mut self.corpus, utterance, &mut self.rng);

        self.finish_query(utterance, output.response, output.confidence, output.used_training, activation, now)
    }

    /// Like [`query`](Self::query), but consults an external search provider
    /// when nothing in the graph activated.
    pub fn query_with_search(
        &mut self,
        utterance: &str,
        provider: &dyn SearchProvider,
        now: DateTime<Utc>,
    ) -> QueryOutcome {
        let activation = self.engine.propagate(
            &mut self.input_grid,
            &mut self.output_grid,
            &self.ledger,
            utterance,
            now,
        );

        if activation.primary_concepts.is_empty() {
            if let Some(hit) = provider.search(utterance).into_iter().next() {
                debug!(title = %hit.title, "answering from external search");
                let response = hit.content.trim().to_string();
                if !response.is_empty() {
                    // Learn the found answer so the next ask is local.
                    let _ = self.train_one(utterance, &response, now);
                    let confidence = hit.relevance.clamp(0.3, 0.9);
                    return self.finish_query(utterance, response, confidence, None, activation, now);
                }
            }
        }

        let output =
            self.synthesizer
                .respond(&activation, &mut self.corpus, utterance, &mut self.rng);
        self.finish_query(utterance, output.response, output.confidence, output.used_training, activation, now)
    }

    fn finish_query(
        &mut self,
        utterance: &str,
        response: String,
        confidence: f32,
        used_training: Option<PairId>,
        activation: ActivationResult,
        now: DateTime<Utc>,
    ) -> QueryOutcome {
        if let Some(pair_id) = used_training {
            if let Some(pair) = self.corpus.get(pair_id) {
                let sources = tokenize(&pair.input);
                let targets = tokenize(&pair.output);
                let _ = self
                    .ledger
                    .reinforce_pairs(&sources, &targets, REINFORCE_STEP, now);
            }
        }
        self.last_used_pair = used_training;

        let _ = self.memory.add_memory(
            utterance,
            MemoryTier::ShortTerm,
            activation.primary_concepts.clone(),
            Some(response.clone()),
            &mut self.rng,
            now,
        );

        QueryOutcome {
            response,
            confidence,
            used_training,
            activation,
        }
    }

    /// Apply user feedback on an exchange to the relations between its
    /// words and to the relations of the pair that answered the last query.
    /// Positive deltas also reinforce the remembered utterance.
    pub fn feedback(&mut self, utterance: &str, response: &str, delta: f32, now: DateTime<Utc>) -> usize {
        let sources = tokenize(utterance);
        let targets = tokenize(response);
        let mut touched = self.ledger.apply_feedback(&sources, &targets, delta, now);

        if let Some(pair) = self.last_used_pair.and_then(|id| self.corpus.get(id)) {
            let pair_sources = tokenize(&pair.input);
            let pair_targets = tokenize(&pair.output);
            if pair_sources != sources || pair_targets != targets {
                touched += self
                    .ledger
                    .apply_feedback(&pair_sources, &pair_targets, delta, now);
            }
        }

        let _ = self.memory.reinforce(utterance, delta / 10.0);
        touched
    }

    /// Periodic upkeep: decay unused relations, run the forgetting curve,
    /// and promote eligible short-term memories.
    pub fn maintain(&mut self, now: DateTime<Utc>) -> MaintenanceReport {
        let relations_weakened = self.ledger.weaken_all(self.config.relation_decay, now);
        self.memory.apply_forgetting(now);
        self.memory.consolidate(now);
        let report = MaintenanceReport {
            relations_weakened,
            memory: self.memory.stats(),
        };
        debug!(weakened = relations_weakened, "maintenance sweep");
        report
    }

    /// Reminder strings built from the strongest long-term memories.
    pub fn daily_reminders(&self) -> Vec<String> {
        self.memory.daily_reminders()
    }

    /// Capture the full agent state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            input_grid: self.input_grid.clone(),
            output_grid: self.output_grid.clone(),
            ledger: self.ledger.clone(),
            corpus: self.corpus.clone(),
            memory: self.memory.clone(),
            training_count: self.training_count,
            last_training_at: self.last_training_at,
        }
    }

    /// Build an agent from a stored snapshot document. Best-effort: a
    /// document that cannot be decoded yields an empty agent instead of an
    /// error.
    pub fn from_snapshot_json(config: AgentConfig, json: &str) -> Self {
        let mut agent = Self::new(config);
        match Snapshot::from_json(json) {
            Ok(snapshot) => agent.restore(snapshot),
            Err(err) => warn!(%err, "snapshot restore failed, starting empty"),
        }
        agent
    }

    /// Replace the agent's state with a snapshot.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.input_grid = snapshot.input_grid;
        self.output_grid = snapshot.output_grid;
        self.ledger = snapshot.ledger;
        self.corpus = snapshot.corpus;
        self.memory = snapshot.memory;
        self.training_count = snapshot.training_count;
        self.last_training_at = snapshot.last_training_at;
        self.last_used_pair = None;
    }

    /// Aggregate counters.
    pub fn stats(&self) -> TrainingStats {
        TrainingStats {
            input_nodes: self.input_grid.len(),
            output_nodes: self.output_grid.len(),
            relation_count: self.ledger.len(),
            corpus_size: self.corpus.len(),
            training_count: self.training_count,
            last_training_at: self.last_training_at,
        }
    }

    /// The episodic memory store.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// The relation ledger.
    pub fn ledger(&self) -> &RelationLedger {
        &self.ledger
    }

    /// The training corpus.
    pub fn corpus(&self) -> &TrainingCorpus {
        &self.corpus
    }

    /// The pair used to answer the most recent query, if any.
    pub fn last_used_pair(&self) -> Option<PairId> {
        self.last_used_pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{FixedProvider, SearchResult};
    use chrono::Duration;

    fn agent() -> DialogueAgent {
        DialogueAgent::new(AgentConfig {
            rng_seed: Some(42),
            ..Default::default()
        })
    }

    #[test]
    fn test_trained_greeting_is_answered_from_corpus() {
        let now = Utc::now();
        let mut agent = agent();

        let report = agent.train_one("Merhaba", "Merhaba! Nasılsınız?", now);
        assert_eq!(report.trained, 1);

        let outcome = agent.query("Merhaba", now);
        let pair_id = outcome.used_training.expect("corpus pair should be used");
        assert_eq!(agent.corpus().get(pair_id).unwrap().input, "Merhaba");
        assert!(outcome.confidence >= 0.3);
        assert_eq!(agent.last_used_pair(), Some(pair_id));
    }

    #[test]
    fn test_query_reinforces_used_relations() {
        let now = Utc::now();
        let mut agent = agent();
        let _ = agent.train_one("soru", "cevap", now);

        let before = agent.ledger().find("soru", "cevap").unwrap().strength;
        let outcome = agent.query("soru", now);
        assert!(outcome.used_training.is_some());
        assert!(agent.ledger().find("soru", "cevap").unwrap().strength > before);
    }

    #[test]
    fn test_query_records_memory() {
        let now = Utc::now();
        let mut agent = agent();
        let _ = agent.train_one("Merhaba", "Merhaba! Nasılsınız?", now);

        let _ = agent.query("Merhaba", now);
        assert_eq!(agent.memory().stats().short_term, 1);
        assert_eq!(agent.memory().short_term()[0].content, "Merhaba");
    }

    #[test]
    fn test_empty_batch_commits_nothing() {
        let now = Utc::now();
        let mut agent = agent();

        let report = agent.train_batch(&[], now);
        assert_eq!(report.trained, 0);
        assert_eq!(agent.stats().training_count, 0);
        assert!(agent.stats().last_training_at.is_none());
    }

    #[test]
    fn test_batch_updates_counters() {
        let now = Utc::now();
        let mut agent = agent();

        let pairs = vec![
            ("günaydın".to_string(), "günaydın size de".to_string()),
            ("iyi geceler".to_string(), "iyi geceler tatlı rüyalar".to_string()),
        ];
        let report = agent.train_batch(&pairs, now);

        assert_eq!(report.trained, 2);
        assert_eq!(agent.stats().training_count, 2);
        assert_eq!(agent.stats().corpus_size, 2);
        assert!(agent.stats().input_nodes >= 3);
    }

    #[test]
    fn test_unknown_topic_falls_back() {
        let now = Utc::now();
        let mut agent = agent();

        let outcome = agent.query("kuantum dolanıklık", now);
        assert!(outcome.used_training.is_none());
        assert!(!outcome.response.is_empty());
        assert!(outcome.confidence >= 0.3);
    }

    #[test]
    fn test_search_provider_fills_knowledge_gap() {
        let now = Utc::now();
        let mut agent = agent();
        let provider = FixedProvider(vec![SearchResult {
            title: "Kuantum".to_string(),
            content: "Kuantum fiziği atom altı parçacıkları inceler.".to_string(),
            url: None,
            relevance: 0.8,
        }]);

        let outcome = agent.query_with_search("kuantum", &provider, now);
        assert!(outcome.response.contains("Kuantum"));
        assert!((outcome.confidence - 0.8).abs() < 1e-6);
        // The answer was learned.
        assert_eq!(agent.stats().corpus_size, 1);
    }

    #[test]
    fn test_feedback_touches_relations() {
        let now = Utc::now();
        let mut agent = agent();
        let _ = agent.train_one("soru", "cevap", now);

        let touched = agent.feedback("soru", "cevap", 10.0, now);
        assert_eq!(touched, 1);
        assert_eq!(agent.ledger().find("soru", "cevap").unwrap().feedback, 10.0);
    }

    #[test]
    fn test_maintain_decays_and_promotes() {
        let now = Utc::now();
        let mut agent = agent();
        let _ = agent.train_one("eski", "bilgi", now);
        let _ = agent.query("eski", now);

        let later = now + Duration::days(3);
        let report = agent.maintain(later);

        assert!(report.relations_weakened >= 1);
        // The queried utterance was promoted out of short-term.
        assert_eq!(report.memory.short_term, 0);
        assert_eq!(report.memory.long_term, 1);
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        let agent = DialogueAgent::from_snapshot_json(AgentConfig::default(), "{broken");
        assert_eq!(agent.stats().training_count, 0);
        assert_eq!(agent.stats().input_nodes, 0);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let now = Utc::now();
        let mut agent = agent();
        let _ = agent.train_one("Merhaba", "Merhaba! Nasılsınız?", now);

        let json = agent.snapshot().to_json().unwrap();

        let mut restored = DialogueAgent::default();
        restored.restore(Snapshot::from_json(&json).unwrap());

        assert_eq!(restored.stats().training_count, 1);
        let outcome = restored.query("Merhaba", now);
        assert!(outcome.used_training.is_some());
    }
}
