//! Batch trainer - turns (input, output) exemplars into graph state.
//!
//! Batch training never mutates live state directly: it clones the grids,
//! ledger, and corpus into a workspace, trains into the copy, and hands the
//! workspace back so the caller can swap it in whole. A malformed pair or a
//! full grid layer degrades that one pair, never the batch.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use word_graph::{
    similarity::tokenize, GridError, Relation, RelationLedger, TrainingCorpus, WordGrid,
    BIDIRECTIONAL_WEIGHT,
};

/// Default probability that a learned pair also gets a reverse-traversable
/// relation.
pub const DEFAULT_BIDIRECTIONAL_RATE: f32 = 0.3;

/// Cloned state a batch trains into. Swapped in atomically on success.
#[derive(Debug, Clone)]
pub struct TrainingWorkspace {
    pub input_grid: WordGrid,
    pub output_grid: WordGrid,
    pub ledger: RelationLedger,
    pub corpus: TrainingCorpus,
}

/// What one training call accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingReport {
    /// Pairs actually learned.
    pub trained: usize,
    /// Pairs rejected as malformed (empty side after trimming).
    pub skipped: usize,
    /// Relations created or reinforced.
    pub relations_touched: usize,
    /// Words that could not be placed because their layer was full.
    pub words_dropped: usize,
}

/// Aggregate graph counters reported after training.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct TrainingStats {
    pub input_nodes: usize,
    pub output_nodes: usize,
    pub relation_count: usize,
    pub corpus_size: usize,
    pub training_count: u64,
    pub last_training_at: Option<DateTime<Utc>>,
}

/// Writes exemplars into grids, the ledger, and the corpus.
#[derive(Debug, Clone, Copy)]
pub struct BatchTrainer {
    /// Sampling rate for reverse-traversable relations, in [0, 1].
    pub bidirectional_rate: f32,
}

impl Default for BatchTrainer {
    fn default() -> Self {
        Self {
            bidirectional_rate: DEFAULT_BIDIRECTIONAL_RATE,
        }
    }
}

impl BatchTrainer {
    /// Create a trainer with the given bidirectional sampling rate.
    pub fn new(bidirectional_rate: f32) -> Self {
        Self {
            bidirectional_rate: bidirectional_rate.clamp(0.0, 1.0),
        }
    }

    /// Train a batch into a cloned workspace and return it with a report.
    ///
    /// The caller's state is untouched; swap the workspace in only if the
    /// report is acceptable.
    pub fn train_batch(
        &self,
        input_grid: &WordGrid,
        output_grid: &WordGrid,
        ledger: &RelationLedger,
        corpus: &TrainingCorpus,
        pairs: &[(String, String)],
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> (TrainingWorkspace, TrainingReport) {
        let mut workspace = TrainingWorkspace {
            input_grid: input_grid.clone(),
            output_grid: output_grid.clone(),
            ledger: ledger.clone(),
            corpus: corpus.clone(),
        };

        let mut report = TrainingReport::default();
        for (input, output) in pairs {
            self.train_pair_into(&mut workspace, input, output, &mut report, rng, now);
        }
        debug!(
            trained = report.trained,
            skipped = report.skipped,
            relations = report.relations_touched,
            "batch training finished"
        );
        (workspace, report)
    }

    /// Train a single pair directly into live state.
    pub fn train_one(
        &self,
        input_grid: &mut WordGrid,
        output_grid: &mut WordGrid,
        ledger: &mut RelationLedger,
        corpus: &mut TrainingCorpus,
        input: &str,
        output: &str,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> TrainingReport {
        // Single-pair training borrows the workspace shape without cloning.
        let mut report = TrainingReport::default();
        let mut workspace = TrainingWorkspace {
            input_grid: std::mem::replace(input_grid, WordGrid::new(word_graph::Side::Input)),
            output_grid: std::mem::replace(output_grid, WordGrid::new(word_graph::Side::Output)),
            ledger: std::mem::take(ledger),
            corpus: std::mem::take(corpus),
        };
        self.train_pair_into(&mut workspace, input, output, &mut report, rng, now);
        *input_grid = workspace.input_grid;
        *output_grid = workspace.output_grid;
        *ledger = workspace.ledger;
        *corpus = workspace.corpus;
        report
    }

    fn train_pair_into(
        &self,
        workspace: &mut TrainingWorkspace,
        input: &str,
        output: &str,
        report: &mut TrainingReport,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) {
        let input = input.trim();
        let output = output.trim();
        if input.is_empty() || output.is_empty() {
            report.skipped += 1;
            return;
        }

        let input_tokens = tokenize(input);
        let output_tokens = tokenize(output);
        if input_tokens.is_empty() || output_tokens.is_empty() {
            report.skipped += 1;
            return;
        }

        let placed_inputs =
            add_tokens(&mut workspace.input_grid, &input_tokens, report, now);
        let placed_outputs =
            add_tokens(&mut workspace.output_grid, &output_tokens, report, now);

        for (order, source) in placed_inputs.iter().enumerate() {
            for target in &placed_outputs {
                let relation = Relation::new(source.clone(), target.clone(), now)
                    .with_order(order + 1)
                    .with_context(input.to_string());
                let _ = workspace.ledger.upsert(relation, now);
                report.relations_touched += 1;

                if rng.gen::<f32>() < self.bidirectional_rate {
                    let reverse = Relation::new(source.clone(), target.clone(), now)
                        .with_weights(BIDIRECTIONAL_WEIGHT, BIDIRECTIONAL_WEIGHT)
                        .with_order(order + 1)
                        .with_bidirectional(true);
                    let _ = workspace.ledger.upsert(reverse, now);
                    report.relations_touched += 1;
                }
            }
        }

        let _ = workspace.corpus.add(input, output, now);
        report.trained += 1;
    }
}

/// Add tokens to a grid, layer by position, each chained to the previous
/// token. Returns the words that actually got a node.
fn add_tokens(
    grid: &mut WordGrid,
    tokens: &[String],
    report: &mut TrainingReport,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut placed = Vec::with_capacity(tokens.len());
    let mut previous: Option<&str> = None;
    for (position, token) in tokens.iter().enumerate() {
        match grid.add_word(token, position, previous, now) {
            Ok(_) => {
                placed.push(token.clone());
                previous = Some(token.as_str());
            }
            Err(GridError::LayerFull { layer, .. }) => {
                debug!(word = %token, layer, "layer full, word dropped");
                report.words_dropped += 1;
            }
            Err(GridError::EmptyWord) => {
                // Tokenizer output is never blank, but stay lenient.
                report.words_dropped += 1;
            }
        }
    }
    placed
}
