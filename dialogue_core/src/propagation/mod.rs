//! Activation Propagation Engine - spreads activation from an input utterance
//! through both graph sides.
//!
//! The algorithm works as follows:
//! 1. **Seed**: Input-side nodes fuzzy-matching any input token light up at 1.0
//! 2. **Spread**: A FIFO frontier walks graph connections and relations,
//!    decaying at every hop, up to a bounded depth
//! 3. **Cycle rule**: A node only re-activates when the incoming value is
//!    strictly higher than its recorded activation - this is what guarantees
//!    termination on cyclic graphs
//! 4. **Report**: Strongly activated words become primary concepts; an
//!    aggregate response score and relation confidence are derived

mod result;

pub use result::*;

use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use word_graph::{similarity::word_similarity, similarity::tokenize, NodeId, RelationId, RelationLedger, Side, WordGrid};

/// Fraction of activation lost per hop.
pub const DEFAULT_ACTIVATION_DECAY: f32 = 0.15;

/// Minimum activation a hop must deliver to light a node.
pub const CONNECTION_THRESHOLD: f32 = 0.25;

/// Minimum fuzzy similarity between an input token and a node word to seed.
pub const SEED_SIMILARITY: f32 = 0.7;

/// Activation above which a node's word counts as a primary concept.
pub const PRIMARY_CONCEPT_THRESHOLD: f32 = 0.5;

/// How many primary concepts are reported.
pub const MAX_PRIMARY_CONCEPTS: usize = 5;

/// Configuration for the spreading activation algorithm.
#[derive(Debug, Clone)]
pub struct PropagationConfig {
    /// Maximum hops from a seed node.
    pub max_depth: usize,

    /// Fraction of activation lost per hop (0.0-1.0).
    pub decay_rate: f32,

    /// Minimum delivered activation for a hop to land.
    pub connection_threshold: f32,

    /// Fuzzy similarity needed between token and word to seed a node.
    pub seed_similarity: f32,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            decay_rate: DEFAULT_ACTIVATION_DECAY,
            connection_threshold: CONNECTION_THRESHOLD,
            seed_similarity: SEED_SIMILARITY,
        }
    }
}

/// The propagation engine. Pure over its inputs apart from writing the
/// resulting activation levels back onto the visited nodes.
pub struct PropagationEngine {
    config: PropagationConfig,
}

impl PropagationEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: PropagationConfig) -> Self {
        Self { config }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PropagationConfig::default())
    }

    /// Spread activation from `input_text` across both grids.
    ///
    /// Never errors: blank input yields an empty result with confidence 0.3.
    pub fn propagate(
        &self,
        input_grid: &mut WordGrid,
        output_grid: &mut WordGrid,
        ledger: &RelationLedger,
        input_text: &str,
        now: DateTime<Utc>,
    ) -> ActivationResult {
        let started = Instant::now();
        let mut result = ActivationResult::default();

        let tokens = tokenize(input_text);
        if tokens.is_empty() {
            result.confidence = 0.3;
            result.response_score = 1.0;
            result.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
            return result;
        }

        let mut queue: VecDeque<(NodeId, Side, usize)> = VecDeque::new();
        let mut fired: HashSet<(RelationId, bool)> = HashSet::new();

        // Seed phase: fuzzy-match input tokens against input-side words.
        for id in input_grid.ids() {
            let Some(node) = input_grid.get(id) else { continue };
            let hit = tokens
                .iter()
                .any(|t| word_similarity(&node.word, t) >= self.config.seed_similarity);
            if hit {
                let word = node.word.clone();
                let _ = result.activated_nodes.insert(id, 1.0);
                result.activation_path.push(ActivationStep {
                    node: id,
                    word,
                    side: Side::Input,
                    depth: 0,
                    activation: 1.0,
                });
                queue.push_back((id, Side::Input, 0));
                if let Some(node) = input_grid.get_mut(id) {
                    node.set_activation(1.0, now);
                }
            }
        }

        // Spread phase.
        while let Some((id, side, depth)) = queue.pop_front() {
            if depth >= self.config.max_depth {
                continue;
            }
            let Some(&current) = result.activated_nodes.get(&id) else { continue };

            let grid = match side {
                Side::Input => &*input_grid,
                Side::Output => &*output_grid,
            };
            let Some(node) = grid.get(id) else { continue };
            let word = node.word.clone();
            let neighbors: Vec<(NodeId, f32)> = node
                .connection_strengths
                .iter()
                .map(|(&n, &w)| (n, w))
                .collect();

            // (a) Graph neighbors, same side.
            for (neighbor, weight) in neighbors {
                let new_activation = current * weight * (1.0 - self.config.decay_rate);
                if !self.accepts(&result, neighbor, new_activation) {
                    continue;
                }
                let grid = match side {
                    Side::Input => &mut *input_grid,
                    Side::Output => &mut *output_grid,
                };
                self.light(&mut result, &mut queue, grid, neighbor, side, depth + 1, new_activation, now);
            }

            // (b) Relations. Forward from input-side words; bidirectional
            // relations also carry activation output-to-input, reversed.
            match side {
                Side::Input => {
                    for rel in ledger.relations_from(&word) {
                        let new_activation =
                            current * (rel.strength / 100.0) * (1.0 - self.config.decay_rate);
                        let Some(target) = output_grid.id_by_word(&rel.target_word) else {
                            continue;
                        };
                        if !self.accepts(&result, target, new_activation) {
                            continue;
                        }
                        if fired.insert((rel.id, false)) {
                            result.activated_relations.push(ActivatedRelation {
                                source_word: rel.source_word.clone(),
                                target_word: rel.target_word.clone(),
                                strength: rel.strength,
                                confidence: rel.confidence,
                                reversed: false,
                            });
                        }
                        self.light(
                            &mut result,
                            &mut queue,
                            output_grid,
                            target,
                            Side::Output,
                            depth + 1,
                            new_activation,
                            now,
                        );
                    }
                }
                Side::Output => {
                    for rel in ledger.reverse_relations_to(&word) {
                        let new_activation =
                            current * (rel.strength / 100.0) * (1.0 - self.config.decay_rate);
                        let Some(source) = input_grid.id_by_word(&rel.source_word) else {
                            continue;
                        };
                        if !self.accepts(&result, source, new_activation) {
                            continue;
                        }
                        if fired.insert((rel.id, true)) {
                            result.activated_relations.push(ActivatedRelation {
                                source_word: rel.source_word.clone(),
                                target_word: rel.target_word.clone(),
                                strength: rel.strength,
                                confidence: rel.confidence,
                                reversed: true,
                            });
                        }
                        self.light(
                            &mut result,
                            &mut queue,
                            input_grid,
                            source,
                            Side::Input,
                            depth + 1,
                            new_activation,
                            now,
                        );
                    }
                }
            }
        }

        self.finish(&mut result, input_grid, output_grid);
        result.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }

    /// The cycle-breaking rule: a hop lands only when it clears the
    /// threshold AND strictly increases the node's recorded activation.
    fn accepts(&self, result: &ActivationResult, node: NodeId, new_activation: f32) -> bool {
        new_activation > self.config.connection_threshold
            && new_activation > result.activated_nodes.get(&node).copied().unwrap_or(0.0)
    }

    #[allow(clippy::too_many_arguments)]
    fn light(
        &self,
        result: &mut ActivationResult,
        queue: &mut VecDeque<(NodeId, Side, usize)>,
        grid: &mut WordGrid,
        id: NodeId,
        side: Side,
        depth: usize,
        activation: f32,
        now: DateTime<Utc>,
    ) {
        let Some(node) = grid.get_mut(id) else { return };
        node.set_activation(activation, now);
        result.activation_path.push(ActivationStep {
            node: id,
            word: node.word.clone(),
            side,
            depth,
            activation,
        });
        let _ = result.activated_nodes.insert(id, activation);
        queue.push_back((id, side, depth));
    }

    /// Derive primary concepts, response score, and confidence.
    fn finish(&self, result: &mut ActivationResult, input_grid: &WordGrid, output_grid: &WordGrid) {
        let mut strong: Vec<(String, f32, f32)> = result
            .activated_nodes
            .iter()
            .filter(|(_, &a)| a > PRIMARY_CONCEPT_THRESHOLD)
            .filter_map(|(&id, &a)| {
                input_grid
                    .get(id)
                    .or_else(|| output_grid.get(id))
                    .map(|n| (n.word.clone(), a, n.importance))
            })
            .collect();
        strong.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
        });
        result.primary_concepts = strong
            .into_iter()
            .take(MAX_PRIMARY_CONCEPTS)
            .map(|(word, _, _)| word)
            .collect();

        let total_activation: f32 = result.activated_nodes.values().sum();
        result.response_score = (5.0 * result.activated_nodes.len() as f32
            + 10.0 * result.activated_relations.len() as f32
            + 20.0 * total_activation)
            .round()
            .clamp(1.0, 100.0);

        result.confidence = if result.activated_relations.is_empty() {
            0.3
        } else {
            result.activated_relations.iter().map(|r| r.confidence).sum::<f32>()
                / result.activated_relations.len() as f32
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use word_graph::Relation;

    fn setup() -> (WordGrid, WordGrid, RelationLedger) {
        let now = Utc::now();
        let mut input = WordGrid::new(Side::Input);
        let mut output = WordGrid::new(Side::Output);
        let mut ledger = RelationLedger::new();

        input.add_word("merhaba", 0, None, now).unwrap();
        input.add_word("nasılsın", 0, Some("merhaba"), now).unwrap();
        output.add_word("selam", 0, None, now).unwrap();
        output.add_word("iyiyim", 0, Some("selam"), now).unwrap();

        let rel = Relation::new("merhaba", "selam", now).with_weights(80.0, 80.0);
        ledger.upsert(rel, now);
        (input, output, ledger)
    }

    #[test]
    fn test_seed_matches_exact_token() {
        let (mut input, mut output, ledger) = setup();
        let engine = PropagationEngine::with_defaults();

        let result = engine.propagate(&mut input, &mut output, &ledger, "Merhaba", Utc::now());

        let seed = input.id_by_word("merhaba").unwrap();
        assert_eq!(result.activated_nodes.get(&seed), Some(&1.0));
        assert!(result.primary_concepts.contains(&"merhaba".to_string()));
    }

    #[test]
    fn test_relation_carries_activation_to_output_side() {
        let (mut input, mut output, ledger) = setup();
        let engine = PropagationEngine::with_defaults();

        let result = engine.propagate(&mut input, &mut output, &ledger, "merhaba", Utc::now());

        let target = output.id_by_word("selam").unwrap();
        // 1.0 * 0.8 * 0.85 = 0.68
        let activation = result.activated_nodes.get(&target).copied().unwrap();
        assert!((activation - 0.68).abs() < 0.001);
        assert_eq!(result.activated_relations.len(), 1);
        assert!(!result.activated_relations[0].reversed);
    }

    #[test]
    fn test_bidirectional_relation_walks_in_reverse() {
        let now = Utc::now();
        let mut input = WordGrid::new(Side::Input);
        let mut output = WordGrid::new(Side::Output);
        let mut ledger = RelationLedger::new();

        input.add_word("soru", 0, None, now).unwrap();
        output.add_word("cevap", 0, None, now).unwrap();
        // Seed the output-side word from the input side first.
        input.add_word("cevap", 0, None, now).unwrap();

        ledger.upsert(
            Relation::new("soru", "cevap", now)
                .with_weights(90.0, 90.0)
                .with_bidirectional(true),
            now,
        );

        let engine = PropagationEngine::with_defaults();
        // "cevap" seeds the input-side "cevap" node; nothing walks reversed
        // because reverse traversal starts from output-side nodes.
        let result = engine.propagate(&mut input, &mut output, &ledger, "soru", now);

        // Forward hop lights output "cevap"; from there the bidirectional
        // relation fires back toward input "soru", which is already at 1.0,
        // so the strict-increase rule stops it. The forward firing is all
        // that is recorded.
        assert!(result
            .activated_nodes
            .contains_key(&output.id_by_word("cevap").unwrap()));
        assert!(result.activated_relations.iter().any(|r| !r.reversed));
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let (mut input, mut output, ledger) = setup();
        let engine = PropagationEngine::with_defaults();

        let result = engine.propagate(&mut input, &mut output, &ledger, "   ", Utc::now());

        assert!(result.activated_nodes.is_empty());
        assert!(result.activated_relations.is_empty());
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_depth_is_bounded() {
        let now = Utc::now();
        let mut input = WordGrid::new(Side::Input);
        let mut output = WordGrid::new(Side::Output);
        let ledger = RelationLedger::new();

        // A long chain: w0 - w1 - ... - w9, each linked to its predecessor.
        input.add_word("w0", 0, None, now).unwrap();
        for i in 1..10 {
            input
                .add_word(&format!("w{i}"), 0, Some(&format!("w{}", i - 1)), now)
                .unwrap();
        }
        // Max out edge weights so only depth stops the spread.
        let ids = input.ids();
        for id in ids {
            let node = input.get_mut(id).unwrap();
            let neighbors: Vec<_> = node.connections.iter().copied().collect();
            for n in neighbors {
                let _ = node.connection_strengths.insert(n, 1.0);
            }
        }

        for max_depth in 1..=4 {
            let engine = PropagationEngine::new(PropagationConfig {
                max_depth,
                ..Default::default()
            });
            let result = engine.propagate(&mut input, &mut output, &ledger, "w0", now);
            assert!(
                result.max_depth_reached() <= max_depth,
                "depth {} exceeded bound {}",
                result.max_depth_reached(),
                max_depth
            );
        }
    }

    #[test]
    fn test_cycles_terminate() {
        let now = Utc::now();
        let mut input = WordGrid::new(Side::Input);
        let mut output = WordGrid::new(Side::Output);
        let ledger = RelationLedger::new();

        // Triangle: a-b, b-c, c-a.
        input.add_word("aaa", 0, None, now).unwrap();
        input.add_word("bbb", 0, Some("aaa"), now).unwrap();
        input.add_word("ccc", 0, Some("bbb"), now).unwrap();
        let a = input.id_by_word("aaa").unwrap();
        let c = input.id_by_word("ccc").unwrap();
        input.get_mut(c).unwrap().connect(a);
        input.get_mut(a).unwrap().connect(c);

        let engine = PropagationEngine::new(PropagationConfig {
            max_depth: 50,
            ..Default::default()
        });
        let result = engine.propagate(&mut input, &mut output, &ledger, "aaa", now);

        // Bounded work: every re-visit must strictly increase activation,
        // which decays multiplicatively, so the path stays small.
        assert!(result.activation_path.len() < 100);
    }

    #[test]
    fn test_confidence_within_bounds() {
        let (mut input, mut output, ledger) = setup();
        let engine = PropagationEngine::with_defaults();

        for text in ["merhaba", "nasılsın", "bilinmeyen", ""] {
            let result = engine.propagate(&mut input, &mut output, &ledger, text, Utc::now());
            assert!((0.0..=1.0).contains(&result.confidence), "text {text:?}");
            assert!((1.0..=100.0).contains(&result.response_score));
        }
    }

    #[test]
    fn test_weak_connections_do_not_spread() {
        let now = Utc::now();
        let mut input = WordGrid::new(Side::Input);
        let mut output = WordGrid::new(Side::Output);
        let ledger = RelationLedger::new();

        input.add_word("zayıf", 0, None, now).unwrap();
        input.add_word("komşu", 0, Some("zayıf"), now).unwrap();
        let seed = input.id_by_word("zayıf").unwrap();
        let neighbor = input.id_by_word("komşu").unwrap();
        let _ = input
            .get_mut(seed)
            .unwrap()
            .connection_strengths
            .insert(neighbor, 0.2);

        let engine = PropagationEngine::with_defaults();
        let result = engine.propagate(&mut input, &mut output, &ledger, "zayıf", now);

        // 1.0 * 0.2 * 0.85 = 0.17 < threshold 0.25.
        assert!(!result.activated_nodes.contains_key(&neighbor));
    }
}
