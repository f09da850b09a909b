//! Result types produced by a propagation run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use word_graph::{NodeId, Side};

/// One visit recorded while activation spread through the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationStep {
    pub node: NodeId,
    pub word: String,
    pub side: Side,
    /// Hops from the seed that reached this node.
    pub depth: usize,
    /// Activation recorded at this visit.
    pub activation: f32,
}

/// A relation that carried activation during the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivatedRelation {
    pub source_word: String,
    pub target_word: String,
    pub strength: f32,
    pub confidence: f32,
    /// True when a bidirectional relation was walked target-to-source.
    pub reversed: bool,
}

/// Everything a propagation run produced.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivationResult {
    /// Every node visit, in the order activation reached it.
    pub activation_path: Vec<ActivationStep>,

    /// Final activation per node.
    pub activated_nodes: HashMap<NodeId, f32>,

    /// Relations that carried activation.
    pub activated_relations: Vec<ActivatedRelation>,

    /// Words of strongly activated nodes, strongest first, at most five.
    pub primary_concepts: Vec<String>,

    /// Heuristic response score in [1, 100].
    pub response_score: f32,

    /// Mean confidence of activated relations, or 0.3 when none fired.
    pub confidence: f32,

    pub processing_time_ms: f64,
}

impl ActivationResult {
    /// Highest depth recorded on the activation path.
    pub fn max_depth_reached(&self) -> usize {
        self.activation_path.iter().map(|s| s.depth).max().unwrap_or(0)
    }
}
