//! Layered word grids - node storage and placement capacity for one side.
//!
//! Each side of the graph owns one `WordGrid`. A grid is a stack of layers,
//! each a fixed square of cells. Placement walks a deterministic outward
//! spiral from the layer center; when no free cell exists within the search
//! radius the add fails with a non-fatal capacity error.
//!
//! Nodes do not store their coordinates - placement is owned by the grid and
//! only matters for capacity. Visualization callers assign their own layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::node::{NodeId, Side, WordNode};

/// Cells per layer edge. Odd so the spiral center is exact.
pub const LAYER_EDGE: usize = 21;

/// Maximum spiral ring searched before a layer counts as full.
pub const MAX_SEARCH_RADIUS: usize = 10;

/// Errors surfaced by grid mutation.
#[derive(Debug, Error)]
pub enum GridError {
    /// No free cell within the spiral search radius.
    #[error("layer {layer} has no free cell within radius {radius}")]
    LayerFull { layer: usize, radius: usize },

    /// The word was empty after trimming.
    #[error("cannot add an empty word")]
    EmptyWord,
}

/// One fixed-size square of cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Layer {
    cells: Vec<Option<NodeId>>,
}

impl Layer {
    fn new() -> Self {
        Self {
            cells: vec![None; LAYER_EDGE * LAYER_EDGE],
        }
    }

    fn at(&self, x: usize, y: usize) -> Option<NodeId> {
        self.cells[y * LAYER_EDGE + x]
    }

    fn set(&mut self, x: usize, y: usize, id: Option<NodeId>) {
        self.cells[y * LAYER_EDGE + x] = id;
    }

    /// Walk an outward spiral from the center and return the first free cell.
    fn free_cell(&self) -> Option<(usize, usize)> {
        let center = (LAYER_EDGE / 2) as isize;
        for radius in 0..=(MAX_SEARCH_RADIUS as isize) {
            for (x, y) in ring(center, center, radius) {
                if x < 0 || y < 0 || x >= LAYER_EDGE as isize || y >= LAYER_EDGE as isize {
                    continue;
                }
                if self.at(x as usize, y as usize).is_none() {
                    return Some((x as usize, y as usize));
                }
            }
        }
        None
    }
}

/// Cells of the square ring at `radius` around (cx, cy), deterministic order:
/// top edge left-to-right, right edge, bottom edge right-to-left, left edge.
fn ring(cx: isize, cy: isize, radius: isize) -> Vec<(isize, isize)> {
    if radius == 0 {
        return vec![(cx, cy)];
    }
    let mut cells = Vec::with_capacity((radius as usize) * 8);
    for x in (cx - radius)..=(cx + radius) {
        cells.push((x, cy - radius));
    }
    for y in (cy - radius + 1)..=(cy + radius) {
        cells.push((cx + radius, y));
    }
    for x in ((cx - radius)..(cx + radius)).rev() {
        cells.push((x, cy + radius));
    }
    for y in ((cy - radius + 1)..(cy + radius)).rev() {
        cells.push((cx - radius, y));
    }
    cells
}

/// Node storage for one side of the graph.
///
/// Invariant: a word (case-insensitive) maps to at most one node. Re-adding
/// reinforces the existing node instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordGrid {
    side: Side,
    layers: Vec<Layer>,
    nodes: HashMap<NodeId, WordNode>,
    /// Lowercase word -> node id.
    index: HashMap<String, NodeId>,
    /// Where each node was placed: (layer, x, y). Capacity bookkeeping only.
    placements: HashMap<NodeId, (usize, usize, usize)>,
}

impl WordGrid {
    /// Create an empty grid for one side with a single layer.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            layers: vec![Layer::new()],
            nodes: HashMap::new(),
            index: HashMap::new(),
            placements: HashMap::new(),
        }
    }

    /// Which side this grid holds.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Add a word, or reinforce the node that already holds it.
    ///
    /// `layer_hint` selects the layer searched for a free cell; layers are
    /// grown on demand. If `parent` resolves to an existing node, a
    /// bidirectional connection edge is added (or strengthened) and the
    /// parent word is recorded as provenance.
    ///
    /// # Errors
    ///
    /// `GridError::EmptyWord` for blank input, `GridError::LayerFull` when
    /// the spiral search finds no free cell.
    pub fn add_word(
        &mut self,
        word: &str,
        layer_hint: usize,
        parent: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<NodeId, GridError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(GridError::EmptyWord);
        }
        let key = word.to_lowercase();

        let id = if let Some(&existing) = self.index.get(&key) {
            if let Some(node) = self.nodes.get_mut(&existing) {
                node.reinforce(now);
            }
            existing
        } else {
            while self.layers.len() <= layer_hint {
                self.layers.push(Layer::new());
            }
            let (x, y) = self.layers[layer_hint].free_cell().ok_or(GridError::LayerFull {
                layer: layer_hint,
                radius: MAX_SEARCH_RADIUS,
            })?;

            let node = WordNode::new(word, self.side, layer_hint, now);
            let id = node.id;
            self.layers[layer_hint].set(x, y, Some(id));
            let _ = self.placements.insert(id, (layer_hint, x, y));
            let _ = self.index.insert(key, id);
            let _ = self.nodes.insert(id, node);
            id
        };

        if let Some(parent) = parent {
            self.link_to_parent(id, parent);
        }
        Ok(id)
    }

    /// Connect `child` to the node holding `parent` (if any), both ways.
    fn link_to_parent(&mut self, child: NodeId, parent: &str) {
        let Some(&parent_id) = self.index.get(&parent.to_lowercase()) else {
            return;
        };
        if parent_id == child {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.connect(parent_id);
            node.record_parent(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent_id) {
            node.connect(child);
        }
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&WordNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut WordNode> {
        self.nodes.get_mut(&id)
    }

    /// Look up a node by word, case-insensitive.
    pub fn node_by_word(&self, word: &str) -> Option<&WordNode> {
        self.index
            .get(&word.trim().to_lowercase())
            .and_then(|id| self.nodes.get(id))
    }

    /// Look up a node id by word, case-insensitive.
    pub fn id_by_word(&self, word: &str) -> Option<NodeId> {
        self.index.get(&word.trim().to_lowercase()).copied()
    }

    /// Iterate over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &WordNode> {
        self.nodes.values()
    }

    /// All node ids, in no particular order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Number of nodes in the grid.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the grid holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of layers currently allocated.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Placement of a node, for visualization callers only.
    pub fn placement(&self, id: NodeId) -> Option<(usize, usize, usize)> {
        self.placements.get(&id).copied()
    }

    /// Operator-triggered capacity eviction: remove the lowest-activation
    /// node of `layer` (ties broken by oldest activation) and free its cell.
    ///
    /// Neighbor edges referencing the evicted node are dropped so occupied
    /// cells are never left pointing at a missing node.
    pub fn evict_for_capacity(&mut self, layer: usize) -> Option<NodeId> {
        let victim = self
            .nodes
            .values()
            .filter(|n| n.layer == layer)
            .min_by(|a, b| {
                a.activation
                    .partial_cmp(&b.activation)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.last_activation_at.cmp(&b.last_activation_at))
            })
            .map(|n| n.id)?;

        let node = self.nodes.remove(&victim)?;
        let _ = self.index.remove(&node.key());
        if let Some((layer, x, y)) = self.placements.remove(&victim) {
            self.layers[layer].set(x, y, None);
        }
        for neighbor in &node.connections {
            if let Some(other) = self.nodes.get_mut(neighbor) {
                other.disconnect(victim);
            }
        }
        Some(victim)
    }
}
