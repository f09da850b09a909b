//! Whole-agent persistence as a single versioned JSON document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use word_graph::{RelationLedger, TrainingCorpus, WordGrid};

use crate::memory::MemoryStore;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors surfaced when restoring a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {0} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),

    /// The document was not valid snapshot JSON.
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Everything the agent needs to resume: both grids, the relation ledger,
/// the corpus, episodic memory, and training counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub input_grid: WordGrid,
    pub output_grid: WordGrid,
    pub ledger: RelationLedger,
    pub corpus: TrainingCorpus,
    pub memory: MemoryStore,
    pub training_count: u64,
    pub last_training_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Serialize to a JSON document.
    ///
    /// # Errors
    ///
    /// Only if JSON encoding itself fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a snapshot, rejecting unknown format versions.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }
}
