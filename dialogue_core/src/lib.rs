//! # Dialogue Core (Kelime)
//!
//! The "brain" of the self-learning Turkish dialogue agent. This crate
//! interfaces with `word_graph`, spreads activation through the learned
//! associations, synthesizes responses from the training corpus, and keeps
//! an episodic memory of the conversation.
//!
//! ## Core Components
//!
//! - **propagation**: Bounded-depth spreading activation over both graph sides
//! - **synthesizer**: Reverse lookup, corpus matching, and fallback synthesis
//! - **memory**: Short/long-term episodic store with clustering and forgetting
//! - **trainer**: Batch training with an atomic working-copy commit
//! - **agent**: The narrow mutation API wrapping the whole state
//! - **snapshot**: Versioned JSON (de)serialization of everything
//!
//! ## Design Philosophy
//!
//! - **Single writer**: every call completes before its result is observable
//! - **Total queries**: propagation and synthesis never error; no-match
//!   resolves to a low-confidence fallback
//! - **Seeded randomness**: the only random choices (bidirectional sampling,
//!   cluster seed words, emoji pick) draw from one injectable rng

pub mod agent;
pub mod memory;
pub mod propagation;
pub mod search;
pub mod snapshot;
pub mod synthesizer;
pub mod trainer;

pub use agent::*;
pub use memory::*;
pub use propagation::*;
pub use search::*;
pub use snapshot::*;
pub use synthesizer::*;
pub use trainer::*;
