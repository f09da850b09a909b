//! # Word Graph
//!
//! The "Word Bible" crate - contains the associative graph data model and its
//! local rules. This crate is the single source of truth for learned state and
//! does not contain any engine logic.
//!
//! ## Core Structures
//!
//! - **node**: Word nodes - one occurrence-class of a word per graph side
//! - **grid**: Layered capacity grids holding the nodes of one side
//! - **relation**: Weighted, decaying relations between input and output words
//! - **corpus**: The verbatim training exemplars
//! - **similarity**: Shared fuzzy text utilities

pub mod corpus;
pub mod grid;
pub mod node;
pub mod relation;
pub mod similarity;

pub use corpus::*;
pub use grid::*;
pub use node::*;
pub use relation::*;
pub use similarity::*;
