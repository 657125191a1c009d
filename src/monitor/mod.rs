//! Core monitoring state: the heat model, the ghost-aware tree, and the
//! filter matcher.
//!
//! This module provides:
//! - `heat`: event weights, exponential decay, directory aggregation
//! - `node`: node and event types
//! - `tree_state`: the mutable path-indexed tree driven by events
//! - `filter`: pattern matching over names and relative paths

pub mod filter;
pub mod heat;
pub mod node;
pub mod tree_state;

pub use filter::{FilterMatch, FilterMatcher, MatchKind};
pub use node::{EventKind, Node, NodeKind};
pub use tree_state::{GhostEntry, TreeState};
