//! Space-aware, weight-ordered layout of the monitored tree.
//!
//! This module provides:
//! - `weights`: the additive weight table, exposed as data
//! - `engine`: flatten, weigh, and top-K selection

pub mod engine;
pub mod weights;

pub use engine::{
    compute_layout, LayoutLine, LayoutResult, LineKind, FOOTER_ROWS, HEADER_ROWS, MIN_ROWS,
};
pub use weights::WeightTable;
