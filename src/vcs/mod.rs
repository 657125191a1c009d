//! Version-control status integration.
//!
//! Read-only from the monitor's perspective: the orchestrator refreshes a
//! TTL-cached snapshot around event batches and the layout engine consults
//! it for sorting and weighing.

pub mod status;

pub use status::{StatusClass, VcsSnapshot, VcsStatusCache};
