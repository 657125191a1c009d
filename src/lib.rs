//! embermon
//!
//! An interactive terminal monitor for a filesystem subtree. Every tracked
//! entry carries a numeric "heat" that rises when the entry (or one of its
//! descendants) changes and decays exponentially with time; each render
//! fits the most important entries into the available terminal rows,
//! producing a live, self-sorting view of activity.
//!
//! ## How it fits together
//!
//! ```text
//! Filesystem change
//!        ↓
//! DebouncedWatcher (coalesces events over the debounce window)
//!        ↓
//! TreeState mutations (set_node / remove_node, ghosts, history)
//!        ↓
//! calculate_all_heat + compute_layout (flatten, weigh, select top-K)
//!        ↓
//! ratatui renderer (full repaint from self-contained line snapshots)
//! ```
//!
//! ## Module structure
//!
//! - [`monitor`]: the heat model, the ghost-aware tree state, and the
//!   filter matcher
//! - [`layout`]: flattening, the additive weight table, and selection
//! - [`watch`]: the debounced notify watcher and initial inventory walk
//! - [`vcs`]: TTL-cached git status snapshots
//! - [`ui`]: the orchestrator, key handling, and the renderer
//! - [`cli`]: command-line arguments

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cli;
pub mod layout;
pub mod monitor;
pub mod ui;
pub mod vcs;
pub mod watch;

/// Re-exports for convenience.
pub mod prelude {
    pub use crate::cli::Cli;
    pub use crate::layout::{compute_layout, LayoutLine, LayoutResult, WeightTable};
    pub use crate::monitor::{EventKind, FilterMatcher, Node, NodeKind, TreeState};
    pub use crate::ui::App;
    pub use crate::vcs::{StatusClass, VcsSnapshot, VcsStatusCache};
    pub use crate::watch::{DebouncedWatcher, FsChange, WatcherError};
}
