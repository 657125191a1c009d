//! Terminal user interface.
//!
//! This module provides:
//! - `app`: the orchestrator and event loop
//! - `input`: key handling and interactive state
//! - `render`: the ratatui full-repaint renderer

pub mod app;
pub mod input;
pub mod render;

pub use app::App;
pub use input::{action_for, InteractiveState, KeyAction};
pub use render::HeaderStats;
