//! Filesystem change source: debounced watching and the initial inventory.

pub mod watcher;

pub use watcher::{build_ignore_set, scan_inventory, DebouncedWatcher, FsChange, WatcherError};
