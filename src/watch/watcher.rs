//! Debounced filesystem watcher and initial inventory walk.
//!
//! Raw notify events are funneled through a channel, normalized into the
//! monitor's event vocabulary, and coalesced in a pending map so rapid
//! bursts flush as one batch. Each pending entry carries a monotone
//! sequence number so a flushed batch preserves arrival order; the last
//! event for a path wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{trace, warn};

use crate::monitor::node::{EventKind, NodeKind};

/// Errors from the watcher subsystem. Construction and initial watch
/// failures are startup-fatal; everything later is reported and survived.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The platform watcher could not be created.
    #[error("failed to create watcher: {0}")]
    WatcherCreation(#[from] notify::Error),

    /// The root path could not be watched.
    #[error("failed to watch path {path}: {source}")]
    WatchPath {
        /// The path that failed.
        path: PathBuf,
        /// The underlying notify error.
        source: notify::Error,
    },

    /// An ignore pattern did not compile.
    #[error("invalid ignore pattern: {0}")]
    IgnorePattern(#[from] globset::Error),
}

/// One normalized filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    /// Absolute path the change applies to.
    pub path: PathBuf,
    /// Normalized kind; one of add, addDir, change, unlink, unlinkDir.
    pub kind: EventKind,
    /// Whether the path is (or was) a directory.
    pub is_directory: bool,
}

/// A recursive watcher with event debouncing.
pub struct DebouncedWatcher {
    watcher: RecommendedWatcher,
    raw_rx: Receiver<Result<Event, notify::Error>>,
    root: PathBuf,
    ignore: GlobSet,
    pending: HashMap<PathBuf, (u64, FsChange)>,
    next_seq: u64,
    debounce: Duration,
    last_flush: Instant,
    last_error: Option<String>,
}

impl DebouncedWatcher {
    /// Create a watcher for `root` with the given debounce window. The
    /// watch itself is started by [`DebouncedWatcher::watch`].
    pub fn new(root: PathBuf, debounce_ms: u64, ignore: GlobSet) -> Result<Self, WatcherError> {
        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            raw_rx: rx,
            root,
            ignore,
            pending: HashMap::new(),
            next_seq: 0,
            debounce: Duration::from_millis(debounce_ms),
            last_flush: Instant::now(),
            last_error: None,
        })
    }

    /// Start watching the root recursively. Failure here is startup-fatal.
    pub fn watch(&mut self) -> Result<(), WatcherError> {
        let root = self.root.clone();
        self.watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| WatcherError::WatchPath { path: root, source })
    }

    /// Drain raw notify events into the pending map. Call from the
    /// orchestrator's poll tick.
    pub fn poll_events(&mut self) {
        while let Ok(result) = self.raw_rx.try_recv() {
            match result {
                Ok(event) => {
                    for change in normalize(&event) {
                        if self.is_ignored(&change.path) {
                            trace!(path = %change.path.display(), "ignored event");
                            continue;
                        }
                        self.record(change);
                    }
                }
                Err(err) => {
                    warn!(%err, "watcher error");
                    self.last_error = Some(err.to_string());
                }
            }
        }
    }

    /// Flush the pending batch if the debounce window has elapsed, in
    /// arrival order. Returns an empty batch while still debouncing.
    pub fn flush_if_ready(&mut self) -> Vec<FsChange> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        if self.last_flush.elapsed() < self.debounce {
            return Vec::new();
        }
        self.last_flush = Instant::now();

        let mut batch: Vec<(u64, FsChange)> =
            self.pending.drain().map(|(_, entry)| entry).collect();
        batch.sort_by_key(|(seq, _)| *seq);
        self.last_error = None;
        batch.into_iter().map(|(_, change)| change).collect()
    }

    /// The most recent transient watcher error, cleared on the next
    /// successful flush.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record(&mut self, change: FsChange) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(change.path.clone(), (seq, change));
    }

    fn is_ignored(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(rel) => self.ignore.is_match(rel),
            Err(_) => false,
        }
    }
}

/// Map one raw notify event onto normalized changes, one per path.
/// Access events are dropped; name-modify events are resolved by whether
/// the path still exists.
fn normalize(event: &Event) -> Vec<FsChange> {
    let mut changes = Vec::new();
    for path in &event.paths {
        let change = match event.kind {
            NotifyKind::Create(CreateKind::Folder) => FsChange {
                path: path.clone(),
                kind: EventKind::AddDir,
                is_directory: true,
            },
            NotifyKind::Create(_) => {
                let is_dir = path.is_dir();
                FsChange {
                    path: path.clone(),
                    kind: if is_dir { EventKind::AddDir } else { EventKind::Add },
                    is_directory: is_dir,
                }
            }
            NotifyKind::Remove(RemoveKind::Folder) => FsChange {
                path: path.clone(),
                kind: EventKind::UnlinkDir,
                is_directory: true,
            },
            NotifyKind::Remove(_) => FsChange {
                path: path.clone(),
                kind: EventKind::Unlink,
                is_directory: false,
            },
            NotifyKind::Modify(ModifyKind::Name(_)) => match fs::metadata(path) {
                Ok(meta) => FsChange {
                    path: path.clone(),
                    kind: EventKind::Change,
                    is_directory: meta.is_dir(),
                },
                Err(_) => FsChange {
                    path: path.clone(),
                    kind: EventKind::Unlink,
                    is_directory: false,
                },
            },
            NotifyKind::Modify(_) => FsChange {
                path: path.clone(),
                kind: EventKind::Change,
                is_directory: path.is_dir(),
            },
            _ => continue,
        };
        changes.push(change);
    }
    changes
}

/// Compile ignore patterns. Bare names such as `node_modules` match that
/// path component at any depth.
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if pattern.contains('/') {
            builder.add(Glob::new(pattern)?);
        } else {
            builder.add(Glob::new(pattern)?);
            builder.add(Glob::new(&format!("{pattern}/**"))?);
            builder.add(Glob::new(&format!("**/{pattern}"))?);
            builder.add(Glob::new(&format!("**/{pattern}/**"))?);
        }
    }
    builder.build()
}

/// Walk the root iteratively and return the initial inventory, ignored
/// entries excluded. The root itself is not part of the result.
pub fn scan_inventory(root: &Path, ignore: &GlobSet) -> Vec<(PathBuf, NodeKind)> {
    let mut inventory = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "failed to read directory");
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if let Ok(rel) = path.strip_prefix(root) {
                if ignore.is_match(rel) {
                    continue;
                }
            }
            let kind = if path.is_dir() {
                stack.push(path.clone());
                NodeKind::Directory
            } else {
                NodeKind::File
            };
            inventory.push((path, kind));
        }
    }

    inventory
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ignore(patterns: &[&str]) -> GlobSet {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        build_ignore_set(&owned).unwrap()
    }

    #[test]
    fn bare_ignore_name_matches_at_any_depth() {
        let set = ignore(&["node_modules"]);
        assert!(set.is_match("node_modules"));
        assert!(set.is_match("node_modules/lodash/index.js"));
        assert!(set.is_match("web/node_modules"));
        assert!(set.is_match("web/node_modules/react/index.js"));
        assert!(!set.is_match("src/main.rs"));
    }

    #[test]
    fn slashed_ignore_pattern_is_used_verbatim() {
        let set = ignore(&["target/debug"]);
        assert!(set.is_match("target/debug"));
        assert!(!set.is_match("target/release"));
    }

    #[test]
    fn normalize_maps_create_and_remove_kinds() {
        let event = Event::new(NotifyKind::Create(CreateKind::Folder))
            .add_path(PathBuf::from("/watch/new_dir"));
        let changes = normalize(&event);
        assert_eq!(changes[0].kind, EventKind::AddDir);
        assert!(changes[0].is_directory);

        let event = Event::new(NotifyKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/watch/gone.txt"));
        let changes = normalize(&event);
        assert_eq!(changes[0].kind, EventKind::Unlink);

        let event = Event::new(NotifyKind::Remove(RemoveKind::Folder))
            .add_path(PathBuf::from("/watch/gone_dir"));
        let changes = normalize(&event);
        assert_eq!(changes[0].kind, EventKind::UnlinkDir);
    }

    #[test]
    fn normalize_resolves_name_modify_by_existence() {
        let dir = tempdir().unwrap();
        let kept = dir.path().join("kept.txt");
        fs::write(&kept, "data").unwrap();

        let event =
            Event::new(NotifyKind::Modify(ModifyKind::Name(notify::event::RenameMode::Any)))
                .add_path(kept.clone());
        assert_eq!(normalize(&event)[0].kind, EventKind::Change);

        let event =
            Event::new(NotifyKind::Modify(ModifyKind::Name(notify::event::RenameMode::Any)))
                .add_path(dir.path().join("vanished.txt"));
        assert_eq!(normalize(&event)[0].kind, EventKind::Unlink);
    }

    #[test]
    fn access_events_are_dropped() {
        let event = Event::new(NotifyKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/watch/read.txt"));
        assert!(normalize(&event).is_empty());
    }

    #[test]
    fn flush_preserves_arrival_order_and_last_event_wins() {
        let dir = tempdir().unwrap();
        let mut watcher =
            DebouncedWatcher::new(dir.path().to_path_buf(), 0, ignore(&[])).unwrap();

        watcher.record(FsChange {
            path: dir.path().join("b.txt"),
            kind: EventKind::Add,
            is_directory: false,
        });
        watcher.record(FsChange {
            path: dir.path().join("a.txt"),
            kind: EventKind::Add,
            is_directory: false,
        });
        watcher.record(FsChange {
            path: dir.path().join("b.txt"),
            kind: EventKind::Change,
            is_directory: false,
        });

        std::thread::sleep(Duration::from_millis(5));
        let batch = watcher.flush_if_ready();
        assert_eq!(batch.len(), 2);
        // b.txt's latest event replaced the first but kept a later seq, so
        // a.txt now comes first.
        assert_eq!(batch[0].path, dir.path().join("a.txt"));
        assert_eq!(batch[1].kind, EventKind::Change);
    }

    #[test]
    fn flush_holds_until_the_window_elapses() {
        let dir = tempdir().unwrap();
        let mut watcher =
            DebouncedWatcher::new(dir.path().to_path_buf(), 60_000, ignore(&[])).unwrap();
        watcher.record(FsChange {
            path: dir.path().join("a.txt"),
            kind: EventKind::Add,
            is_directory: false,
        });
        assert!(watcher.flush_if_ready().is_empty());
    }

    #[test]
    fn inventory_walk_skips_ignored_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/x.js"), "x").unwrap();

        let inventory = scan_inventory(dir.path(), &ignore(&["node_modules"]));
        let paths: Vec<&Path> = inventory.iter().map(|(p, _)| p.as_path()).collect();

        assert!(paths.contains(&dir.path().join("src").as_path()));
        assert!(paths.contains(&dir.path().join("src/main.rs").as_path()));
        assert!(!paths.iter().any(|p| p.starts_with(dir.path().join("node_modules"))));

        let (_, kind) = inventory
            .iter()
            .find(|(p, _)| p.ends_with("src"))
            .unwrap();
        assert_eq!(*kind, NodeKind::Directory);
    }
}
