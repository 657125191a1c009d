//! Mutable, ghost-aware tree state driven by the normalized event stream.
//!
//! The tree owns every tracked node through a path-indexed map; children are
//! stored as name → path links, and parent traversal is path arithmetic
//! against the index, so there are no upward pointers to manage. Deleted
//! nodes linger as "ghosts" for a few ticks so the user sees the deletion,
//! then are detached for real.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::trace;

use crate::monitor::heat::{self, MAX_HEAT};
use crate::monitor::node::{EventKind, Node, NodeKind};

/// Child activity refreshes a parent's event time at most this often.
const PARENT_REFRESH_MS: u64 = 100;

/// Heat floor for a ghost at fade step 0.
const GHOST_BOOST_BASE: f64 = 90.0;

/// How far the ghost heat floor drops per fade step.
const GHOST_BOOST_DROP: f64 = 25.0;

/// Bookkeeping for one logically-deleted subtree root.
#[derive(Debug, Clone)]
pub struct GhostEntry {
    /// When the deletion event arrived.
    pub death_time: Instant,
    /// Ghost ticks elapsed since then.
    pub fade_step: u8,
}

/// The in-memory tree for the watched path.
pub struct TreeState {
    root_path: PathBuf,
    /// Every live node, keyed by absolute path. Removed nodes do not appear.
    index: HashMap<PathBuf, Node>,
    /// Rolling history of recently-evented paths, most recent first. The
    /// cache capacity is the history limit; `put` dedupes by path and
    /// evicts the oldest entry past capacity.
    history: LruCache<PathBuf, Instant>,
    /// Fading deleted subtrees by their root path.
    ghosts: HashMap<PathBuf, GhostEntry>,
    /// Ghost ticks before a deleted subtree is detached for real.
    ghost_steps: u8,
}

impl TreeState {
    /// Create a tree containing only the root directory node.
    pub fn new(root_path: PathBuf, history_limit: usize, ghost_steps: u8) -> Self {
        let mut index = HashMap::new();
        index.insert(
            root_path.clone(),
            Node::new(root_path.clone(), NodeKind::Directory),
        );
        Self {
            root_path,
            index,
            history: LruCache::new(
                NonZeroUsize::new(history_limit).unwrap_or(NonZeroUsize::MIN),
            ),
            ghosts: HashMap::new(),
            ghost_steps,
        }
    }

    /// The watched root path.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Look up a node by absolute path.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        self.index.get(path)
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether only the root remains.
    pub fn is_empty(&self) -> bool {
        self.index.len() <= 1
    }

    /// The recorded kind of a node, if tracked.
    pub fn node_kind(&self, path: &Path) -> Option<NodeKind> {
        self.index.get(path).map(|n| n.kind)
    }

    /// Whether any deleted subtree is still fading.
    pub fn has_ghosts(&self) -> bool {
        !self.ghosts.is_empty()
    }

    /// Number of fading deleted subtrees.
    pub fn ghost_count(&self) -> usize {
        self.ghosts.len()
    }

    /// Membership test over the rolling history.
    pub fn is_in_history(&self, path: &Path) -> bool {
        self.history.contains(path)
    }

    /// Hot files as of the last heat pass. Shown in the header summary.
    pub fn hot_file_count(&self) -> usize {
        self.index
            .values()
            .filter(|n| !n.kind.is_dir() && heat::is_hot(n.heat))
            .count()
    }

    /// Apply an add/change event: create the node (and any missing ancestor
    /// directories) if needed, stamp the event, clear any ghost state, push
    /// to the history front, and light up the ancestor chain.
    pub fn set_node(&mut self, path: &Path, kind: NodeKind, event: EventKind, now: Instant) {
        if !path.starts_with(&self.root_path) {
            trace!(path = %path.display(), "event outside watch root dropped");
            return;
        }

        self.ensure_parents(path);

        let is_new = !self.index.contains_key(path);
        let node = self
            .index
            .entry(path.to_path_buf())
            .or_insert_with(|| Node::new(path.to_path_buf(), kind));
        node.kind = kind;
        node.event_kind = Some(event);
        node.event_time = Some(now);
        node.ghost = false;
        node.ghost_step = 0;

        if is_new {
            if let Some(parent) = path.parent() {
                if let Some(parent_node) = self.index.get_mut(parent) {
                    parent_node.link_child(path);
                }
            }
        }

        self.ghosts.remove(path);
        if path != self.root_path {
            self.history.put(path.to_path_buf(), now);
        }
        self.propagate_to_parents(path, now);
    }

    /// Apply a deletion event: mark the node and all descendants as ghosts
    /// and start the fade. The subtree stays attached to the index and its
    /// parent until [`TreeState::advance_ghosts`] finishes the fade.
    pub fn remove_node(&mut self, path: &Path, event: EventKind, now: Instant) {
        debug_assert!(event.is_unlink());
        // The root itself is never removed; its children fade one by one.
        if path == self.root_path || !self.index.contains_key(path) {
            return;
        }

        for p in self.subtree_paths(path) {
            if let Some(node) = self.index.get_mut(&p) {
                node.ghost = true;
                node.ghost_step = 0;
            }
        }
        if let Some(node) = self.index.get_mut(path) {
            node.event_kind = Some(event);
            node.event_time = Some(now);
        }

        self.ghosts.insert(
            path.to_path_buf(),
            GhostEntry {
                death_time: now,
                fade_step: 0,
            },
        );
        self.history.put(path.to_path_buf(), now);
        self.propagate_to_parents(path, now);
    }

    /// Advance every fading ghost one step; subtrees that finish the fade
    /// are detached from their parent and dropped from the index, history,
    /// and ghost table. Returns whether anything was finalized.
    pub fn advance_ghosts(&mut self) -> bool {
        if self.ghosts.is_empty() {
            return false;
        }

        let mut expired = Vec::new();
        for (path, entry) in self.ghosts.iter_mut() {
            entry.fade_step = entry.fade_step.saturating_add(1);
            if entry.fade_step >= self.ghost_steps {
                expired.push(path.clone());
            }
        }

        // Mirror fade progress onto the ghost-marked nodes themselves.
        let steps: Vec<(PathBuf, u8)> = self
            .ghosts
            .iter()
            .map(|(p, e)| (p.clone(), e.fade_step))
            .collect();
        for (path, step) in steps {
            for p in self.subtree_paths(&path) {
                if let Some(node) = self.index.get_mut(&p) {
                    if node.ghost {
                        node.ghost_step = step;
                    }
                }
            }
        }

        let finalized = !expired.is_empty();
        for path in expired {
            self.fully_remove_node(&path);
        }
        finalized
    }

    /// Whether any node is hot (as of the last heat pass) or any ghost is
    /// still fading. Drives the breath tick.
    pub fn has_hot_items(&self) -> bool {
        !self.ghosts.is_empty() || self.index.values().any(|n| heat::is_hot(n.heat))
    }

    /// Recompute every node's heat for the given instant, post-order so
    /// directory heat aggregates over fresh child values. Ghosts early in
    /// their fade get a heat floor so deletions stay visible.
    pub fn calculate_all_heat(&mut self, now: Instant) {
        let root = self.root_path.clone();
        self.calc_heat(&root, now);
    }

    /// Recursive count of descendants that are hot. Shown as the
    /// "(N changes)" annotation on directories.
    pub fn change_count(&self, path: &Path) -> usize {
        let Some(node) = self.index.get(path) else {
            return 0;
        };
        let mut count = 0;
        let mut stack: Vec<&PathBuf> = node.children.values().collect();
        while let Some(p) = stack.pop() {
            if let Some(n) = self.index.get(p) {
                if heat::is_hot(n.heat) {
                    count += 1;
                }
                stack.extend(n.children.values());
            }
        }
        count
    }

    /// Wipe all event marks and the history. Used after seeding the tree
    /// from the initial inventory so the walk itself is not displayed as
    /// activity.
    pub fn clear_event_marks(&mut self) {
        for node in self.index.values_mut() {
            node.event_kind = None;
            node.event_time = None;
        }
        self.history.clear();
    }

    fn calc_heat(&mut self, path: &Path, now: Instant) -> f64 {
        let Some(node) = self.index.get(path) else {
            return 0.0;
        };
        let child_paths: Vec<PathBuf> = node.children.values().cloned().collect();
        let is_dir = node.kind.is_dir();
        let event_kind = node.event_kind;
        let event_time = node.event_time;
        let ghost = node.ghost;
        let ghost_step = node.ghost_step;

        let mut child_heats = Vec::with_capacity(child_paths.len());
        for child in &child_paths {
            child_heats.push(self.calc_heat(child, now));
        }

        let own = heat::heat(event_kind, event_time, now);
        let mut value = if is_dir {
            heat::dir_heat(&child_heats, own)
        } else {
            own
        };
        if ghost && ghost_step < self.ghost_steps {
            value = value.max(GHOST_BOOST_BASE - GHOST_BOOST_DROP * f64::from(ghost_step));
        }
        let value = value.clamp(0.0, MAX_HEAT);
        if let Some(node) = self.index.get_mut(path) {
            node.heat = value;
        }
        value
    }

    /// Create any missing ancestor directories (with no event) and link
    /// them into their parents, root downward.
    fn ensure_parents(&mut self, path: &Path) {
        let mut missing: Vec<PathBuf> = Vec::new();
        let mut cursor = path.parent().map(Path::to_path_buf);
        while let Some(p) = cursor {
            if !p.starts_with(&self.root_path) || self.index.contains_key(&p) {
                break;
            }
            cursor = p.parent().map(Path::to_path_buf);
            missing.push(p);
        }
        for dir in missing.into_iter().rev() {
            self.index
                .insert(dir.clone(), Node::new(dir.clone(), NodeKind::Directory));
            if let Some(parent) = dir.parent() {
                if let Some(parent_node) = self.index.get_mut(parent) {
                    parent_node.link_child(&dir);
                }
            }
        }
    }

    /// Walk parents up to and including the root. A parent's event time is
    /// refreshed at most once per [`PARENT_REFRESH_MS`]; a parent keeps a
    /// real direct event kind and only ever flips between none and
    /// `ChildChange` here.
    fn propagate_to_parents(&mut self, path: &Path, now: Instant) {
        let refresh = Duration::from_millis(PARENT_REFRESH_MS);
        let mut cursor = path.parent().map(Path::to_path_buf);
        while let Some(p) = cursor {
            if !p.starts_with(&self.root_path) {
                break;
            }
            if let Some(node) = self.index.get_mut(&p) {
                let stale = node
                    .event_time
                    .map_or(true, |t| now.saturating_duration_since(t) > refresh);
                if stale {
                    node.event_time = Some(now);
                }
                if node.event_kind.is_none() || node.event_kind == Some(EventKind::ChildChange) {
                    node.event_kind = Some(EventKind::ChildChange);
                }
            }
            if p == self.root_path {
                break;
            }
            cursor = p.parent().map(Path::to_path_buf);
        }
    }

    /// Collect a subtree (the given path included) through child links.
    fn subtree_paths(&self, path: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![path.to_path_buf()];
        while let Some(p) = stack.pop() {
            if let Some(node) = self.index.get(&p) {
                stack.extend(node.children.values().cloned());
                out.push(p);
            }
        }
        out
    }

    /// Detach a finished ghost subtree from its parent and purge it from
    /// the index, history, and ghost table.
    fn fully_remove_node(&mut self, path: &Path) {
        for p in self.subtree_paths(path) {
            self.index.remove(&p);
            self.history.pop(&p);
            self.ghosts.remove(&p);
        }
        if let Some(parent) = path.parent() {
            if let Some(parent_node) = self.index.get_mut(parent) {
                parent_node.unlink_child(path);
            }
        }
        trace!(path = %path.display(), "ghost finalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> TreeState {
        TreeState::new(PathBuf::from("/watch"), 4, 3)
    }

    #[test]
    fn set_node_creates_missing_ancestors_as_quiet_directories() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(
            Path::new("/watch/src/deep/main.rs"),
            NodeKind::File,
            EventKind::Add,
            now,
        );

        let src = t.get(Path::new("/watch/src")).unwrap();
        assert_eq!(src.kind, NodeKind::Directory);
        // Ancestors are created quiet, then lit up by propagation.
        assert_eq!(src.event_kind, Some(EventKind::ChildChange));

        let deep = t.get(Path::new("/watch/src/deep")).unwrap();
        assert!(deep.children.contains_key("main.rs"));
    }

    #[test]
    fn events_outside_root_are_dropped() {
        let mut t = tree();
        t.set_node(
            Path::new("/elsewhere/x.txt"),
            NodeKind::File,
            EventKind::Add,
            Instant::now(),
        );
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn history_is_bounded_and_deduped() {
        let mut t = tree();
        let now = Instant::now();
        for i in 0..10 {
            let path = PathBuf::from(format!("/watch/f{i}.txt"));
            t.set_node(&path, NodeKind::File, EventKind::Add, now);
        }
        // Re-touch one path; it must not appear twice.
        t.set_node(
            Path::new("/watch/f9.txt"),
            NodeKind::File,
            EventKind::Change,
            now,
        );

        assert!(t.history.len() <= 4);
        assert!(t.is_in_history(Path::new("/watch/f9.txt")));
        assert!(!t.is_in_history(Path::new("/watch/f0.txt")));
    }

    #[test]
    fn propagation_keeps_direct_event_kinds_on_parents() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(
            Path::new("/watch/src"),
            NodeKind::Directory,
            EventKind::AddDir,
            now,
        );
        t.set_node(
            Path::new("/watch/src/lib.rs"),
            NodeKind::File,
            EventKind::Change,
            now + Duration::from_millis(500),
        );

        let src = t.get(Path::new("/watch/src")).unwrap();
        assert_eq!(src.event_kind, Some(EventKind::AddDir));
        // But its event time was refreshed by the child's activity.
        assert_eq!(src.event_time, Some(now + Duration::from_millis(500)));
    }

    #[test]
    fn parent_refresh_is_rate_limited() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        let first = t.get(t.root_path()).unwrap().event_time;

        // Within the 100ms window the root's event time stays put.
        t.set_node(
            Path::new("/watch/b.txt"),
            NodeKind::File,
            EventKind::Add,
            now + Duration::from_millis(50),
        );
        assert_eq!(t.get(t.root_path()).unwrap().event_time, first);

        t.set_node(
            Path::new("/watch/c.txt"),
            NodeKind::File,
            EventKind::Add,
            now + Duration::from_millis(500),
        );
        assert_eq!(
            t.get(t.root_path()).unwrap().event_time,
            Some(now + Duration::from_millis(500))
        );
    }

    #[test]
    fn single_modification_heats_file_and_root() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        t.clear_event_marks();
        t.set_node(
            Path::new("/watch/a.txt"),
            NodeKind::File,
            EventKind::Change,
            now,
        );
        t.calculate_all_heat(now);

        let file = t.get(Path::new("/watch/a.txt")).unwrap();
        assert!((file.heat - 60.0).abs() < 1e-9);
        let root = t.get(t.root_path()).unwrap();
        assert!((root.heat - 66.0).abs() < 1e-9);
    }

    #[test]
    fn removal_marks_subtree_ghost_but_keeps_it_indexed() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(
            Path::new("/watch/src/lib.rs"),
            NodeKind::File,
            EventKind::Add,
            now,
        );
        t.remove_node(Path::new("/watch/src"), EventKind::UnlinkDir, now);

        let dir = t.get(Path::new("/watch/src")).unwrap();
        assert!(dir.ghost);
        assert_eq!(dir.event_kind, Some(EventKind::UnlinkDir));
        let file = t.get(Path::new("/watch/src/lib.rs")).unwrap();
        assert!(file.ghost);
        assert!(t.has_ghosts());
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn fresh_ghost_heat_is_boosted() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        t.remove_node(Path::new("/watch/a.txt"), EventKind::Unlink, now);
        t.calculate_all_heat(now + Duration::from_secs(60));

        // Long after the event the decayed heat is tiny, but the ghost
        // floor keeps the deletion visible.
        let file = t.get(Path::new("/watch/a.txt")).unwrap();
        assert!(file.heat >= 90.0);
    }

    #[test]
    fn ghost_lifecycle_ends_with_full_removal() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        t.remove_node(Path::new("/watch/a.txt"), EventKind::Unlink, now);

        assert!(!t.advance_ghosts());
        assert!(!t.advance_ghosts());
        assert!(t.advance_ghosts());

        let path = Path::new("/watch/a.txt");
        assert!(t.get(path).is_none());
        assert!(!t.is_in_history(path));
        assert!(!t.has_ghosts());
        assert!(!t
            .get(t.root_path())
            .unwrap()
            .children
            .contains_key("a.txt"));
    }

    #[test]
    fn reappearing_path_cancels_its_fade() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        t.remove_node(Path::new("/watch/a.txt"), EventKind::Unlink, now);
        t.set_node(
            Path::new("/watch/a.txt"),
            NodeKind::File,
            EventKind::Add,
            now + Duration::from_millis(200),
        );

        assert!(!t.has_ghosts());
        assert!(!t.get(Path::new("/watch/a.txt")).unwrap().ghost);
        t.advance_ghosts();
        assert!(t.get(Path::new("/watch/a.txt")).is_some());
    }

    #[test]
    fn change_count_counts_hot_descendants_recursively() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(
            Path::new("/watch/src/a.rs"),
            NodeKind::File,
            EventKind::Change,
            now,
        );
        t.set_node(
            Path::new("/watch/src/sub/b.rs"),
            NodeKind::File,
            EventKind::Change,
            now,
        );
        t.set_node(Path::new("/watch/cold.txt"), NodeKind::File, EventKind::Add, now);
        t.clear_event_marks();
        t.set_node(
            Path::new("/watch/src/a.rs"),
            NodeKind::File,
            EventKind::Change,
            now,
        );
        t.set_node(
            Path::new("/watch/src/sub/b.rs"),
            NodeKind::File,
            EventKind::Change,
            now,
        );
        t.calculate_all_heat(now);

        // a.rs, sub (via aggregation), sub/b.rs are hot under src.
        assert_eq!(t.change_count(Path::new("/watch/src")), 3);
        assert_eq!(t.change_count(Path::new("/watch/cold.txt")), 0);
    }

    #[test]
    fn has_hot_items_tracks_heat_and_ghosts() {
        let mut t = tree();
        let now = Instant::now();
        assert!(!t.has_hot_items());

        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Change, now);
        t.calculate_all_heat(now);
        assert!(t.has_hot_items());

        // Cooled far past hotness, but a fading ghost still counts.
        t.calculate_all_heat(now + Duration::from_secs(600));
        assert!(!t.has_hot_items());
        t.remove_node(Path::new("/watch/a.txt"), EventKind::Unlink, now);
        assert!(t.has_hot_items());
    }

    #[test]
    fn clear_event_marks_silences_the_seeded_tree() {
        let mut t = tree();
        let now = Instant::now();
        t.set_node(Path::new("/watch/a.txt"), NodeKind::File, EventKind::Add, now);
        t.clear_event_marks();

        let file = t.get(Path::new("/watch/a.txt")).unwrap();
        assert_eq!(file.event_kind, None);
        assert_eq!(file.event_time, None);
        assert!(!t.is_in_history(Path::new("/watch/a.txt")));
        t.calculate_all_heat(now);
        assert!(!t.has_hot_items());
    }
}
