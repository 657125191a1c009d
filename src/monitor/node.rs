//! Node and event types for the monitored tree.
//!
//! A [`Node`] is one tracked path. Nodes never hold references to their
//! parents; walking upward is done with path arithmetic against the
//! path-indexed map owned by [`TreeState`](super::TreeState), which keeps
//! ownership a strict tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What kind of filesystem object a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A regular file (or anything that is not a directory).
    File,
    /// A directory.
    Directory,
}

impl NodeKind {
    /// Whether this is [`NodeKind::Directory`].
    pub fn is_dir(self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// The last event applied to a node.
///
/// The watcher produces the first five kinds; `Rename` is defined for
/// completeness of the weight table, and `ChildChange` is synthesized when
/// activity below a directory is propagated upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A file appeared.
    Add,
    /// A directory appeared.
    AddDir,
    /// A file's contents changed.
    Change,
    /// A file disappeared.
    Unlink,
    /// A directory disappeared.
    UnlinkDir,
    /// A path was renamed.
    Rename,
    /// Something below this directory changed.
    ChildChange,
}

impl EventKind {
    /// Whether this is one of the two deletion kinds.
    pub fn is_unlink(self) -> bool {
        matches!(self, EventKind::Unlink | EventKind::UnlinkDir)
    }
}

/// One tracked path in the monitored tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Absolute path; acts as the identity key in the tree index.
    pub path: PathBuf,
    /// Last path component.
    pub name: String,
    /// File or directory.
    pub kind: NodeKind,
    /// Children by name, as links into the path index. Order here is not
    /// semantic; display order is decided at layout time.
    pub children: BTreeMap<String, PathBuf>,
    /// Last event applied to this node, if any.
    pub event_kind: Option<EventKind>,
    /// When that event happened.
    pub event_time: Option<Instant>,
    /// Recency score in `[0, MAX_HEAT]`, recomputed per render.
    pub heat: f64,
    /// True once the node was deleted but is still being shown fading out.
    pub ghost: bool,
    /// How many ghost ticks this node has faded through.
    pub ghost_step: u8,
}

impl Node {
    /// Create a node with no event history.
    pub fn new(path: PathBuf, kind: NodeKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            name,
            kind,
            children: BTreeMap::new(),
            event_kind: None,
            event_time: None,
            heat: 0.0,
            ghost: false,
            ghost_step: 0,
        }
    }

    /// Link a child into this directory's child map.
    pub fn link_child(&mut self, child: &Path) {
        if let Some(name) = child.file_name() {
            self.children
                .insert(name.to_string_lossy().into_owned(), child.to_path_buf());
        }
    }

    /// Remove a child link by path.
    pub fn unlink_child(&mut self, child: &Path) {
        if let Some(name) = child.file_name() {
            self.children.remove(name.to_string_lossy().as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_is_last_component() {
        let node = Node::new(PathBuf::from("/watch/src/main.rs"), NodeKind::File);
        assert_eq!(node.name, "main.rs");
    }

    #[test]
    fn link_and_unlink_child() {
        let mut dir = Node::new(PathBuf::from("/watch/src"), NodeKind::Directory);
        dir.link_child(Path::new("/watch/src/lib.rs"));
        assert_eq!(
            dir.children.get("lib.rs"),
            Some(&PathBuf::from("/watch/src/lib.rs"))
        );

        dir.unlink_child(Path::new("/watch/src/lib.rs"));
        assert!(dir.children.is_empty());
    }
}
