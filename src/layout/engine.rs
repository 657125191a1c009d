//! The layout engine: flatten the tree, weigh every candidate line, and
//! select the top-K that fit the terminal while preserving display order.
//!
//! Selection makes no attempt to keep ancestry closed; a chosen leaf may
//! appear without its intermediate directories. Each line therefore carries
//! a precomputed `parent_continues` vector so the renderer can draw the
//! tree prefix without looking anything up.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::monitor::filter::{FilterMatch, FilterMatcher};
use crate::monitor::heat;
use crate::monitor::node::{EventKind, Node, NodeKind};
use crate::monitor::tree_state::TreeState;
use crate::vcs::status::{StatusClass, VcsSnapshot};

use super::weights::WeightTable;

/// Rows reserved above the tree.
pub const HEADER_ROWS: usize = 2;

/// Rows reserved below the tree.
pub const FOOTER_ROWS: usize = 1;

/// The row budget never drops below this.
pub const MIN_ROWS: usize = 5;

/// Sibling heats within this band do not reorder; the name tiebreak holds.
const HEAT_ORDER_DEAD_BAND: f64 = 5.0;

/// What a line represents. Presently only tree nodes; reserved for future
/// indicator rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A tree node row.
    Node,
}

/// One candidate (and, after selection, displayed) line. A line is a
/// self-contained snapshot; the renderer needs no live reference into the
/// tree.
#[derive(Debug, Clone)]
pub struct LayoutLine {
    /// What this line represents.
    pub line_kind: LineKind,
    /// Absolute path of the represented node.
    pub path: PathBuf,
    /// Last path component.
    pub name: String,
    /// File or directory.
    pub kind: NodeKind,
    /// Last event applied to the node.
    pub event_kind: Option<EventKind>,
    /// Heat as of this layout pass.
    pub heat: f64,
    /// Whether the node is fading out after deletion.
    pub ghost: bool,
    /// Fade progress for ghosts.
    pub ghost_step: u8,
    /// Hot descendant count; drives the "(N changes)" annotation.
    pub hot_descendants: usize,
    /// Depth below the root (the root is 0).
    pub depth: usize,
    /// Whether this node is the last of its siblings in display order.
    pub is_last_sibling: bool,
    /// For each ancestor level below the root, whether that ancestor has a
    /// later sibling (the renderer draws a vertical bar there).
    pub parent_continues: Vec<bool>,
    /// 0-based ordinal in the preorder flattening.
    pub display_order: usize,
    /// Additive rank; higher survives trimming first.
    pub weight: f64,
    /// Present when the node matches the active filter.
    pub filter_match: Option<FilterMatch>,
}

/// The outcome of one layout pass.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    /// Selected lines in display order.
    pub lines: Vec<LayoutLine>,
    /// Candidate count before trimming.
    pub total_rows: usize,
    /// Row budget the selection fit into.
    pub available_rows: usize,
    /// True when trimming dropped candidates.
    pub collapsed: bool,
    /// The watched root, for the renderer.
    pub root_path: PathBuf,
}

impl LayoutResult {
    /// An empty result for startup, before the first pass.
    pub fn empty(root_path: PathBuf) -> Self {
        Self {
            lines: Vec::new(),
            total_rows: 0,
            available_rows: 0,
            collapsed: false,
            root_path,
        }
    }
}

/// Run one full layout pass over a tree whose heats are current.
pub fn compute_layout(
    tree: &TreeState,
    vcs: Option<&VcsSnapshot>,
    filter: Option<&FilterMatcher>,
    weights: &WeightTable,
    terminal_rows: u16,
) -> LayoutResult {
    let mut candidates = Vec::new();
    let root = tree.root_path().to_path_buf();
    flatten(
        tree, vcs, filter, weights, &mut candidates, &root, 0, &[], true,
    );

    let available = (terminal_rows as usize)
        .saturating_sub(HEADER_ROWS + FOOTER_ROWS)
        .max(MIN_ROWS);
    let total = candidates.len();

    let lines = if total <= available {
        candidates
    } else {
        select(candidates, available)
    };

    LayoutResult {
        collapsed: lines.len() < total,
        lines,
        total_rows: total,
        available_rows: available,
        root_path: root,
    }
}

/// Keep the `available` heaviest candidates and restore display order. The
/// root always survives: it anchors the view, so it displaces the weakest
/// pick if it ever loses on weight.
fn select(candidates: Vec<LayoutLine>, available: usize) -> Vec<LayoutLine> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .weight
            .partial_cmp(&candidates[a].weight)
            .unwrap_or(Ordering::Equal)
    });

    let mut chosen: Vec<usize> = order.into_iter().take(available).collect();
    if !chosen.contains(&0) {
        chosen.pop();
        chosen.push(0);
    }
    chosen.sort_unstable();

    let mut lines = Vec::with_capacity(chosen.len());
    let mut by_order: Vec<Option<LayoutLine>> = candidates.into_iter().map(Some).collect();
    for index in chosen {
        if let Some(line) = by_order[index].take() {
            lines.push(line);
        }
    }
    lines
}

#[allow(clippy::too_many_arguments)]
fn flatten(
    tree: &TreeState,
    vcs: Option<&VcsSnapshot>,
    filter: Option<&FilterMatcher>,
    weights: &WeightTable,
    out: &mut Vec<LayoutLine>,
    path: &Path,
    depth: usize,
    continues: &[bool],
    is_last: bool,
) {
    let Some(node) = tree.get(path) else {
        return;
    };

    let rel = relative_path(tree.root_path(), path);
    let filter_match = filter.and_then(|f| f.match_node(&node.name, &rel, node.kind));
    let hot_descendants = if node.kind.is_dir() {
        tree.change_count(path)
    } else {
        0
    };
    let weight = if depth == 0 {
        weights.root
    } else {
        weigh(node, vcs, weights, hot_descendants, filter_match.is_some(), tree)
    };

    out.push(LayoutLine {
        line_kind: LineKind::Node,
        path: node.path.clone(),
        name: node.name.clone(),
        kind: node.kind,
        event_kind: node.event_kind,
        heat: node.heat,
        ghost: node.ghost,
        ghost_step: node.ghost_step,
        hot_descendants,
        depth,
        is_last_sibling: is_last,
        parent_continues: continues.to_vec(),
        display_order: out.len(),
        weight,
        filter_match,
    });

    if !node.kind.is_dir() {
        return;
    }

    let mut children: Vec<&Node> = node
        .children
        .values()
        .filter_map(|p| tree.get(p))
        .collect();
    children.sort_by(|a, b| compare_siblings(a, b, vcs));

    let child_continues: Vec<bool> = if depth == 0 {
        Vec::new()
    } else {
        let mut c = continues.to_vec();
        c.push(!is_last);
        c
    };

    let count = children.len();
    let child_paths: Vec<PathBuf> = children.into_iter().map(|n| n.path.clone()).collect();
    for (i, child) in child_paths.iter().enumerate() {
        flatten(
            tree,
            vcs,
            filter,
            weights,
            out,
            child,
            depth + 1,
            &child_continues,
            i + 1 == count,
        );
    }
}

/// Sibling display order: directories first, then status-carrying entries
/// when VCS data is present, then heat descending outside a dead-band to
/// avoid flicker, then case-insensitive name.
fn compare_siblings(a: &Node, b: &Node, vcs: Option<&VcsSnapshot>) -> Ordering {
    let dir_order = b.kind.is_dir().cmp(&a.kind.is_dir());
    if dir_order != Ordering::Equal {
        return dir_order;
    }

    if let Some(vcs) = vcs {
        let a_has = vcs.status_for(&a.path, a.kind.is_dir()).is_some();
        let b_has = vcs.status_for(&b.path, b.kind.is_dir()).is_some();
        let status_order = b_has.cmp(&a_has);
        if status_order != Ordering::Equal {
            return status_order;
        }
    }

    if (a.heat - b.heat).abs() > HEAT_ORDER_DEAD_BAND {
        return b.heat.partial_cmp(&a.heat).unwrap_or(Ordering::Equal);
    }

    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Sum the additive components for a non-root line.
fn weigh(
    node: &Node,
    vcs: Option<&VcsSnapshot>,
    weights: &WeightTable,
    hot_descendants: usize,
    filter_matched: bool,
    tree: &TreeState,
) -> f64 {
    let mut weight = match node.kind {
        NodeKind::File => weights.file,
        NodeKind::Directory => weights.directory,
    };

    if let Some(vcs) = vcs {
        if let Some(class) = vcs.status_for(&node.path, node.kind.is_dir()) {
            weight += match class {
                StatusClass::Conflict => weights.vcs_conflict,
                StatusClass::Unstaged => weights.vcs_unstaged,
                StatusClass::Both => weights.vcs_both,
                StatusClass::Staged => weights.vcs_staged,
                StatusClass::Untracked => weights.vcs_untracked,
            };
        }
    }

    if heat::is_hot(node.heat) {
        weight += weights.hot;
    }

    if let Some(event) = node.event_kind {
        weight += match event {
            EventKind::Unlink | EventKind::UnlinkDir => weights.event_unlink,
            EventKind::Add | EventKind::AddDir => weights.event_add,
            EventKind::Change => weights.event_change,
            EventKind::Rename => weights.event_rename,
            _ => 0.0,
        };
    }

    if node.kind.is_dir() && hot_descendants > 0 {
        weight += weights.hot_descendants;
    }
    if tree.is_in_history(&node.path) {
        weight += weights.in_history;
    }
    if node.ghost {
        weight += weights.ghost;
    }
    if filter_matched {
        weight += weights.filter_match;
    }

    // Raw heat breaks ties between otherwise identical lines.
    weight + node.heat
}

/// Root-relative path with `/` separators, empty for the root itself.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default()
}
