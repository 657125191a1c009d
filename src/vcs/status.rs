//! Git working-tree status snapshots.
//!
//! Status is collected with `git status --porcelain` run in the watch root,
//! classified per path, aggregated up to directories, and cached behind a
//! 1 s TTL. Every failure mode (no git, no repository, no upstream, broken
//! or oversized output, timeout) is swallowed and leaves the previous
//! snapshot intact; this subsystem must never take the monitor down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

/// How long a collected snapshot stays fresh.
const SNAPSHOT_TTL: Duration = Duration::from_secs(1);

/// Hard deadline for one refresh, subprocesses included.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(2);

/// Captured porcelain output larger than this is discarded.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Classification of a path's working-tree state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Merge conflict (`U` in either column, `AA`, or `DD`).
    Conflict,
    /// Work-tree changes only.
    Unstaged,
    /// Staged and further work-tree changes on top.
    Both,
    /// Staged changes only.
    Staged,
    /// Not tracked (`??`).
    Untracked,
}

impl StatusClass {
    /// Priority used when aggregating to directories; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            StatusClass::Conflict => 5,
            StatusClass::Unstaged => 4,
            StatusClass::Both => 3,
            StatusClass::Staged => 2,
            StatusClass::Untracked => 1,
        }
    }

    /// Glyph shown next to the entry. `Both` renders with the unstaged
    /// glyph.
    pub fn symbol(self) -> &'static str {
        match self {
            StatusClass::Conflict => "✖",
            StatusClass::Unstaged | StatusClass::Both => "✱",
            StatusClass::Staged => "✚",
            StatusClass::Untracked => "?",
        }
    }

    /// Color bucket name, mapped to a terminal color by the renderer.
    /// `Both` renders with the unstaged color.
    pub fn color(self) -> &'static str {
        match self {
            StatusClass::Conflict => "red",
            StatusClass::Unstaged | StatusClass::Both => "yellow",
            StatusClass::Staged => "green",
            StatusClass::Untracked => "dim",
        }
    }
}

/// One consistent view of the repository's status.
#[derive(Debug, Default, Clone)]
pub struct VcsSnapshot {
    /// Classified files by absolute path.
    pub files: HashMap<PathBuf, StatusClass>,
    /// Directory status derived as max-priority over descendants.
    pub dirs: HashMap<PathBuf, StatusClass>,
    /// Commits ahead of the upstream branch.
    pub ahead: u32,
    /// Commits behind the upstream branch.
    pub behind: u32,
}

impl VcsSnapshot {
    /// Status of a path given its kind (files and directories live in
    /// separate maps).
    pub fn status_for(&self, path: &Path, is_dir: bool) -> Option<StatusClass> {
        if is_dir {
            self.dirs.get(path).copied()
        } else {
            self.files.get(path).copied()
        }
    }
}

/// TTL-cached status source.
///
/// Readers always see a complete snapshot: a refresh assembles the new maps
/// off to the side and swaps them in whole.
pub struct VcsStatusCache {
    watch_root: PathBuf,
    enabled: bool,
    snapshot: VcsSnapshot,
    last_refresh: Option<Instant>,
}

impl VcsStatusCache {
    /// Create a cache for the watch root. With `enabled` false the
    /// snapshot stays permanently empty and refreshes are no-ops.
    pub fn new(watch_root: PathBuf, enabled: bool) -> Self {
        Self {
            watch_root,
            enabled,
            snapshot: VcsSnapshot::default(),
            last_refresh: None,
        }
    }

    /// The current snapshot, or `None` when the integration is disabled.
    pub fn snapshot(&self) -> Option<&VcsSnapshot> {
        self.enabled.then_some(&self.snapshot)
    }

    /// Refresh the snapshot if the TTL has lapsed. Failures keep the
    /// previous snapshot.
    pub async fn refresh(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(at) = self.last_refresh {
            if at.elapsed() < SNAPSHOT_TTL {
                return;
            }
        }
        self.last_refresh = Some(Instant::now());

        match tokio::time::timeout(REFRESH_TIMEOUT, collect(&self.watch_root)).await {
            Ok(Some(snapshot)) => self.snapshot = snapshot,
            Ok(None) => {}
            Err(_) => debug!("vcs refresh timed out"),
        }
    }
}

/// Assemble a full snapshot, or `None` on any failure.
async fn collect(watch_root: &Path) -> Option<VcsSnapshot> {
    let git_root = toplevel(watch_root).await?;

    let output = Command::new("git")
        .arg("-C")
        .arg(watch_root)
        .args(["status", "--porcelain"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    if output.stdout.len() > MAX_OUTPUT_BYTES {
        debug!(bytes = output.stdout.len(), "porcelain output over cap, discarded");
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let files = parse_porcelain(&text, &git_root, watch_root);
    let dirs = aggregate_dirs(&files, watch_root);
    let (ahead, behind) = ahead_behind(watch_root).await;

    Some(VcsSnapshot {
        files,
        dirs,
        ahead,
        behind,
    })
}

async fn toplevel(root: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let path = PathBuf::from(text.trim());
    Some(std::fs::canonicalize(&path).unwrap_or(path))
}

async fn ahead_behind(root: &Path) -> (u32, u32) {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["rev-list", "--left-right", "--count", "HEAD...@{upstream}"])
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => {
            parse_ahead_behind(&String::from_utf8_lossy(&output.stdout))
        }
        _ => (0, 0),
    }
}

/// Parse `rev-list --left-right --count` output (`"<ahead>\t<behind>"`).
fn parse_ahead_behind(text: &str) -> (u32, u32) {
    let mut parts = text.split_whitespace();
    let ahead = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let behind = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    (ahead, behind)
}

/// Classify a porcelain two-column code. Returns `None` for clean lines.
fn classify(index: char, worktree: char) -> Option<StatusClass> {
    if index == 'U'
        || worktree == 'U'
        || (index == 'A' && worktree == 'A')
        || (index == 'D' && worktree == 'D')
    {
        return Some(StatusClass::Conflict);
    }
    if index == '?' && worktree == '?' {
        return Some(StatusClass::Untracked);
    }
    let index_set = index != ' ' && index != '?';
    let worktree_set = worktree != ' ' && worktree != '?';
    match (index_set, worktree_set) {
        (true, true) => Some(StatusClass::Both),
        (false, true) => Some(StatusClass::Unstaged),
        (true, false) => Some(StatusClass::Staged),
        (false, false) => None,
    }
}

/// Parse porcelain lines into classified absolute paths under the watch
/// root. Porcelain paths are relative to the repository top-level; rename
/// lines (`old -> new`) classify only the right-hand path.
fn parse_porcelain(
    text: &str,
    git_root: &Path,
    watch_root: &Path,
) -> HashMap<PathBuf, StatusClass> {
    let mut files = HashMap::new();
    for line in text.lines() {
        if line.len() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        let Some(class) = classify(index, worktree) else {
            continue;
        };

        let mut path_part = line[3..].trim();
        if let Some(arrow) = path_part.rfind(" -> ") {
            path_part = &path_part[arrow + 4..];
        }
        let path_part = path_part.trim_matches('"');
        if path_part.is_empty() {
            continue;
        }

        let abs = git_root.join(path_part);
        if abs.starts_with(watch_root) {
            files.insert(abs, class);
        }
    }
    files
}

/// Derive directory status as the max-priority class over descendants, for
/// every ancestor up to and including the watch root.
fn aggregate_dirs(
    files: &HashMap<PathBuf, StatusClass>,
    watch_root: &Path,
) -> HashMap<PathBuf, StatusClass> {
    let mut dirs: HashMap<PathBuf, StatusClass> = HashMap::new();
    for (path, class) in files {
        let mut cursor = path.parent();
        while let Some(dir) = cursor {
            if !dir.starts_with(watch_root) {
                break;
            }
            dirs.entry(dir.to_path_buf())
                .and_modify(|existing| {
                    if class.priority() > existing.priority() {
                        *existing = *class;
                    }
                })
                .or_insert(*class);
            if dir == watch_root {
                break;
            }
            cursor = dir.parent();
        }
    }
    dirs
}
