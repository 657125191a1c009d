//! Filter patterns over node names and root-relative paths.
//!
//! A pattern is compiled once per edit into a matcher; layout asks it about
//! every candidate line. Matching a node does not imply its ancestors match:
//! ancestors are still drawn to position the match but carry no match
//! descriptor of their own.

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::monitor::node::NodeKind;

/// How a node matched the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The pattern contained `*` or `?` and matched as a glob.
    Glob,
    /// Plain substring or exact text match.
    Text,
}

/// Match descriptor attached to a layout line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterMatch {
    /// Glob or plain text.
    pub kind: MatchKind,
}

enum Compiled {
    /// Substring of the node name, case-insensitive.
    NameText(String),
    /// Glob against the node name.
    NameGlob(GlobMatcher),
    /// Exact relative path, case-insensitive; matches the entry itself.
    PathExact(String),
    /// Substring of the relative path, case-insensitive, files only.
    PathText(String),
    /// Glob against the relative path, `**` crossing any depth.
    PathGlob(GlobMatcher),
}

/// A compiled filter pattern.
pub struct FilterMatcher {
    pattern: String,
    compiled: Option<Compiled>,
}

impl FilterMatcher {
    /// Compile a pattern string. An empty pattern matches nothing; a glob
    /// that fails to compile also matches nothing.
    pub fn new(pattern: &str) -> Self {
        let compiled = compile(pattern);
        Self {
            pattern: pattern.to_string(),
            compiled,
        }
    }

    /// The raw pattern as typed.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a node by name and root-relative path (`/`-separated).
    pub fn match_node(&self, name: &str, rel_path: &str, kind: NodeKind) -> Option<FilterMatch> {
        let compiled = self.compiled.as_ref()?;
        let matched = match compiled {
            Compiled::NameText(needle) => name.to_lowercase().contains(needle),
            Compiled::NameGlob(glob) => glob.is_match(name),
            Compiled::PathExact(want) => rel_path.to_lowercase() == *want,
            Compiled::PathText(needle) => {
                kind == NodeKind::File && rel_path.to_lowercase().contains(needle)
            }
            Compiled::PathGlob(glob) => glob.is_match(rel_path),
        };
        matched.then(|| FilterMatch {
            kind: match compiled {
                Compiled::NameGlob(_) | Compiled::PathGlob(_) => MatchKind::Glob,
                _ => MatchKind::Text,
            },
        })
    }
}

fn compile(pattern: &str) -> Option<Compiled> {
    if pattern.is_empty() {
        return None;
    }
    let is_glob = pattern.contains('*') || pattern.contains('?');

    if pattern.contains('/') {
        let cleaned = pattern.strip_prefix('/').unwrap_or(pattern);
        if cleaned.is_empty() {
            return None;
        }
        if is_glob {
            return build_glob(cleaned).map(Compiled::PathGlob);
        }
        if cleaned.contains('/') {
            return Some(Compiled::PathText(cleaned.to_lowercase()));
        }
        return Some(Compiled::PathExact(cleaned.to_lowercase()));
    }

    if is_glob {
        build_glob(pattern).map(Compiled::NameGlob)
    } else {
        Some(Compiled::NameText(pattern.to_lowercase()))
    }
}

fn build_glob(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
    {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(err) => {
            debug!(pattern, %err, "filter glob failed to compile");
            None
        }
    }
}
