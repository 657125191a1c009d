//! The additive weight table used to rank candidate lines.
//!
//! Weights are data, not code paths: embedders can start from
//! [`WeightTable::default`] and retune individual components without
//! touching the selection logic.

/// Additive ranking components. A candidate line's weight is the sum of
/// every component that applies, plus its raw heat as a tiebreaker.
#[derive(Debug, Clone)]
pub struct WeightTable {
    /// Assigned to the root line outright; the root anchors the view.
    pub root: f64,
    /// Type component for files.
    pub file: f64,
    /// Type component for directories.
    pub directory: f64,
    /// Version-control: merge conflict.
    pub vcs_conflict: f64,
    /// Version-control: work-tree changes only.
    pub vcs_unstaged: f64,
    /// Version-control: staged plus further work-tree changes.
    pub vcs_both: f64,
    /// Version-control: staged changes only.
    pub vcs_staged: f64,
    /// Version-control: untracked.
    pub vcs_untracked: f64,
    /// Heat at or above the hot threshold.
    pub hot: f64,
    /// Last event was a deletion.
    pub event_unlink: f64,
    /// Last event was an addition.
    pub event_add: f64,
    /// Last event was a content change.
    pub event_change: f64,
    /// Last event was a rename.
    pub event_rename: f64,
    /// Directory with at least one hot descendant.
    pub hot_descendants: f64,
    /// Present in the rolling history.
    pub in_history: f64,
    /// Fading deleted entry.
    pub ghost: f64,
    /// Matches the active filter; below root, above everything else.
    pub filter_match: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            root: 10_000.0,
            file: 50.0,
            directory: 100.0,
            vcs_conflict: 800.0,
            vcs_unstaged: 700.0,
            vcs_both: 650.0,
            vcs_staged: 600.0,
            vcs_untracked: 500.0,
            hot: 350.0,
            event_unlink: 150.0,
            event_add: 75.0,
            event_change: 50.0,
            event_rename: 25.0,
            hot_descendants: 200.0,
            in_history: 100.0,
            ghost: 50.0,
            filter_match: 9_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sits_between_root_and_the_rest() {
        let w = WeightTable::default();
        assert!(w.filter_match < w.root);
        assert!(w.filter_match > w.vcs_conflict + w.directory + w.hot);
    }
}
