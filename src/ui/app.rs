//! The orchestrator: one task that owns the tree, multiplexes every event
//! source, and runs a single layout-and-render pass per mutation batch.
//!
//! Suspension points are exactly the select arms: the watcher poll tick,
//! the ghost and breath timers, terminal input, and the VCS refresh after
//! a flush. No tree mutation straddles an await.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event as TermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::layout::{compute_layout, LayoutResult, WeightTable};
use crate::monitor::filter::FilterMatcher;
use crate::monitor::node::{EventKind, NodeKind};
use crate::monitor::tree_state::TreeState;
use crate::ui::input::{action_for, InteractiveState, KeyAction};
use crate::ui::render::{self, HeaderStats};
use crate::vcs::VcsStatusCache;
use crate::watch::{build_ignore_set, scan_inventory, DebouncedWatcher, FsChange, WatcherError};

/// How often the watcher's raw channel is drained.
const WATCHER_POLL_MS: u64 = 50;

/// Ghost fade cadence.
const GHOST_TICK_MS: u64 = 1_000;

/// The interactive monitor application.
pub struct App {
    tree: TreeState,
    watcher: DebouncedWatcher,
    vcs: VcsStatusCache,
    weights: WeightTable,
    filter: Option<FilterMatcher>,
    ui: InteractiveState,
    layout: LayoutResult,
    ignore: globset::GlobSet,
    breathe: Duration,
    needs_autojump: bool,
    should_quit: bool,
}

impl App {
    /// Wire up the watcher, tree, and VCS cache for a resolved root path.
    pub fn new(root: PathBuf, args: &Cli) -> Result<Self, WatcherError> {
        let ignore = build_ignore_set(&args.ignore)?;
        let watcher = DebouncedWatcher::new(root.clone(), args.interval, ignore.clone())?;
        let tree = TreeState::new(root.clone(), args.history, args.ghost_steps);
        let vcs = VcsStatusCache::new(root.clone(), !args.no_git);

        Ok(Self {
            layout: LayoutResult::empty(root),
            tree,
            watcher,
            vcs,
            weights: WeightTable::default(),
            filter: None,
            ui: InteractiveState::default(),
            ignore,
            breathe: Duration::from_millis(args.breathe),
            needs_autojump: false,
            should_quit: false,
        })
    }

    /// Run until Ctrl+C. Seeds the tree from the initial inventory, then
    /// serializes watcher flushes, timers, and input through one select
    /// loop with a render pass after every mutation.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.watcher.watch()?;
        self.seed_inventory();
        self.vcs.refresh().await;
        self.render(&mut terminal)?;

        let mut poll = tokio::time::interval(Duration::from_millis(WATCHER_POLL_MS));
        let mut ghost_tick = tokio::time::interval(Duration::from_millis(GHOST_TICK_MS));
        let mut breath = tokio::time::interval(self.breathe);
        let mut events = EventStream::new();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                biased;

                _ = &mut ctrl_c => {
                    info!("interrupt received, shutting down");
                    break;
                }

                Some(event) = events.next() => {
                    match event {
                        Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key);
                            if self.should_quit {
                                break;
                            }
                            self.render(&mut terminal)?;
                        }
                        Ok(TermEvent::Resize(_, _)) => {
                            self.render(&mut terminal)?;
                        }
                        Ok(_) => {}
                        Err(err) => debug!(%err, "terminal event error"),
                    }
                }

                _ = poll.tick() => {
                    self.watcher.poll_events();
                    let batch = self.watcher.flush_if_ready();
                    if !batch.is_empty() {
                        self.apply_batch(batch);
                        self.vcs.refresh().await;
                        self.render(&mut terminal)?;
                    }
                }

                _ = ghost_tick.tick() => {
                    if self.tree.has_ghosts() {
                        self.tree.advance_ghosts();
                        self.render(&mut terminal)?;
                    }
                }

                _ = breath.tick() => {
                    // Redraw while anything is hot or fading so decay is
                    // visible between filesystem events.
                    if self.tree.has_hot_items() {
                        self.render(&mut terminal)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Seed the tree from a full walk, then clear event marks so the walk
    /// itself is not displayed as activity.
    fn seed_inventory(&mut self) {
        let now = Instant::now();
        let root = self.tree.root_path().to_path_buf();
        let inventory = scan_inventory(&root, &self.ignore);
        info!(entries = inventory.len(), root = %root.display(), "seeded inventory");
        for (path, kind) in inventory {
            let event = match kind {
                NodeKind::Directory => EventKind::AddDir,
                NodeKind::File => EventKind::Add,
            };
            self.tree.set_node(&path, kind, event, now);
        }
        self.tree.clear_event_marks();
    }

    /// Apply one debounced batch in arrival order.
    fn apply_batch(&mut self, batch: Vec<FsChange>) {
        let now = Instant::now();
        for change in batch {
            match change.kind {
                EventKind::Unlink | EventKind::UnlinkDir => {
                    // The tree's recorded kind beats the watcher's guess:
                    // a removed path can no longer be stat'ed.
                    let was_dir = match self.tree.node_kind(&change.path) {
                        Some(kind) => kind.is_dir(),
                        None => change.is_directory,
                    };
                    let event = if was_dir {
                        EventKind::UnlinkDir
                    } else {
                        EventKind::Unlink
                    };
                    self.tree.remove_node(&change.path, event, now);
                }
                kind => {
                    let node_kind = if change.is_directory {
                        NodeKind::Directory
                    } else {
                        NodeKind::File
                    };
                    self.tree.set_node(&change.path, node_kind, kind, now);
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match action_for(key, self.ui.filter_mode) {
            KeyAction::Quit => self.should_quit = true,
            KeyAction::CursorUp => {
                self.ui.cursor_index = self.ui.cursor_index.saturating_sub(1);
            }
            KeyAction::CursorDown => {
                let last = self.layout.lines.len().saturating_sub(1);
                self.ui.cursor_index = (self.ui.cursor_index + 1).min(last);
            }
            KeyAction::Open => {
                if let Some(line) = self.layout.lines.get(self.ui.cursor_index) {
                    // Fire-and-forget; a missing handler is not our problem.
                    let _ = open::that_detached(&line.path);
                }
                self.ui.filter_mode = false;
            }
            KeyAction::EnterFilter => {
                self.ui.filter_mode = true;
                self.ui.filter_pattern.clear();
                self.filter = None;
                self.ui.cursor_index = 0;
            }
            KeyAction::ClearFilter => {
                self.ui.filter_mode = false;
                self.ui.filter_pattern.clear();
                self.filter = None;
            }
            KeyAction::FilterInput(c) => {
                self.ui.filter_pattern.push(c);
                self.on_filter_edit();
            }
            KeyAction::FilterBackspace => {
                self.ui.filter_pattern.pop();
                self.on_filter_edit();
            }
            KeyAction::Noop => {}
        }
    }

    fn on_filter_edit(&mut self) {
        self.filter = (!self.ui.filter_pattern.is_empty())
            .then(|| FilterMatcher::new(&self.ui.filter_pattern));
        self.ui.cursor_index = 0;
        self.needs_autojump = true;
    }

    /// One layout-and-render pass: recompute heats, lay out for the
    /// current terminal size, fix up the cursor, and paint.
    fn render(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let now = Instant::now();
        self.tree.calculate_all_heat(now);

        let rows = terminal.size()?.height;
        self.layout = compute_layout(
            &self.tree,
            self.vcs.snapshot(),
            self.filter.as_ref(),
            &self.weights,
            rows,
        );

        let last = self.layout.lines.len().saturating_sub(1);
        self.ui.cursor_index = self.ui.cursor_index.min(last);
        if self.needs_autojump {
            self.needs_autojump = false;
            let mut matches = self
                .layout
                .lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.filter_match.is_some())
                .map(|(i, _)| i);
            if let (Some(only), None) = (matches.next(), matches.next()) {
                self.ui.cursor_index = only;
            }
        }

        let stats = HeaderStats {
            hot_files: self.tree.hot_file_count(),
            fading: self.tree.ghost_count(),
        };
        terminal.draw(|frame| {
            render::draw(
                frame,
                &self.layout,
                self.vcs.snapshot(),
                &self.ui,
                stats,
                self.watcher.last_error(),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::path::Path;
    use tempfile::tempdir;

    fn app_in(dir: &Path) -> App {
        let args = Cli::for_path(dir);
        App::new(dir.to_path_buf(), &args).unwrap()
    }

    #[tokio::test]
    async fn batch_application_creates_and_removes_nodes() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path());
        let file = dir.path().join("a.txt");

        app.apply_batch(vec![FsChange {
            path: file.clone(),
            kind: EventKind::Add,
            is_directory: false,
        }]);
        assert!(app.tree.get(&file).is_some());

        app.apply_batch(vec![FsChange {
            path: file.clone(),
            kind: EventKind::Unlink,
            is_directory: false,
        }]);
        let node = app.tree.get(&file).unwrap();
        assert!(node.ghost);
        assert_eq!(node.event_kind, Some(EventKind::Unlink));
    }

    #[tokio::test]
    async fn unlink_kind_is_resolved_from_the_tree() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path());
        let sub = dir.path().join("sub");

        app.apply_batch(vec![FsChange {
            path: sub.clone(),
            kind: EventKind::AddDir,
            is_directory: true,
        }]);
        // The watcher could not stat the removed path and guessed "file".
        app.apply_batch(vec![FsChange {
            path: sub.clone(),
            kind: EventKind::Unlink,
            is_directory: false,
        }]);

        assert_eq!(
            app.tree.get(&sub).unwrap().event_kind,
            Some(EventKind::UnlinkDir)
        );
    }

    #[tokio::test]
    async fn filter_editing_resets_cursor_and_requests_autojump() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path());

        app.handle_key(KeyEvent::new(KeyCode::Char('/'), KeyModifiers::NONE));
        assert!(app.ui.filter_mode);
        assert!(app.ui.filter_pattern.is_empty());

        app.handle_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert_eq!(app.ui.filter_pattern, "a");
        assert_eq!(app.ui.cursor_index, 0);
        assert!(app.needs_autojump);
        assert!(app.filter.is_some());

        app.handle_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE));
        assert!(app.ui.filter_pattern.is_empty());
        // An empty pattern means no filter at all.
        assert!(app.filter.is_none());

        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.ui.filter_mode);
    }

    #[tokio::test]
    async fn cursor_is_clamped_to_the_visible_lines() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path());
        // No layout yet: the cursor cannot move anywhere.
        app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(app.ui.cursor_index, 0);
        app.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(app.ui.cursor_index, 0);
    }

    #[tokio::test]
    async fn ctrl_c_sets_the_quit_flag() {
        let dir = tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
