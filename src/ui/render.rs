//! Purely presentational: turn a layout result into a ratatui frame.
//!
//! Every line is rendered from its own snapshot; the tree prefix comes
//! from the precomputed `parent_continues` vector, so a line draws
//! correctly even when its ancestor rows were trimmed away.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::layout::{LayoutLine, LayoutResult};
use crate::monitor::heat;
use crate::ui::input::InteractiveState;
use crate::vcs::VcsSnapshot;

/// Map a color bucket name to a terminal color.
fn color_from_name(name: &str) -> Color {
    match name {
        "bright_red" => Color::LightRed,
        "red" => Color::Red,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "blue" => Color::Blue,
        "yellow" => Color::Yellow,
        "green" => Color::Green,
        "dim" => Color::DarkGray,
        _ => Color::Reset,
    }
}

/// Summary counters shown in the header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderStats {
    /// Hot files as of the last heat pass.
    pub hot_files: usize,
    /// Deleted entries still fading.
    pub fading: usize,
}

/// Paint one full frame.
pub fn draw(
    frame: &mut Frame,
    layout: &LayoutResult,
    vcs: Option<&VcsSnapshot>,
    ui: &InteractiveState,
    stats: HeaderStats,
    watcher_error: Option<&str>,
) {
    let areas = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(frame.area());

    draw_header(frame, areas[0], layout, vcs, stats);
    draw_tree(frame, areas[1], layout, vcs, ui);
    draw_footer(frame, areas[2], layout, ui, watcher_error);
}

fn draw_header(
    frame: &mut Frame,
    area: Rect,
    layout: &LayoutResult,
    vcs: Option<&VcsSnapshot>,
    stats: HeaderStats,
) {
    let mut spans = vec![Span::styled(
        layout.root_path.display().to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    if let Some(vcs) = vcs {
        if vcs.ahead > 0 || vcs.behind > 0 {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("↑{} ↓{}", vcs.ahead, vcs.behind),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    if stats.hot_files > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} hot", stats.hot_files),
            Style::default().fg(Color::Red),
        ));
    }
    if stats.fading > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} fading", stats.fading),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let rule = "─".repeat(area.width as usize);
    let text = Text::from(vec![
        Line::from(spans),
        Line::from(Span::styled(rule, Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(Paragraph::new(text), area);
}

fn draw_tree(
    frame: &mut Frame,
    area: Rect,
    layout: &LayoutResult,
    vcs: Option<&VcsSnapshot>,
    ui: &InteractiveState,
) {
    let lines: Vec<Line> = layout
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let rendered = render_line(line, vcs);
            if i == ui.cursor_index {
                rendered.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                rendered
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_footer(
    frame: &mut Frame,
    area: Rect,
    layout: &LayoutResult,
    ui: &InteractiveState,
    watcher_error: Option<&str>,
) {
    let mut spans: Vec<Span> = Vec::new();

    if ui.filter_mode {
        spans.push(Span::styled("/", Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
            ui.filter_pattern.clone(),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    } else if let Some(err) = watcher_error {
        spans.push(Span::styled(
            format!("watcher: {err}"),
            Style::default().fg(Color::Red),
        ));
    } else {
        let help = if ui.filter_pattern.is_empty() {
            "↑/↓ move · ⏎ open · / filter · ctrl-c quit".to_string()
        } else {
            format!("filter: {} · esc clear", ui.filter_pattern)
        };
        spans.push(Span::styled(help, Style::default().fg(Color::DarkGray)));
    }

    if layout.collapsed {
        let hidden = layout.total_rows - layout.lines.len();
        spans.push(Span::styled(
            format!(" · +{hidden} more"),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Build the styled spans for a single tree row.
fn render_line(line: &LayoutLine, vcs: Option<&VcsSnapshot>) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();

    let prefix = tree_prefix(line);
    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(Color::DarkGray)));
    }

    if let Some(vcs) = vcs {
        if let Some(class) = vcs.status_for(&line.path, line.kind.is_dir()) {
            spans.push(Span::styled(
                format!("{} ", class.symbol()),
                Style::default().fg(color_from_name(class.color())),
            ));
        }
    }

    let mut name_style = Style::default().fg(color_from_name(heat::heat_color(line.heat)));
    if line.kind.is_dir() {
        name_style = name_style.add_modifier(Modifier::BOLD);
    }
    if line.ghost {
        name_style = name_style.add_modifier(Modifier::DIM | Modifier::CROSSED_OUT);
    }
    if line.filter_match.is_some() {
        name_style = name_style.add_modifier(Modifier::UNDERLINED);
    }

    let name = if line.depth == 0 {
        line.path.display().to_string()
    } else if line.kind.is_dir() {
        format!("{}/", line.name)
    } else {
        line.name.clone()
    };
    spans.push(Span::styled(name, name_style));

    if line.kind.is_dir() && line.hot_descendants > 0 {
        let plural = if line.hot_descendants == 1 { "" } else { "s" };
        spans.push(Span::styled(
            format!(" ({} change{plural})", line.hot_descendants),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let filled = heat::bar_cells(line.heat);
    if filled > 0 {
        let bar = format!(
            " {}{}",
            "█".repeat(filled),
            "░".repeat(heat::BAR_SEGMENTS - filled)
        );
        spans.push(Span::styled(
            bar,
            Style::default().fg(color_from_name(heat::heat_color(line.heat))),
        ));
    }

    Line::from(spans)
}

/// Box-drawing prefix for a row, rebuilt from its stored ancestry data.
fn tree_prefix(line: &LayoutLine) -> String {
    if line.depth == 0 {
        return String::new();
    }
    let mut prefix = String::new();
    for &continues in &line.parent_continues {
        prefix.push_str(if continues { "│  " } else { "   " });
    }
    prefix.push_str(if line.is_last_sibling { "└─ " } else { "├─ " });
    prefix
}
