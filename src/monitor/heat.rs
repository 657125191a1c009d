//! The heat model: event weights, exponential decay, directory aggregation.
//!
//! Heat is a recency score in `[0, MAX_HEAT]`. Every event seeds a weight
//! that halves every [`HALF_LIFE_MS`] milliseconds; directories combine
//! their own heat with their children's so both a single hot child and
//! broad activity push a directory up the ranking.

use std::time::Instant;

use crate::monitor::node::EventKind;

/// Upper bound for any heat value.
pub const MAX_HEAT: f64 = 100.0;

/// Time for a heat value to halve, in milliseconds.
pub const HALF_LIFE_MS: f64 = 10_000.0;

/// Heat at or above this counts as "hot".
pub const HOT_THRESHOLD: f64 = 20.0;

/// Fraction of the summed child heat a directory absorbs.
pub const DIR_CHILD_SUM_WEIGHT: f64 = 0.1;

/// Number of cells in the rendered heat bar.
pub const BAR_SEGMENTS: usize = 6;

/// Initial heat assigned to an event before decay.
pub fn event_weight(kind: EventKind) -> f64 {
    match kind {
        EventKind::Unlink | EventKind::UnlinkDir => 100.0,
        EventKind::Add | EventKind::AddDir => 80.0,
        EventKind::Change => 60.0,
        EventKind::Rename => 40.0,
        _ => 30.0,
    }
}

/// Decayed heat for an event observed at `event_time`, evaluated at `now`.
///
/// Returns 0 when there is no event time. Non-negative and monotonically
/// non-increasing in `now`.
pub fn heat(event_kind: Option<EventKind>, event_time: Option<Instant>, now: Instant) -> f64 {
    let Some(event_time) = event_time else {
        return 0.0;
    };
    let weight = event_kind.map(event_weight).unwrap_or(30.0);
    let elapsed_ms = now.saturating_duration_since(event_time).as_secs_f64() * 1000.0;
    let decayed = weight * (-elapsed_ms / HALF_LIFE_MS).exp2();
    decayed.clamp(0.0, MAX_HEAT)
}

/// Aggregate a directory's heat from its own heat and its children's.
///
/// With children present this is
/// `min(MAX_HEAT, max(own, max(children) + 0.1 * sum(children)))`, so the
/// hottest child dominates and broad activity adds on top.
pub fn dir_heat(child_heats: &[f64], own_heat: f64) -> f64 {
    if child_heats.is_empty() {
        return own_heat;
    }
    let hottest = child_heats.iter().copied().fold(0.0_f64, f64::max);
    let sum: f64 = child_heats.iter().sum();
    own_heat.max(hottest + DIR_CHILD_SUM_WEIGHT * sum).min(MAX_HEAT)
}

/// Whether a heat value counts as hot.
pub fn is_hot(heat: f64) -> bool {
    heat >= HOT_THRESHOLD
}

/// Color bucket name for a heat value, mapped to a terminal color by the
/// renderer.
pub fn heat_color(heat: f64) -> &'static str {
    if heat >= 80.0 {
        "bright_red"
    } else if heat >= 60.0 {
        "red"
    } else if heat >= 40.0 {
        "magenta"
    } else if heat >= 20.0 {
        "cyan"
    } else {
        "blue"
    }
}

/// Number of filled cells in the heat bar, out of [`BAR_SEGMENTS`].
pub fn bar_cells(heat: f64) -> usize {
    let filled = (heat / MAX_HEAT * BAR_SEGMENTS as f64).round() as usize;
    filled.min(BAR_SEGMENTS)
}
