//! Adaptive time-window selection.
//!
//! Widens the age cutoff along a fixed ladder until enough posts qualify,
//! then keeps the nearest ones. The number kept scales with the window
//! length (`target_density` posts per second) so a short, busy window
//! shows a tight circle and a long, quiet one reaches farther.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::distance;
use crate::model::{Coordinate, Post};

/// Smallest selection the selector tries to reach before widening.
pub const MIN_DISPLAYABLE: usize = 10;

/// Hard cap on the selection size.
pub const MAX_ITEMS: usize = 150;

/// Posts per second of window length.
pub const TARGET_DENSITY: f64 = 0.5;

// ============================================================================
// TimeWindow
// ============================================================================

/// One rung of the expansion ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Bounded { seconds: u64 },
    Unbounded,
}

impl TimeWindow {
    pub const fn seconds(seconds: u64) -> Self {
        TimeWindow::Bounded { seconds }
    }

    pub const fn minutes(minutes: u64) -> Self {
        Self::seconds(minutes * 60)
    }

    pub const fn hours(hours: u64) -> Self {
        Self::seconds(hours * 3_600)
    }

    pub const fn days(days: u64) -> Self {
        Self::seconds(days * 86_400)
    }

    pub fn as_seconds(&self) -> Option<u64> {
        match self {
            TimeWindow::Bounded { seconds } => Some(*seconds),
            TimeWindow::Unbounded => None,
        }
    }

    /// `0 ≤ age ≤ window`. The unbounded window admits everything.
    pub fn admits(&self, age: TimeDelta) -> bool {
        match self {
            TimeWindow::Unbounded => true,
            TimeWindow::Bounded { seconds } => {
                age >= TimeDelta::zero()
                    && i64::try_from(*seconds)
                        .ok()
                        .and_then(TimeDelta::try_seconds)
                        .is_none_or(|window| age <= window)
            }
        }
    }

    /// Short label used in diagnostics: `5m`, `60m`, `All Time`.
    pub fn label(&self) -> String {
        match self {
            TimeWindow::Bounded { seconds } => format!("{}m", seconds / 60),
            TimeWindow::Unbounded => "All Time".to_string(),
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// `[5 min, 1 hour, 24 hours, 7 days, unbounded]`
pub fn default_ladder() -> Vec<TimeWindow> {
    vec![
        TimeWindow::minutes(5),
        TimeWindow::hours(1),
        TimeWindow::hours(24),
        TimeWindow::days(7),
        TimeWindow::Unbounded,
    ]
}

// ============================================================================
// Selection
// ============================================================================

/// A selected post and its distance to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selected<'a> {
    pub post: &'a Post,
    pub distance_m: f64,
}

/// Result of one selection pass. Items are nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub items: Vec<Selected<'a>>,
    /// Index into the ladder of the window that was used.
    pub level: usize,
    pub window: TimeWindow,
    /// Distance of the farthest selected item; 0 when empty.
    pub outer_radius_m: f64,
}

impl Selection<'_> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// WindowSelector
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelector {
    ladder: Vec<TimeWindow>,
    min_displayable: usize,
    max_items: usize,
    target_density: f64,
}

impl Default for WindowSelector {
    fn default() -> Self {
        Self::new(default_ladder(), MIN_DISPLAYABLE, MAX_ITEMS, TARGET_DENSITY)
    }
}

impl WindowSelector {
    /// An empty ladder behaves like `[Unbounded]`.
    pub fn new(
        ladder: Vec<TimeWindow>,
        min_displayable: usize,
        max_items: usize,
        target_density: f64,
    ) -> Self {
        let ladder = if ladder.is_empty() { vec![TimeWindow::Unbounded] } else { ladder };
        Self { ladder, min_displayable, max_items, target_density }
    }

    pub fn ladder(&self) -> &[TimeWindow] {
        &self.ladder
    }

    /// How many of the nearest posts a window may show.
    ///
    /// `round(seconds × density)` clamped into `[min_displayable, max_items]`;
    /// `max_items` for the unbounded window.
    pub fn allowed_count(&self, window: TimeWindow) -> usize {
        let raw = match window.as_seconds() {
            None => self.max_items,
            Some(seconds) => (seconds as f64 * self.target_density).round() as usize,
        };
        raw.max(self.min_displayable).min(self.max_items)
    }

    pub fn select<'a>(
        &self,
        observer: Coordinate,
        candidates: &'a [Post],
        now: DateTime<Utc>,
    ) -> Selection<'a> {
        let mut level = 0;
        let mut window = self.ladder[0];
        let mut admitted: Vec<&'a Post> = Vec::new();

        for (i, &rung) in self.ladder.iter().enumerate() {
            admitted = candidates
                .iter()
                .filter(|p| rung.admits(now.signed_duration_since(p.created_at)))
                .collect();
            level = i;
            window = rung;
            if admitted.len() >= self.min_displayable {
                break;
            }
        }

        let mut items: Vec<Selected<'a>> = admitted
            .into_iter()
            .map(|post| Selected { post, distance_m: distance(observer, post.location) })
            .collect();
        items.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.post.id.cmp(&b.post.id))
        });
        items.truncate(self.allowed_count(window));

        let outer_radius_m = items.last().map_or(0.0, |s| s.distance_m);

        Selection { items, level, window, outer_radius_m }
    }
}
