//! Pure feed recomputation.
//!
//! `(observer, posts, now) → FeedState`. No I/O, no shared state; the
//! driver calls it with a copy of the latest inputs.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FeedConfig;
use crate::geo::distance;
use crate::model::{Coordinate, FeedDiagnostics, FeedState, FeedStatus, Post};
use crate::select::{RankScaler, WindowSelector};

/// Latest value of every input signal.
#[derive(Debug, Clone, Copy)]
pub struct FeedInputs<'a> {
    pub observer: Option<Coordinate>,
    pub posts: &'a [Post],
    pub now: DateTime<Utc>,
}

/// Selector and scaler configured once, applied per refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEngine {
    selector: WindowSelector,
    scaler: RankScaler,
}

impl Default for FeedEngine {
    fn default() -> Self {
        Self::new(WindowSelector::default(), RankScaler::default())
    }
}

impl FeedEngine {
    pub fn new(selector: WindowSelector, scaler: RankScaler) -> Self {
        Self { selector, scaler }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.window_selector(), config.rank_scaler())
    }

    /// Build the next feed. The returned state has revision 0; publishers
    /// stamp their own.
    pub fn compute(&self, inputs: &FeedInputs<'_>) -> FeedState {
        let Some(observer) = inputs.observer else {
            return FeedState::awaiting_location();
        };

        let selection = self.selector.select(observer, inputs.posts, inputs.now);
        debug!(
            level = selection.level,
            window = %selection.window,
            candidates = inputs.posts.len(),
            selected = selection.len(),
            "window selected"
        );
        let mut posts = self.scaler.annotate(&selection);
        posts.sort_by(|a, b| {
            b.post
                .created_at
                .cmp(&a.post.created_at)
                .then_with(|| b.post.id.cmp(&a.post.id))
        });

        let diagnostics = FeedDiagnostics {
            window: Some(selection.window),
            outer_radius_m: selection.outer_radius_m,
            count: posts.len(),
        };

        FeedState {
            revision: 0,
            status: FeedStatus::Ready,
            observer: Some(observer),
            posts,
            summary: diagnostics.summary(),
            diagnostics,
        }
    }
}

/// One-shot recomputation with a config.
pub fn compute_feed(inputs: &FeedInputs<'_>, config: &FeedConfig) -> FeedState {
    FeedEngine::from_config(config).compute(inputs)
}

/// Observer position after a new `fix`.
///
/// A fix within `min_move_m` of the current observer is jitter and keeps
/// the current position. A missing fix keeps the last known one.
pub fn settle_fix(
    current: Option<Coordinate>,
    fix: Option<Coordinate>,
    min_move_m: f64,
) -> Option<Coordinate> {
    match (current, fix) {
        (Some(here), Some(there)) if distance(here, there) < min_move_m => Some(here),
        (_, Some(there)) => Some(there),
        (here, None) => here,
    }
}
