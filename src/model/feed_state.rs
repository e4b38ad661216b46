//! Feed output types: annotated posts and published feed snapshots.

use serde::{Deserialize, Serialize};

use super::{Coordinate, Post};
use crate::select::TimeWindow;

/// A post decorated for display. Recomputed on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedPost {
    pub post: Post,
    pub distance_m: f64,
    /// 0.0 (least relevant) ..= 1.0 (most relevant).
    pub relevance: f32,
    pub font_size: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStatus {
    /// No location fix yet. The feed is empty by construction.
    AwaitingLocation,
    Ready,
}

/// Diagnostics describing how the current selection was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDiagnostics {
    /// Ladder window the selector stopped at. `None` while awaiting a fix.
    pub window: Option<TimeWindow>,
    /// Distance of the farthest selected post, 0 when nothing is selected.
    pub outer_radius_m: f64,
    pub count: usize,
}

impl FeedDiagnostics {
    /// One-line summary, e.g. `Time: 5m | Range: 412m | Count: 50`.
    pub fn summary(&self) -> String {
        match &self.window {
            None => "Awaiting location".to_string(),
            Some(window) => format!(
                "Time: {} | Range: {}m | Count: {}",
                window.label(),
                self.outer_radius_m.round() as u64,
                self.count,
            ),
        }
    }
}

/// One immutable feed snapshot. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    /// Increments with every published snapshot of one assembler.
    pub revision: u64,
    pub status: FeedStatus,
    pub observer: Option<Coordinate>,
    /// Newest first.
    pub posts: Vec<AnnotatedPost>,
    pub diagnostics: FeedDiagnostics,
    /// Human-readable form of `diagnostics`.
    pub summary: String,
}

impl FeedState {
    /// The state before any location has arrived.
    pub fn awaiting_location() -> Self {
        let diagnostics = FeedDiagnostics {
            window: None,
            outer_radius_m: 0.0,
            count: 0,
        };
        Self {
            revision: 0,
            status: FeedStatus::AwaitingLocation,
            observer: None,
            posts: Vec::new(),
            summary: diagnostics.summary(),
            diagnostics,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::awaiting_location()
    }
}
