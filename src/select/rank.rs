//! Relevance scoring and visual weight.
//!
//! Relevance is a 0.0–1.0 score mapped linearly onto font size and
//! opacity. Two policies produce it:
//!
//! | Policy | Relevance | Closest item |
//! |--------|-----------|--------------|
//! | `RankRelative` | `1 − i/(n−1)` over the distance-sorted selection | always max size |
//! | `AbsoluteDistance` | `clamp(1 − d/max, 0, 1)` | max size only at 0 m |

use serde::{Deserialize, Serialize};

use super::window::Selection;
use crate::model::AnnotatedPost;

pub const MIN_FONT: f32 = 8.0;
pub const MAX_FONT: f32 = 32.0;
pub const MIN_OPACITY: f32 = 0.3;

/// Cutoff distance of the absolute policy.
pub const ABSOLUTE_MAX_DISTANCE_M: f64 = 1000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelevancePolicy {
    /// Position within the selection decides; the selection always spans
    /// the full visual range.
    #[default]
    RankRelative,
    /// Distance against a fixed cutoff decides.
    AbsoluteDistance { max_distance_m: f64 },
}

/// Relevance of the item at `index` among `total` distance-sorted items.
pub fn rank_relevance(index: usize, total: usize) -> f32 {
    let rank = if total > 1 { index as f32 / (total - 1) as f32 } else { 0.0 };
    1.0 - rank
}

/// `clamp(1 − distance/max_distance, 0, 1)`.
pub fn distance_relevance(distance_m: f64, max_distance_m: f64) -> f32 {
    if max_distance_m <= 0.0 {
        return 0.0;
    }
    (1.0 - (distance_m / max_distance_m) as f32).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankScaler {
    policy: RelevancePolicy,
    min_font: f32,
    max_font: f32,
    min_opacity: f32,
}

impl Default for RankScaler {
    fn default() -> Self {
        Self::new(RelevancePolicy::default())
    }
}

impl RankScaler {
    pub fn new(policy: RelevancePolicy) -> Self {
        Self {
            policy,
            min_font: MIN_FONT,
            max_font: MAX_FONT,
            min_opacity: MIN_OPACITY,
        }
    }

    pub fn with_font_range(mut self, min_font: f32, max_font: f32) -> Self {
        self.min_font = min_font;
        self.max_font = max_font;
        self
    }

    pub fn with_min_opacity(mut self, min_opacity: f32) -> Self {
        self.min_opacity = min_opacity;
        self
    }

    pub fn policy(&self) -> RelevancePolicy {
        self.policy
    }

    pub fn relevance(&self, index: usize, total: usize, distance_m: f64) -> f32 {
        match self.policy {
            RelevancePolicy::RankRelative => rank_relevance(index, total),
            RelevancePolicy::AbsoluteDistance { max_distance_m } => {
                distance_relevance(distance_m, max_distance_m)
            }
        }
    }

    pub fn font_size(&self, relevance: f32) -> f32 {
        self.min_font + relevance * (self.max_font - self.min_font)
    }

    pub fn opacity(&self, relevance: f32) -> f32 {
        self.min_opacity + relevance * (1.0 - self.min_opacity)
    }

    /// Annotate a distance-sorted selection, preserving its order.
    pub fn annotate(&self, selection: &Selection<'_>) -> Vec<AnnotatedPost> {
        let total = selection.items.len();
        selection
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let relevance = self.relevance(i, total, item.distance_m);
                AnnotatedPost {
                    post: item.post.clone(),
                    distance_m: item.distance_m,
                    relevance,
                    font_size: self.font_size(relevance),
                    opacity: self.opacity(relevance),
                }
            })
            .collect()
    }
}
