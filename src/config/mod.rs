//! Tunables for the feed engine and the in-memory store.
//!
//! Every field has a default matching the stock feed behaviour, so a
//! config file only needs to name what it changes:
//!
//! ```json
//! { "min_displayable": 20, "relevance_policy": { "kind": "absolute_distance", "max_distance_m": 500.0 } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geo::{DEFAULT_QUERY_PRECISION, STORAGE_PRECISION};
use crate::select::{
    default_ladder, RankScaler, RelevancePolicy, TimeWindow, WindowSelector,
    MAX_FONT, MAX_ITEMS, MIN_DISPLAYABLE, MIN_FONT, MIN_OPACITY, TARGET_DENSITY,
};
use crate::{Error, Result};

/// Radius handed to the post store's nearby query.
pub const FEED_RADIUS_M: f64 = 1000.0;

/// Location jitter below this is not treated as movement.
pub const MIN_MOVE_M: f64 = 10.0;

// ============================================================================
// FeedConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub min_displayable: usize,
    pub max_items: usize,
    /// Posts per second of window length.
    pub target_density: f64,
    pub expansion_ladder: Vec<TimeWindow>,
    pub relevance_policy: RelevancePolicy,
    pub min_font: f32,
    pub max_font: f32,
    pub min_opacity: f32,
    pub feed_radius_m: f64,
    /// Re-evaluation period while subscribed.
    pub tick_interval_ms: u64,
    /// How long the driver survives without subscribers.
    pub idle_grace_ms: u64,
    /// Fixes closer than this to the current observer are ignored.
    pub min_move_m: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_displayable: MIN_DISPLAYABLE,
            max_items: MAX_ITEMS,
            target_density: TARGET_DENSITY,
            expansion_ladder: default_ladder(),
            relevance_policy: RelevancePolicy::default(),
            min_font: MIN_FONT,
            max_font: MAX_FONT,
            min_opacity: MIN_OPACITY,
            feed_radius_m: FEED_RADIUS_M,
            tick_interval_ms: 1_000,
            idle_grace_ms: 5_000,
            min_move_m: MIN_MOVE_M,
        }
    }
}

impl FeedConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));

        if self.expansion_ladder.is_empty() {
            return fail("expansion_ladder must not be empty");
        }
        if self.min_displayable == 0 || self.max_items == 0 {
            return fail("min_displayable and max_items must be positive");
        }
        if self.min_displayable > self.max_items {
            return fail("min_displayable exceeds max_items");
        }
        if !(self.target_density.is_finite() && self.target_density > 0.0) {
            return fail("target_density must be a positive number");
        }
        if !(self.feed_radius_m.is_finite() && self.feed_radius_m > 0.0) {
            return fail("feed_radius_m must be a positive number");
        }
        if self.min_font > self.max_font {
            return fail("min_font exceeds max_font");
        }
        if !(0.0..=1.0).contains(&self.min_opacity) {
            return fail("min_opacity must lie in [0, 1]");
        }
        if let RelevancePolicy::AbsoluteDistance { max_distance_m } = self.relevance_policy {
            if max_distance_m <= 0.0 {
                return fail("relevance_policy.max_distance_m must be positive");
            }
        }
        if self.tick_interval_ms == 0 {
            return fail("tick_interval_ms must be positive");
        }
        if !(self.min_move_m.is_finite() && self.min_move_m >= 0.0) {
            return fail("min_move_m must be a non-negative number");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn idle_grace(&self) -> Duration {
        Duration::from_millis(self.idle_grace_ms)
    }

    pub fn window_selector(&self) -> WindowSelector {
        WindowSelector::new(
            self.expansion_ladder.clone(),
            self.min_displayable,
            self.max_items,
            self.target_density,
        )
    }

    pub fn rank_scaler(&self) -> RankScaler {
        RankScaler::new(self.relevance_policy)
            .with_font_range(self.min_font, self.max_font)
            .with_min_opacity(self.min_opacity)
    }
}

// ============================================================================
// StoreConfig
// ============================================================================

/// Settings for [`MemoryPostStore`](crate::storage::MemoryPostStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Cell precision assigned to stored posts.
    pub storage_precision: usize,
    /// Finest precision `query_near` may scan at. The radius-derived
    /// precision is capped to this, so lower values mean fewer, wider cells.
    pub query_precision: usize,
    /// Results kept per neighbour cell in a fan-out query.
    pub per_cell_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_precision: STORAGE_PRECISION,
            query_precision: DEFAULT_QUERY_PRECISION,
            per_cell_limit: 50,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.storage_precision == 0 {
            return Err(Error::InvalidPrecision(self.storage_precision));
        }
        if self.query_precision == 0 || self.query_precision > self.storage_precision {
            return Err(Error::InvalidPrecision(self.query_precision));
        }
        if self.per_cell_limit == 0 {
            return Err(Error::InvalidConfig("per_cell_limit must be positive".into()));
        }
        Ok(())
    }
}
