//! Feed selection: which posts to show and how heavily to draw them.

pub mod window;
pub mod rank;

pub use window::{
    default_ladder, Selected, Selection, TimeWindow, WindowSelector,
    MAX_ITEMS, MIN_DISPLAYABLE, TARGET_DENSITY,
};
pub use rank::{
    distance_relevance, rank_relevance, RankScaler, RelevancePolicy,
    ABSOLUTE_MAX_DISTANCE_M, MAX_FONT, MIN_FONT, MIN_OPACITY,
};
