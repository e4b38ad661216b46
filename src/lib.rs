//! # geofeed: Proximity Feed Engine
//!
//! Shows an observer the messages posted around them, choosing how far back
//! in time to look from how busy the area is, and weighting each message by
//! how close it is.
//!
//! ## Design Principles
//!
//! 1. **Pure core**: distance, cell codes, window selection and ranking are
//!    plain functions over plain data
//! 2. **Traits at the edges**: `LocationSource`, `PostStore`, `IdentityProvider`
//!    and `Clock` are the contracts with the outside world
//! 3. **Latest value wins**: every signal is a `watch` slot, so a burst of
//!    updates costs one recompute
//! 4. **Immutable snapshots**: a published `FeedState` never changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geofeed::{
//!     Coordinate, FeedAssembler, ManualLocationSource, MemoryPostStore,
//!     StaticIdentity, SystemClock,
//! };
//!
//! # async fn example() -> geofeed::Result<()> {
//! let here = Coordinate::new(37.7879, -122.4075)?;
//! let location = Arc::new(ManualLocationSource::starting_at(here));
//! let store = Arc::new(MemoryPostStore::seeded(here, 123, Arc::new(SystemClock)));
//!
//! let feed = FeedAssembler::builder(location, store)
//!     .identity(Arc::new(StaticIdentity::demo()))
//!     .build()?;
//!
//! let mut states = feed.subscribe();
//! states.changed().await.ok();
//! println!("{}", states.borrow().summary);
//!
//! feed.submit("hello from Union Square").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Role |
//! |-------|--------|------|
//! | GeoMath | `geo::distance` | Great-circle distance |
//! | CellIndex | `geo::cell` | Cell codes, neighbours, range fan-out |
//! | WindowSelector | `select::window` | Adaptive time window, nearest-N |
//! | RankScaler | `select::rank` | Relevance to font size and opacity |
//! | FeedAssembler | `feed` | Signal fusion and state publishing |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod geo;
pub mod select;
pub mod config;
pub mod clock;
pub mod identity;
pub mod location;
pub mod storage;
pub mod feed;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Coordinate, Post, PostId, NewPost, User,
    AnnotatedPost, FeedState, FeedStatus, FeedDiagnostics,
};

// ============================================================================
// Re-exports: Geometry and selection
// ============================================================================

pub use geo::{distance, encode, plus_code, CellBounds, CellDirection, CellRange, SpatialCell};
pub use select::{RankScaler, RelevancePolicy, Selection, TimeWindow, WindowSelector};

// ============================================================================
// Re-exports: Collaborators
// ============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{IdentityProvider, StaticIdentity};
pub use location::{LocationSource, ManualLocationSource};
pub use storage::{MemoryPostStore, PostSnapshot, PostStore};

// ============================================================================
// Re-exports: Feed
// ============================================================================

pub use config::{FeedConfig, StoreConfig};
pub use feed::{
    compute_feed, settle_fix, FeedAssembler, FeedAssemblerBuilder, FeedEngine, FeedInputs,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid precision: {0}")]
    InvalidPrecision(usize),

    #[error("Invalid cell code {code:?}: {reason}")]
    InvalidCellCode { code: String, reason: String },

    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Location error: {0}")]
    Location(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
