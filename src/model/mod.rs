//! # Feed Model
//!
//! Plain DTOs that cross every boundary: store ↔ selector ↔ assembler ↔
//! subscriber.
//!
//! Design rule: this module is pure data. No I/O, no async.

pub mod coordinate;
pub mod post;
pub mod feed_state;

pub use coordinate::Coordinate;
pub use post::{Post, PostId, NewPost, User};
pub use feed_state::{AnnotatedPost, FeedState, FeedStatus, FeedDiagnostics};
