//! Posts and their authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Coordinate;
use crate::geo::SpatialCell;

/// Opaque post identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
}

impl User {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A message broadcast at a place and time. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub location: Coordinate,
    /// Storage-precision cell containing `location`.
    pub cell: SpatialCell,
    /// Ten-digit plus code of `location`, for display.
    #[serde(default)]
    pub plus_code: String,
}

/// Submission draft. The store assigns id, timestamp and cell.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author: User,
    pub text: String,
    pub location: Coordinate,
}
