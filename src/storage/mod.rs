//! # Post Store Trait
//!
//! The contract between the feed engine and wherever posts live.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryPostStore` | `memory` | In-memory, cell-indexed; for testing/embedding |
//!
//! A store publishes whole snapshots, never diffs. Each snapshot is an
//! immutable `Arc<[Post]>` tagged with a version; a submission produces a
//! new snapshot and leaves every previously handed-out one untouched.

pub mod memory;
pub mod seed;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::model::{NewPost, Post};
use crate::Result;

pub use memory::MemoryPostStore;

// ============================================================================
// PostSnapshot
// ============================================================================

/// One immutable, versioned view of the candidate posts.
#[derive(Debug, Clone)]
pub struct PostSnapshot {
    pub version: u64,
    posts: Arc<[Post]>,
}

impl PostSnapshot {
    pub fn new(version: u64, posts: impl Into<Arc<[Post]>>) -> Self {
        Self { version, posts: posts.into() }
    }

    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for PostSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// PostStore Trait
// ============================================================================

#[async_trait]
pub trait PostStore: Send + Sync + 'static {
    /// Live candidate posts for a feed of `radius_m`.
    ///
    /// Every emission replaces the previous list. The receiver immediately
    /// holds the current snapshot.
    fn nearby(&self, radius_m: f64) -> watch::Receiver<PostSnapshot>;

    /// Persist a new post. The store assigns id, timestamp and cell.
    async fn submit(&self, post: NewPost) -> Result<Post>;
}
