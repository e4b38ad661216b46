//! In-memory post store.
//!
//! This is the reference implementation of `PostStore`. Posts live in a
//! `BTreeMap` keyed by `(cell code, post id)` so a spatial query becomes a
//! handful of prefix range scans, the same shape a document store answers
//! with `cell >= prefix AND cell < prefix + sentinel`.
//!
//! ## Limitations
//!
//! - **No persistence**: everything is lost on drop.
//! - **`nearby` ignores the radius**: it streams every post and leaves the
//!   narrowing to the feed selector. `query_near` is the spatial path.
//! - **Cell order, not time order, within a scan**: the per-cell limit
//!   keeps the first posts by cell code, like an ordered range query would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{seed, PostSnapshot, PostStore};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::geo::{distance, encode, plus_code, query_precision_for_radius, query_ranges};
use crate::model::{Coordinate, NewPost, Post, PostId};
use crate::{Error, Result};

// ============================================================================
// MemoryPostStore
// ============================================================================

/// In-memory, cell-indexed post storage. Cheap to clone; clones share data.
#[derive(Clone)]
pub struct MemoryPostStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    index: RwLock<PostIndex>,
    snapshot: watch::Sender<PostSnapshot>,
    next_post_id: AtomicU64,
}

#[derive(Default)]
struct PostIndex {
    /// (storage cell, id) → post
    by_cell: BTreeMap<(String, PostId), Post>,
    ids: HashSet<PostId>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::build(StoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let (snapshot, _) = watch::channel(PostSnapshot::empty());
        Self {
            inner: Arc::new(MemoryInner {
                config,
                clock,
                index: RwLock::new(PostIndex::default()),
                snapshot,
                next_post_id: AtomicU64::new(1),
            }),
        }
    }

    /// A store pre-filled with the reproducible demo populations around
    /// `center`, aged relative to the store's clock.
    pub fn seeded(center: Coordinate, seed: u64, clock: Arc<dyn Clock>) -> Self {
        let store = Self::build(StoreConfig::default(), clock);
        let now = store.inner.clock.now();
        store.insert_many(seed::diverse_posts(center, now, seed));
        store
    }

    /// Add already-materialized posts (imports, fixtures) in one snapshot.
    ///
    /// Ids are kept as given; a post whose id is already stored (or repeats
    /// earlier in the batch) is skipped. The id counter moves past the
    /// largest accepted id. Returns how many posts were added.
    pub fn insert_many(&self, posts: impl IntoIterator<Item = Post>) -> usize {
        let mut index = self.inner.index.write();
        let mut accepted: Vec<Post> = Vec::new();
        let mut skipped = 0usize;
        for post in posts {
            if !index.ids.insert(post.id) {
                skipped += 1;
                continue;
            }
            index
                .by_cell
                .insert((post.cell.as_str().to_string(), post.id), post.clone());
            accepted.push(post);
        }
        if skipped > 0 {
            warn!(skipped, "duplicate post ids ignored");
        }
        if accepted.is_empty() {
            return 0;
        }
        if let Some(max) = accepted.iter().map(|p| p.id.0).max() {
            self.inner
                .next_post_id
                .fetch_max(max.saturating_add(1), Ordering::Relaxed);
        }

        let added = accepted.len();
        // Published under the index lock so snapshots follow insertion order
        self.inner.snapshot.send_modify(|snap| {
            let mut next: Vec<Post> = Vec::with_capacity(snap.len() + added);
            next.extend(accepted.into_iter().rev());
            next.extend(snap.posts().iter().cloned());
            *snap = PostSnapshot::new(snap.version + 1, next);
        });
        drop(index);

        debug!(added, "posts inserted");
        added
    }

    /// Current snapshot without subscribing.
    pub fn snapshot(&self) -> PostSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.index.read().by_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Posts within `radius_m` of `center`, newest first.
    ///
    /// Fans out one range scan per cell of the 3×3 neighbourhood at a
    /// precision coarse enough to cover the radius, unions the hits, then
    /// filters by true distance and sorts by time client-side.
    pub fn query_near(&self, center: Coordinate, radius_m: f64) -> Result<Vec<Post>> {
        let precision = query_precision_for_radius(radius_m, center.latitude)
            .min(self.inner.config.query_precision);
        let ranges = query_ranges(center, precision)?;
        let limit = self.inner.config.per_cell_limit;

        let mut seen: HashSet<PostId> = HashSet::new();
        let mut hits: Vec<Post> = Vec::new();
        {
            let index = self.inner.index.read();
            for range in &ranges {
                let lo = (range.start.clone(), PostId(0));
                let hi = (range.end.clone(), PostId(0));
                for ((_, id), post) in index.by_cell.range(lo..hi).take(limit) {
                    if seen.insert(*id) {
                        hits.push(post.clone());
                    }
                }
            }
        }

        let scanned = hits.len();
        hits.retain(|p| distance(center, p.location) <= radius_m);
        hits.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        debug!(precision, cells = ranges.len(), scanned, kept = hits.len(), "fan-out query");

        Ok(hits)
    }
}

impl Default for MemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(
    a_time: DateTime<Utc>,
    a_id: PostId,
    b_time: DateTime<Utc>,
    b_id: PostId,
) -> std::cmp::Ordering {
    b_time.cmp(&a_time).then_with(|| b_id.cmp(&a_id))
}

// ============================================================================
// PostStore impl
// ============================================================================

#[async_trait]
impl PostStore for MemoryPostStore {
    fn nearby(&self, _radius_m: f64) -> watch::Receiver<PostSnapshot> {
        self.inner.snapshot.subscribe()
    }

    async fn submit(&self, draft: NewPost) -> Result<Post> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(Error::Store("post text is empty".into()));
        }

        let cell = encode(draft.location, self.inner.config.storage_precision)?;
        let id = self
            .inner
            .next_post_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_err(|_| Error::Store("post ids exhausted".into()))?;
        let post = Post {
            id: PostId(id),
            author_id: draft.author.id,
            author_name: draft.author.display_name,
            text: text.to_string(),
            created_at: self.inner.clock.now(),
            location: draft.location,
            cell,
            plus_code: plus_code(draft.location),
        };

        if self.insert_many([post.clone()]) == 0 {
            return Err(Error::Store(format!("post id {} is already taken", post.id)));
        }
        info!(post_id = %post.id, cell = %post.cell, "post stored");

        Ok(post)
    }
}
