//! # Feed Assembler
//!
//! Combines the observer's location, the store's post snapshots and a
//! periodic tick into a stream of immutable [`FeedState`]s.
//!
//! ```text
//! LocationSource ─┐
//! PostStore ──────┼─► driver ─► FeedEngine::compute ─► watch slot ─► subscribers
//! ticker (1 s) ───┘
//! ```
//!
//! The slot always holds the newest state and replays it to late
//! subscribers. The driver only runs while someone is subscribed.

pub mod engine;
mod driver;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::FeedConfig;
use crate::identity::{IdentityProvider, StaticIdentity};
use crate::location::LocationSource;
use crate::model::{Coordinate, FeedState, NewPost, Post};
use crate::storage::PostStore;
use crate::Result;

pub use engine::{compute_feed, settle_fix, FeedEngine, FeedInputs};

// ============================================================================
// FeedAssembler
// ============================================================================

/// Handle to one feed pipeline. Cheap to clone; clones share the pipeline.
#[derive(Clone)]
pub struct FeedAssembler {
    inner: Arc<AssemblerInner>,
}

pub(crate) struct AssemblerInner {
    location: Arc<dyn LocationSource>,
    store: Arc<dyn PostStore>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: FeedConfig,
    engine: FeedEngine,
    state_tx: watch::Sender<Arc<FeedState>>,
    resubscribed: Notify,
    driver: Mutex<DriverSlot>,
}

#[derive(Default)]
struct DriverSlot {
    running: bool,
}

impl FeedAssembler {
    pub fn builder(
        location: Arc<dyn LocationSource>,
        store: Arc<dyn PostStore>,
    ) -> FeedAssemblerBuilder {
        FeedAssemblerBuilder {
            location,
            store,
            identity: None,
            clock: None,
            config: FeedConfig::default(),
        }
    }

    /// Subscribe to feed states. The receiver starts out holding the
    /// latest state; the first subscriber starts the driver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FeedState>> {
        let rx = self.inner.state_tx.subscribe();
        self.inner.resubscribed.notify_one();

        let mut slot = self.inner.driver.lock();
        if !slot.running {
            slot.running = true;
            tokio::spawn(driver::run(Arc::clone(&self.inner)));
        }
        rx
    }

    /// Latest published state, without subscribing.
    pub fn current(&self) -> Arc<FeedState> {
        Arc::clone(&self.inner.state_tx.borrow())
    }

    /// True while the driver task is alive (subscribed or in its grace period).
    pub fn is_running(&self) -> bool {
        self.inner.driver.lock().running
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    fn observer(&self) -> Option<Coordinate> {
        *self.inner.location.subscribe().borrow()
    }

    /// Post `text` at the observer's current position.
    ///
    /// Returns `Ok(None)` without contacting the store when the text is
    /// blank, nobody is signed in, or there is no location fix yet.
    pub async fn submit(&self, text: &str) -> Result<Option<Post>> {
        let text = text.trim();
        if text.is_empty() {
            debug!("blank message ignored");
            return Ok(None);
        }
        let Some(author) = self.inner.identity.current_user() else {
            debug!("no signed-in user; message dropped");
            return Ok(None);
        };
        let Some(location) = self.observer() else {
            debug!("no location fix; message dropped");
            return Ok(None);
        };

        let post = self
            .inner
            .store
            .submit(NewPost { author, text: text.to_string(), location })
            .await?;
        info!(post_id = %post.id, cell = %post.cell, "message submitted");
        Ok(Some(post))
    }

    /// Fire-and-forget [`submit`](Self::submit). Failures are logged.
    pub fn send(&self, text: impl Into<String>) -> JoinHandle<()> {
        let this = self.clone();
        let text = text.into();
        tokio::spawn(async move {
            if let Err(e) = this.submit(&text).await {
                warn!(error = %e, "message submission failed");
            }
        })
    }

    /// Nudge the observer by a delta in degrees. Debug/test aid.
    ///
    /// Returns the new position, or `None` when there is no fix to move.
    pub async fn move_observer(&self, delta_lat: f64, delta_lng: f64) -> Result<Option<Coordinate>> {
        let Some(current) = self.observer() else {
            debug!("no location fix; move ignored");
            return Ok(None);
        };
        let next = current.offset(delta_lat, delta_lng);
        self.inner.location.set(next).await?;
        debug!(from = %current, to = %next, "observer moved");
        Ok(Some(next))
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct FeedAssemblerBuilder {
    location: Arc<dyn LocationSource>,
    store: Arc<dyn PostStore>,
    identity: Option<Arc<dyn IdentityProvider>>,
    clock: Option<Arc<dyn Clock>>,
    config: FeedConfig,
}

impl FeedAssemblerBuilder {
    /// Defaults to nobody signed in.
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<FeedAssembler> {
        self.config.validate()?;
        let (state_tx, _) = watch::channel(Arc::new(FeedState::awaiting_location()));

        Ok(FeedAssembler {
            inner: Arc::new(AssemblerInner {
                location: self.location,
                store: self.store,
                identity: self.identity.unwrap_or_else(|| Arc::new(StaticIdentity::anonymous())),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                engine: FeedEngine::from_config(&self.config),
                config: self.config,
                state_tx,
                resubscribed: Notify::new(),
                driver: Mutex::new(DriverSlot::default()),
            }),
        })
    }
}
