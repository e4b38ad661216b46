//! Background task that keeps a `FeedAssembler`'s slot current.
//!
//! Three inputs wake it: a location change, a new post snapshot, and the
//! ticker. All of them land in `watch` channels, so a burst of changes
//! collapses into one recompute over the newest values. Fixes closer than
//! `min_move_m` to the current observer are dropped as jitter.
//!
//! When the last subscriber goes away the ticker stops. The task lingers
//! for the idle grace period in case someone resubscribes, then drops its
//! input receivers and exits.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::engine::{settle_fix, FeedInputs};
use super::AssemblerInner;
use crate::model::Coordinate;
use crate::storage::PostSnapshot;

pub(super) async fn run(inner: Arc<AssemblerInner>) {
    let mut location_rx = inner.location.subscribe();
    let mut posts_rx = inner.store.nearby(inner.config.feed_radius_m);
    let mut location_open = true;
    let mut posts_open = true;
    let mut observer = *location_rx.borrow_and_update();

    // First tick fires immediately and produces the initial state.
    let mut ticker = time::interval(inner.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        tick_ms = inner.config.tick_interval_ms,
        radius_m = inner.config.feed_radius_m,
        "feed driver started"
    );

    loop {
        let mut idle = false;

        tokio::select! {
            changed = location_rx.changed(), if location_open => {
                if changed.is_err() {
                    location_open = false;
                    warn!("location stream ended; keeping last known fix");
                } else {
                    let fix = *location_rx.borrow_and_update();
                    let settled = settle_fix(observer, fix, inner.config.min_move_m);
                    if settled != fix {
                        trace!("fix within min_move_m; observer kept");
                    }
                    observer = settled;
                }
            }
            changed = posts_rx.changed(), if posts_open => {
                if changed.is_err() {
                    posts_open = false;
                    warn!("post stream ended; keeping last snapshot");
                }
            }
            _ = ticker.tick() => {}
            _ = inner.state_tx.closed() => {
                idle = true;
            }
        }

        if idle {
            if !linger(&inner).await {
                break;
            }
            ticker.reset();
        }

        publish(&inner, observer, &mut posts_rx);
    }

    info!("feed driver stopped");
}

/// Wait out the grace period. Returns `true` if a subscriber came back.
async fn linger(inner: &AssemblerInner) -> bool {
    let grace = inner.config.idle_grace();
    debug!(grace_ms = inner.config.idle_grace_ms, "no subscribers; ticker paused");

    let deadline = Instant::now() + grace;
    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => break,
            _ = inner.resubscribed.notified() => {
                if inner.state_tx.receiver_count() > 0 {
                    debug!("subscriber returned; resuming");
                    return true;
                }
            }
        }
    }

    // Decide under the slot lock so a concurrent `subscribe` either sees
    // us still running or restarts a fresh driver.
    let mut slot = inner.driver.lock();
    if inner.state_tx.receiver_count() > 0 {
        return true;
    }
    slot.running = false;
    false
}

fn publish(
    inner: &AssemblerInner,
    observer: Option<Coordinate>,
    posts_rx: &mut watch::Receiver<PostSnapshot>,
) {
    let snapshot = posts_rx.borrow_and_update().clone();
    let inputs = FeedInputs {
        observer,
        posts: snapshot.posts(),
        now: inner.clock.now(),
    };

    let mut state = inner.engine.compute(&inputs);
    inner.state_tx.send_modify(|current| {
        state.revision = current.revision + 1;
        trace!(
            revision = state.revision,
            snapshot = snapshot.version,
            summary = %state.summary,
            "feed published"
        );
        *current = Arc::new(state);
    });
}
