//! End-to-end tests for the live feed pipeline.
//!
//! Each test wires a `FeedAssembler` to a manual location source, an
//! in-memory store and a manual clock, then drives it on a paused tokio
//! clock so ticks and grace periods elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use geofeed::geo::{plus_code, STORAGE_PRECISION};
use geofeed::{
    encode, Coordinate, FeedAssembler, FeedConfig, FeedState, FeedStatus, LocationSource, ManualClock,
    ManualLocationSource, MemoryPostStore, Post, PostId, PostStore, StaticIdentity, StoreConfig,
    TimeWindow, User,
};
use tokio::sync::watch;
use tokio::time::sleep;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn union_square() -> Coordinate {
    Coordinate::new(37.7879, -122.4075).unwrap()
}

fn post_at(id: u64, north_m: f64, created_at: DateTime<Utc>) -> Post {
    let location = union_square().offset(north_m / 111_195.0, 0.0);
    Post {
        id: PostId(id),
        author_id: format!("mock_user_{id}"),
        author_name: "Stranger".into(),
        text: format!("post {id}"),
        created_at,
        location,
        cell: encode(location, STORAGE_PRECISION).unwrap(),
        plus_code: plus_code(location),
    }
}

struct Rig {
    feed: FeedAssembler,
    location: Arc<ManualLocationSource>,
    store: Arc<MemoryPostStore>,
    clock: Arc<ManualClock>,
    identity: Arc<StaticIdentity>,
}

fn rig(posts: Vec<Post>) -> Rig {
    let clock = Arc::new(ManualClock::new(start()));
    let location = Arc::new(ManualLocationSource::new());
    let store = Arc::new(MemoryPostStore::with_config(StoreConfig::default(), clock.clone()).unwrap());
    store.insert_many(posts);
    let identity = Arc::new(StaticIdentity::demo());

    let feed = FeedAssembler::builder(location.clone(), store.clone())
        .identity(identity.clone())
        .clock(clock.clone())
        .config(FeedConfig::default())
        .build()
        .unwrap();

    Rig { feed, location, store, clock, identity }
}

/// 12 posts, 1 to 4 minutes old, 10 to 120 m north.
fn recent_posts() -> Vec<Post> {
    (1..=12)
        .map(|i| post_at(i, i as f64 * 10.0, start() - TimeDelta::seconds(40 + i as i64 * 15)))
        .collect()
}

async fn wait_for(
    rx: &mut watch::Receiver<Arc<FeedState>>,
    mut pred: impl FnMut(&FeedState) -> bool,
) -> Arc<FeedState> {
    let state = rx.wait_for(|s| pred(&**s)).await.unwrap();
    Arc::clone(&state)
}

// ============================================================================
// 1. Location arrives: AwaitingLocation -> Ready
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_awaiting_then_ready() {
    let rig = rig(recent_posts());
    let mut rx = rig.feed.subscribe();

    assert_eq!(rx.borrow().status, FeedStatus::AwaitingLocation);
    let awaiting = wait_for(&mut rx, |s| s.revision >= 1).await;
    assert_eq!(awaiting.status, FeedStatus::AwaitingLocation);
    assert!(awaiting.posts.is_empty());

    rig.location.set(union_square()).await.unwrap();
    let ready = wait_for(&mut rx, |s| s.status == FeedStatus::Ready).await;

    assert_eq!(ready.observer, Some(union_square()));
    assert_eq!(ready.posts.len(), 12);
    assert_eq!(ready.diagnostics.window, Some(TimeWindow::minutes(5)));
    assert!(ready.revision > awaiting.revision);
}

#[tokio::test(start_paused = true)]
async fn test_late_subscriber_sees_latest_state() {
    let rig = rig(recent_posts());
    rig.location.set(union_square()).await.unwrap();

    let mut first = rig.feed.subscribe();
    let ready = wait_for(&mut first, |s| s.status == FeedStatus::Ready).await;

    let second = rig.feed.subscribe();
    assert!(second.borrow().revision >= ready.revision);
    assert_eq!(second.borrow().status, FeedStatus::Ready);
    assert_eq!(rig.feed.current().status, FeedStatus::Ready);
}

// ============================================================================
// 2. Ticks re-age posts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_widens_window_as_posts_age() {
    let rig = rig(recent_posts());
    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();

    let fresh = wait_for(&mut rx, |s| s.status == FeedStatus::Ready).await;
    assert_eq!(fresh.diagnostics.window, Some(TimeWindow::minutes(5)));

    // Nothing else changes: only the ticker can notice
    rig.clock.advance(TimeDelta::minutes(10));
    let aged = wait_for(&mut rx, |s| s.diagnostics.window == Some(TimeWindow::hours(1))).await;
    assert_eq!(aged.posts.len(), 12);
    assert_eq!(aged.summary, "Time: 60m | Range: 120m | Count: 12");
}

#[tokio::test(start_paused = true)]
async fn test_revisions_advance_every_tick() {
    let rig = rig(Vec::new());
    let mut rx = rig.feed.subscribe();
    let first = wait_for(&mut rx, |s| s.revision >= 1).await;

    sleep(Duration::from_millis(3_500)).await;
    assert!(rig.feed.current().revision >= first.revision + 3);
}

// ============================================================================
// 3. Submissions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_submit_appears_in_feed() {
    let rig = rig(recent_posts());
    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();

    let post = rig.feed.submit("  hello square  ").await.unwrap().unwrap();
    assert_eq!(post.text, "hello square");
    assert_eq!(post.author_id, "user_123");
    assert_eq!(post.created_at, start());
    assert_eq!(post.location, union_square());
    assert_eq!(post.id, PostId(13));

    let state = wait_for(&mut rx, |s| s.posts.iter().any(|p| p.post.id == post.id)).await;
    // Newest first
    assert_eq!(state.posts[0].post.id, post.id);
    assert_eq!(state.posts.len(), 13);
}

#[tokio::test(start_paused = true)]
async fn test_submit_is_dropped_without_text_user_or_fix() {
    let rig = rig(Vec::new());

    // No fix yet
    assert_eq!(rig.feed.submit("hello").await.unwrap(), None);

    rig.location.set(union_square()).await.unwrap();
    assert_eq!(rig.feed.submit("   ").await.unwrap(), None);

    rig.identity.sign_out();
    assert_eq!(rig.feed.submit("hello").await.unwrap(), None);

    rig.identity.sign_in(User::new("user_456", "Other"));
    let post = rig.feed.submit("hello").await.unwrap().unwrap();
    assert_eq!(post.author_name, "Other");
    assert_eq!(rig.store.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_send_is_fire_and_forget() {
    let rig = rig(Vec::new());
    rig.location.set(union_square()).await.unwrap();

    rig.feed.send("first").await.unwrap();
    rig.feed.send(String::from("second")).await.unwrap();
    rig.feed.send("").await.unwrap();

    let snapshot = rig.store.snapshot();
    let texts: Vec<&str> = snapshot.posts().iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["second", "first"]);
}

#[tokio::test(start_paused = true)]
async fn test_store_submissions_reach_subscribers() {
    let rig = rig(Vec::new());
    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();

    let nearby = union_square().offset(0.001, 0.0);
    rig.store
        .submit(geofeed::NewPost {
            author: User::new("someone", "Someone"),
            text: "from elsewhere".into(),
            location: nearby,
        })
        .await
        .unwrap();

    let state = wait_for(&mut rx, |s| s.posts.len() == 1).await;
    assert_eq!(state.posts[0].post.text, "from elsewhere");
    assert!((state.posts[0].distance_m - 111.2).abs() < 1.0);
}

// ============================================================================
// 4. Observer movement
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_move_observer_updates_feed() {
    let rig = rig(recent_posts());
    let mut rx = rig.feed.subscribe();

    assert_eq!(rig.feed.move_observer(0.001, 0.0).await.unwrap(), None);

    rig.location.set(union_square()).await.unwrap();
    let moved = rig.feed.move_observer(0.01, 0.0).await.unwrap().unwrap();
    assert!((moved.latitude - 37.7979).abs() < 1e-9);
    assert_eq!(rig.location.current(), Some(moved));

    let state = wait_for(&mut rx, |s| s.observer == Some(moved)).await;
    // ~1.1 km north of every post now
    assert!(state.posts.iter().all(|p| p.distance_m > 900.0));
}

#[tokio::test(start_paused = true)]
async fn test_jitter_below_min_move_is_ignored() {
    let rig = rig(recent_posts());
    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();
    wait_for(&mut rx, |s| s.observer == Some(union_square())).await;

    // ~5 m is jitter under the default 10 m threshold
    let jitter = union_square().offset(5.0 / 111_195.0, 0.0);
    rig.location.set(jitter).await.unwrap();
    let before = rig.feed.current().revision;
    let later = wait_for(&mut rx, |s| s.revision >= before + 2).await;
    assert_eq!(later.observer, Some(union_square()));

    // ~50 m is a real move
    let walked = union_square().offset(50.0 / 111_195.0, 0.0);
    rig.location.set(walked).await.unwrap();
    let moved = wait_for(&mut rx, |s| s.observer == Some(walked)).await;
    assert_eq!(moved.status, FeedStatus::Ready);
}

// ============================================================================
// 5. Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_driver_stops_after_grace_period() {
    let rig = rig(recent_posts());
    assert!(!rig.feed.is_running());

    let mut rx = rig.feed.subscribe();
    assert!(rig.feed.is_running());
    wait_for(&mut rx, |s| s.revision >= 1).await;
    drop(rx);

    sleep(Duration::from_secs(4)).await;
    assert!(rig.feed.is_running());
    let paused_at = rig.feed.current().revision;

    sleep(Duration::from_secs(2)).await;
    assert!(!rig.feed.is_running());
    // No ticks while nobody listens
    assert_eq!(rig.feed.current().revision, paused_at);
}

#[tokio::test(start_paused = true)]
async fn test_resubscribe_within_grace_keeps_driver() {
    let rig = rig(recent_posts());
    let rx = rig.feed.subscribe();
    sleep(Duration::from_millis(100)).await;
    drop(rx);

    sleep(Duration::from_secs(2)).await;
    let mut rx = rig.feed.subscribe();
    let before = rig.feed.current().revision;

    sleep(Duration::from_secs(10)).await;
    assert!(rig.feed.is_running());
    let after = wait_for(&mut rx, |s| s.revision > before).await;
    assert!(after.revision > before);
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_after_stop_restarts_driver() {
    let rig = rig(recent_posts());
    drop(rig.feed.subscribe());
    sleep(Duration::from_secs(6)).await;
    assert!(!rig.feed.is_running());

    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();
    assert!(rig.feed.is_running());
    let state = wait_for(&mut rx, |s| s.status == FeedStatus::Ready).await;
    assert_eq!(state.posts.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_closed_location_keeps_last_fix() {
    let rig = rig(recent_posts());
    rig.location.set(union_square()).await.unwrap();
    let mut rx = rig.feed.subscribe();
    let ready = wait_for(&mut rx, |s| s.status == FeedStatus::Ready).await;

    rig.location.close();
    assert!(rig.location.set(union_square()).await.is_err());

    let later = wait_for(&mut rx, |s| s.revision >= ready.revision + 3).await;
    assert_eq!(later.status, FeedStatus::Ready);
    assert_eq!(later.observer, Some(union_square()));
    assert!(rig.feed.is_running());
}

#[test]
fn test_invalid_config_is_rejected() {
    let location = Arc::new(ManualLocationSource::new());
    let store = Arc::new(MemoryPostStore::new());
    let config = FeedConfig { min_displayable: 0, ..FeedConfig::default() };
    assert!(FeedAssembler::builder(location, store).config(config).build().is_err());
}
