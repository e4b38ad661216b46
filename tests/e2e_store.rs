//! End-to-end tests for the in-memory store's spatial query path.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use geofeed::storage::seed::diverse_posts;
use geofeed::{distance, Coordinate, ManualClock, MemoryPostStore, PostId, StoreConfig};

fn union_square() -> Coordinate {
    Coordinate::new(37.7879, -122.4075).unwrap()
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()))
}

#[test]
fn test_query_near_matches_brute_force() {
    let clock = clock();
    let config = StoreConfig { per_cell_limit: 10_000, ..StoreConfig::default() };
    let store = MemoryPostStore::with_config(config, clock.clone()).unwrap();
    let posts = diverse_posts(union_square(), Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(), 123);
    store.insert_many(posts.clone());

    for radius in [50.0, 500.0, 1_000.0, 5_000.0] {
        let expected: BTreeSet<PostId> = posts
            .iter()
            .filter(|p| distance(union_square(), p.location) <= radius)
            .map(|p| p.id)
            .collect();
        let hits = store.query_near(union_square(), radius).unwrap();
        let got: BTreeSet<PostId> = hits.iter().map(|p| p.id).collect();

        assert_eq!(got.len(), hits.len(), "duplicates at radius {radius}");
        assert_eq!(got, expected, "radius {radius}");
        assert!(hits.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}

#[test]
fn test_per_cell_limit_caps_each_scan() {
    let config = StoreConfig { per_cell_limit: 5, ..StoreConfig::default() };
    let store = MemoryPostStore::with_config(config, clock()).unwrap();
    store.insert_many(diverse_posts(union_square(), Utc::now(), 7));

    let hits = store.query_near(union_square(), 1_000.0).unwrap();
    // At most nine cells, five posts each
    assert!(hits.len() <= 45);
    assert!(hits.iter().all(|p| distance(union_square(), p.location) <= 1_000.0));
}

#[test]
fn test_seeded_store_holds_demo_populations() {
    let store = MemoryPostStore::seeded(union_square(), 123, clock());
    assert_eq!(store.len(), 180);
    assert_eq!(store.snapshot().len(), 180);
    assert!(store.snapshot().version >= 1);
}

#[test]
fn test_coarse_query_precision_still_finds_everything() {
    // Radius-derived precision would be finer; the cap widens the scan
    let config = StoreConfig { query_precision: 3, per_cell_limit: 10_000, ..StoreConfig::default() };
    let store = MemoryPostStore::with_config(config, clock()).unwrap();
    let posts = diverse_posts(union_square(), Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(), 9);
    store.insert_many(posts.clone());

    let expected: BTreeSet<PostId> = posts
        .iter()
        .filter(|p| distance(union_square(), p.location) <= 50.0)
        .map(|p| p.id)
        .collect();
    let got: BTreeSet<PostId> = store.query_near(union_square(), 50.0).unwrap().iter().map(|p| p.id).collect();
    assert_eq!(got, expected);
}

#[test]
fn test_reinserting_known_posts_changes_nothing() {
    let store = MemoryPostStore::with_config(StoreConfig::default(), clock()).unwrap();
    let posts = diverse_posts(union_square(), Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(), 5);
    let added = store.insert_many(posts.clone());
    let version = store.snapshot().version;

    assert_eq!(store.insert_many(posts), 0);
    assert_eq!(store.len(), added);
    assert_eq!(store.snapshot().len(), added);
    assert_eq!(store.snapshot().version, version);
}

#[test]
fn test_invalid_store_config_is_rejected() {
    let config = StoreConfig { query_precision: 11, ..StoreConfig::default() };
    assert!(MemoryPostStore::with_config(config, clock()).is_err());
}
