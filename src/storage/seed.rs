//! Reproducible demo populations.
//!
//! Five groups scattered around a center, from a dense crowd posting right
//! now to a thin layer of month-old posts hundreds of kilometres away, so
//! every rung of the time ladder and the whole visual range get exercised.

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::{encode, plus_code, STORAGE_PRECISION};
use crate::model::{Coordinate, Post, PostId};

/// One population: `count` posts, uniform within `±spread_deg / 2` of the
/// center and up to `max_age` old.
#[derive(Debug, Clone, Copy)]
pub struct Population {
    pub label: &'static str,
    pub count: usize,
    pub spread_deg: f64,
    pub max_age: TimeDelta,
}

/// crowd ≈20 m / 1 min, walkers ≈1 km / 5 min, city ≈10 km / 1 h,
/// regional ≈200 km / 24 h, ancient ≈1000 km / 30 d.
pub fn default_populations() -> [Population; 5] {
    [
        Population { label: "Crowd member", count: 20, spread_deg: 0.0002, max_age: TimeDelta::minutes(1) },
        Population { label: "Nearby walker", count: 30, spread_deg: 0.01, max_age: TimeDelta::minutes(5) },
        Population { label: "City dweller", count: 30, spread_deg: 0.1, max_age: TimeDelta::hours(1) },
        Population { label: "Regional user", count: 50, spread_deg: 2.0, max_age: TimeDelta::hours(24) },
        Population { label: "Ancient user", count: 50, spread_deg: 10.0, max_age: TimeDelta::days(30) },
    ]
}

/// The default populations, ids starting at 1.
pub fn diverse_posts(center: Coordinate, now: DateTime<Utc>, seed: u64) -> Vec<Post> {
    generate(center, now, seed, &default_populations())
}

pub fn generate(
    center: Coordinate,
    now: DateTime<Utc>,
    seed: u64,
    populations: &[Population],
) -> Vec<Post> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut posts = Vec::with_capacity(populations.iter().map(|p| p.count).sum());
    let mut next_id = 1u64;

    for population in populations {
        let max_age_ms = population.max_age.num_milliseconds().max(1);
        for i in 0..population.count {
            let location = center.offset(
                (rng.r#gen::<f64>() - 0.5) * population.spread_deg,
                (rng.r#gen::<f64>() - 0.5) * population.spread_deg,
            );
            let age = TimeDelta::milliseconds(rng.gen_range(0..max_age_ms));
            let Ok(cell) = encode(location, STORAGE_PRECISION) else {
                continue;
            };
            posts.push(Post {
                id: PostId(next_id),
                author_id: format!("mock_user_{}", rng.gen_range(0..1000)),
                author_name: "Stranger".to_string(),
                text: format!("{} {i}", population.label),
                created_at: now - age,
                location,
                cell,
                plus_code: plus_code(location),
            });
            next_id += 1;
        }
    }

    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::distance;

    fn center() -> Coordinate {
        Coordinate::new(37.7879, -122.4075).unwrap()
    }

    #[test]
    fn test_same_seed_same_posts() {
        let now = Utc::now();
        assert_eq!(diverse_posts(center(), now, 123), diverse_posts(center(), now, 123));
    }

    #[test]
    fn test_population_shapes() {
        let now = Utc::now();
        let posts = diverse_posts(center(), now, 123);
        assert_eq!(posts.len(), 180);
        assert!(posts.iter().all(|p| p.plus_code == plus_code(p.location)));

        let crowd = &posts[..20];
        assert!(crowd.iter().all(|p| distance(center(), p.location) < 20.0));
        assert!(crowd.iter().all(|p| now - p.created_at <= TimeDelta::minutes(1)));

        let ancient = &posts[130..];
        assert!(ancient.iter().all(|p| p.text.starts_with("Ancient user")));
        assert!(ancient.iter().all(|p| now - p.created_at <= TimeDelta::days(30)));
    }
}
