use std::collections::BTreeMap;
use std::time::Instant;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rbtree_map::RbTreeMap;

const SEED: u64 = 0x5EED;

fn main() {
    env_logger::init();

    let n: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(100_000);
    info!("running insert/find/remove rounds over {} random keys", n);

    // Same seed per phase replays the identical key sequence, so every
    // lookup and removal targets a key that was inserted.
    let start = Instant::now();
    let mut map = RbTreeMap::new();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..n {
        let key: u32 = rng.gen();
        map.insert(key, key.wrapping_add(1));
    }
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut hits = 0usize;
    for _ in 0..n {
        let key: u32 = rng.gen();
        if map.find(&key) {
            hits += 1;
        }
    }
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut removed = 0usize;
    for _ in 0..n {
        let key: u32 = rng.gen();
        if map.remove(&key) {
            removed += 1;
        }
    }
    let our_time = start.elapsed();
    println!(
        "rbtree map:   {:?} ({} lookups hit, {} removed)",
        our_time, hits, removed
    );

    let start = Instant::now();
    let mut std_map = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(SEED);
    for _ in 0..n {
        let key: u32 = rng.gen();
        std_map.insert(key, key.wrapping_add(1));
    }
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut std_hits = 0usize;
    for _ in 0..n {
        let key: u32 = rng.gen();
        if std_map.contains_key(&key) {
            std_hits += 1;
        }
    }
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut std_removed = 0usize;
    for _ in 0..n {
        let key: u32 = rng.gen();
        if std_map.remove(&key).is_some() {
            std_removed += 1;
        }
    }
    let std_time = start.elapsed();
    println!(
        "std BTreeMap: {:?} ({} lookups hit, {} removed)",
        std_time, std_hits, std_removed
    );
}
