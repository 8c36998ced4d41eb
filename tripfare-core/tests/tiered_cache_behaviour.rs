//! Behavioural tests for [`LayeredCache`] over memory and SQLite tiers.
#![cfg(feature = "store-sqlite")]

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;
use tripfare_core::cache::GEOCODE_TTL;
use tripfare_core::test_support::{FailingTier, ManualClock, coordinate};
use tripfare_core::{
    CacheEntry, CacheError, CacheTier, GeocodeResult, LayeredCache, MemoryTier, SqliteTier,
};

const KEY: &str = "mg road, pune";
const START_MS: u64 = 1_700_000_000_000;

/// Tiers under test and the clock driving their expiry.
struct CacheWorld {
    clock: Arc<ManualClock>,
    memory: Arc<MemoryTier<GeocodeResult>>,
    persisted: Arc<SqliteTier<GeocodeResult>>,
    cache: RefCell<LayeredCache<GeocodeResult>>,
}

#[fixture]
fn world() -> CacheWorld {
    let clock = Arc::new(ManualClock::new(START_MS));
    let memory = Arc::new(MemoryTier::new());
    let persisted = Arc::new(SqliteTier::in_memory("geocode").expect("sqlite tier"));
    let cache = LayeredCache::new("geocode", clock.clone())
        .with_tier(memory.clone(), None)
        .with_tier(persisted.clone(), Some(GEOCODE_TTL));
    CacheWorld {
        clock,
        memory,
        persisted,
        cache: RefCell::new(cache),
    }
}

fn sample() -> GeocodeResult {
    GeocodeResult {
        coordinate: coordinate(18.5204, 73.8567),
        formatted_address: "MG Road, Pune, Maharashtra".to_owned(),
    }
}

// --- Given steps ---

#[given("a geocode result persisted in the SQLite tier")]
fn persisted_result(#[from(world)] world: &CacheWorld) {
    world
        .persisted
        .set(KEY, CacheEntry::new(sample(), START_MS))
        .expect("seed sqlite tier");
}

#[given("a cache whose persisted tier rejects writes")]
fn rejecting_tier(#[from(world)] world: &CacheWorld) {
    let failing = Arc::new(FailingTier::new(CacheError::Backend {
        message: "quota exceeded".to_owned(),
    }));
    *world.cache.borrow_mut() = LayeredCache::new("geocode", world.clock.clone())
        .with_tier(world.memory.clone(), None)
        .with_tier(failing, Some(GEOCODE_TTL));
}

// --- When steps ---

#[when("23 hours and 59 minutes pass")]
fn almost_a_day(#[from(world)] world: &CacheWorld) {
    world
        .clock
        .advance(Duration::from_secs(23 * 60 * 60 + 59 * 60));
}

#[when("24 hours and 1 minute pass")]
fn just_over_a_day(#[from(world)] world: &CacheWorld) {
    world.clock.advance(Duration::from_secs(24 * 60 * 60 + 60));
}

#[when("1 hour passes")]
fn one_hour(#[from(world)] world: &CacheWorld) {
    world.clock.advance(Duration::from_secs(60 * 60));
}

#[when("I store a geocode result")]
fn store_result(#[from(world)] world: &CacheWorld) {
    world.cache.borrow().set(KEY, sample());
}

// --- Then steps ---

#[then("the cache returns the result")]
fn returns_result(#[from(world)] world: &CacheWorld) {
    assert_eq!(world.cache.borrow().get(KEY), Some(sample()));
}

#[then("the cache returns nothing")]
fn returns_nothing(#[from(world)] world: &CacheWorld) {
    assert_eq!(world.cache.borrow().get(KEY), None);
}

#[then("the SQLite tier no longer holds the entry")]
fn purged(#[from(world)] world: &CacheWorld) {
    assert!(world.persisted.get(KEY).expect("sqlite read").is_none());
}

#[then("the memory tier holds the entry")]
fn promoted(#[from(world)] world: &CacheWorld) {
    let entry = world
        .memory
        .get(KEY)
        .expect("memory read")
        .expect("promoted entry");
    assert_eq!(entry.stored_at_epoch_ms, START_MS);
}

// --- Scenario registrations ---

#[scenario(path = "tests/features/tiered_cache.feature", index = 0)]
fn readable_before_expiry(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tiered_cache.feature", index = 1)]
fn expires_after_ttl(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tiered_cache.feature", index = 2)]
fn hit_is_promoted(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/tiered_cache.feature", index = 3)]
fn failing_tier_does_not_fail_writes(world: CacheWorld) {
    let _ = world;
}
