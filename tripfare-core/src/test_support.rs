//! Deterministic doubles for tests across the workspace.
//!
//! Not part of the stable API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use crate::cache::{CacheEntry, CacheError, CacheTier, Clock};
use crate::provider::{GeocodeQuery, GeocodingProvider, ProviderError, RawRoute, RoutingProvider};
use crate::{Coordinate, Place};

/// Build a [`Place`] from literal parts.
///
/// # Panics
///
/// Panics when the coordinate is out of range.
#[must_use]
pub fn place(name: &str, formatted_address: &str, latitude: f64, longitude: f64) -> Place {
    Place {
        name: name.to_owned(),
        formatted_address: formatted_address.to_owned(),
        coordinate: coordinate(latitude, longitude),
    }
}

/// Build a [`Coordinate`] from literal parts.
///
/// # Panics
///
/// Panics when the coordinate is out of range.
#[must_use]
#[expect(clippy::expect_used, reason = "test helper with literal inputs")]
pub fn coordinate(latitude: f64, longitude: f64) -> Coordinate {
    Coordinate::new(latitude, longitude).expect("test coordinate in range")
}

/// Clock whose time only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Start the clock at `now_ms` milliseconds since the epoch.
    #[must_use]
    pub const fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by_ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_ms.fetch_add(by_ms, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Tier that fails every operation with the same error.
#[derive(Debug)]
pub struct FailingTier {
    error: CacheError,
    write_attempts: AtomicUsize,
}

impl FailingTier {
    /// Fail with `error`.
    #[must_use]
    pub const fn new(error: CacheError) -> Self {
        Self {
            error,
            write_attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `set` calls received.
    #[must_use]
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

impl<V> CacheTier<V> for FailingTier {
    fn get(&self, _key: &str) -> Result<Option<CacheEntry<V>>, CacheError> {
        Err(self.error.clone())
    }

    fn set(&self, _key: &str, _entry: CacheEntry<V>) -> Result<(), CacheError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(self.error.clone())
    }
}

/// Canned answer for a stub provider.
#[derive(Debug, Clone)]
pub enum StubResponse<T> {
    /// Return the value.
    Success(T),
    /// Fail with the error.
    Failure(ProviderError),
}

impl<T: Clone> StubResponse<T> {
    fn resolve(&self) -> Result<T, ProviderError> {
        match self {
            Self::Success(value) => Ok(value.clone()),
            Self::Failure(err) => Err(err.clone()),
        }
    }
}

/// Geocoding provider returning canned places and recording every call.
///
/// Answers can be overridden per normalised query text with
/// [`StubGeocodingProvider::with_answer`].
#[derive(Debug)]
pub struct StubGeocodingProvider {
    name: String,
    default: StubResponse<Vec<Place>>,
    answers: HashMap<String, StubResponse<Vec<Place>>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(GeocodeQuery, Instant)>>,
}

impl StubGeocodingProvider {
    /// Answer every query with `places`.
    #[must_use]
    pub fn with_places(name: &str, places: Vec<Place>) -> Self {
        Self::new(name, StubResponse::Success(places))
    }

    /// Fail every query with `error`.
    #[must_use]
    pub fn with_error(name: &str, error: ProviderError) -> Self {
        Self::new(name, StubResponse::Failure(error))
    }

    fn new(name: &str, default: StubResponse<Vec<Place>>) -> Self {
        Self {
            name: name.to_owned(),
            default,
            answers: HashMap::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer queries whose normalised text equals `text` with `response`.
    #[must_use]
    pub fn with_answer(mut self, text: &str, response: StubResponse<Vec<Place>>) -> Self {
        self.answers.insert(crate::normalize(text), response);
        self
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of searches received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Queries received, oldest first.
    #[must_use]
    pub fn queries(&self) -> Vec<GeocodeQuery> {
        self.lock_calls().iter().map(|(query, _)| query.clone()).collect()
    }

    /// Instants at which searches started, oldest first.
    #[must_use]
    pub fn call_instants(&self) -> Vec<Instant> {
        self.lock_calls().iter().map(|(_, at)| *at).collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(GeocodeQuery, Instant)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GeocodingProvider for StubGeocodingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &GeocodeQuery) -> Result<Vec<Place>, ProviderError> {
        self.lock_calls().push((query.clone(), Instant::now()));
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.answers
            .get(&crate::normalize(&query.text))
            .unwrap_or(&self.default)
            .resolve()
    }
}

/// Routing provider returning a canned route and counting calls.
#[derive(Debug)]
pub struct StubRoutingProvider {
    response: StubResponse<RawRoute>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubRoutingProvider {
    /// Answer every request with `route`.
    #[must_use]
    pub const fn with_route(route: RawRoute) -> Self {
        Self::new(StubResponse::Success(route))
    }

    /// Answer every request with a route of the given length and duration.
    #[must_use]
    pub const fn with_metrics(distance_meters: f64, duration_seconds: f64) -> Self {
        Self::with_route(RawRoute {
            distance_meters,
            duration_seconds,
            path: Vec::new(),
        })
    }

    /// Fail every request with `error`.
    #[must_use]
    pub const fn with_error(error: ProviderError) -> Self {
        Self::new(StubResponse::Failure(error))
    }

    const fn new(response: StubResponse<RawRoute>) -> Self {
        Self {
            response,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of route requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for StubRoutingProvider {
    async fn route(&self, _from: Coordinate, _to: Coordinate) -> Result<RawRoute, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.response.resolve()
    }
}
