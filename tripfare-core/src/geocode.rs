//! Address resolution with provider fallback and a shared rate gate.
//!
//! Lookups consult the cache first, then the optional primary provider and
//! finally the secondary provider. Only the secondary provider is
//! rate-limited: every call to it passes through the geocoder's
//! [`RateGate`], whatever address it is for.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::time::timeout;

use crate::address::normalize;
use crate::cache::LayeredCache;
use crate::provider::{GeocodeQuery, GeocodingProvider, ProviderError};
use crate::rate_gate::{DEFAULT_MIN_INTERVAL, RateGate};
use crate::{GeocodeResult, Place};

/// Default cap on suggestion lists.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// Default minimum query length before suggestions are fetched.
pub const DEFAULT_MIN_SUGGESTION_CHARS: usize = 3;

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

const LOW_QUALITY_MARKERS: [&str; 2] = ["unnamed road", "unnamed street"];

/// Errors returned by [`Geocoder::geocode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The address was empty after normalisation.
    #[error("address must not be empty")]
    InvalidInput,
    /// No provider produced a result.
    #[error("no location found for {address:?}")]
    LocationNotFound {
        /// The address as supplied by the caller.
        address: String,
    },
}

/// Tunables for [`Geocoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    /// Country filter forwarded to providers, e.g. `"in"`.
    pub country_filter: Option<String>,
    /// Minimum spacing between secondary-provider calls.
    pub secondary_min_interval: Duration,
    /// Maximum number of suggestions returned.
    pub max_suggestions: usize,
    /// Queries shorter than this (after normalisation) get no suggestions.
    pub min_suggestion_chars: usize,
    /// Bound on each provider call; expiry counts as a provider failure.
    pub provider_timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            country_filter: Some("in".to_owned()),
            secondary_min_interval: DEFAULT_MIN_INTERVAL,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            min_suggestion_chars: DEFAULT_MIN_SUGGESTION_CHARS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl GeocoderConfig {
    /// Set or clear the country filter.
    #[must_use]
    pub fn with_country_filter(mut self, country: Option<String>) -> Self {
        self.country_filter = country;
        self
    }

    /// Set the secondary-provider spacing.
    #[must_use]
    pub const fn with_secondary_min_interval(mut self, interval: Duration) -> Self {
        self.secondary_min_interval = interval;
        self
    }

    /// Set the suggestion cap.
    #[must_use]
    pub const fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    /// Set the minimum suggestion query length.
    #[must_use]
    pub const fn with_min_suggestion_chars(mut self, chars: usize) -> Self {
        self.min_suggestion_chars = chars;
        self
    }

    /// Set the per-call provider timeout.
    #[must_use]
    pub const fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }
}

/// Resolves addresses to coordinates and serves address suggestions.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tripfare_core::{Coordinate, Geocoder, GeocoderConfig, Place};
/// use tripfare_core::test_support::StubGeocodingProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let place = Place {
///     name: "MG Road".into(),
///     formatted_address: "MG Road, Pune".into(),
///     coordinate: Coordinate::new(18.5204, 73.8567)?,
/// };
/// let secondary = Arc::new(StubGeocodingProvider::with_places("nominatim", vec![place]));
/// let geocoder = Geocoder::new(secondary.clone(), GeocoderConfig::default());
///
/// let first = geocoder.geocode("  MG Road, Pune ").await?;
/// let second = geocoder.geocode("mg road, pune").await?;
/// assert_eq!(first, second);
/// assert_eq!(secondary.call_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Geocoder {
    primary: Option<Arc<dyn GeocodingProvider>>,
    secondary: Arc<dyn GeocodingProvider>,
    gate: RateGate,
    results: LayeredCache<GeocodeResult>,
    suggestions: LayeredCache<Vec<Place>>,
    config: GeocoderConfig,
}

impl std::fmt::Debug for Geocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geocoder")
            .field("primary", &self.primary.as_ref().map(|p| p.name().to_owned()))
            .field("secondary", &self.secondary.name())
            .field("gate", &self.gate)
            .field("results", &self.results)
            .field("suggestions", &self.suggestions)
            .field("config", &self.config)
            .finish()
    }
}

impl Geocoder {
    /// Create a geocoder backed only by `secondary`, with in-memory caches.
    #[must_use]
    pub fn new(secondary: Arc<dyn GeocodingProvider>, config: GeocoderConfig) -> Self {
        Self {
            primary: None,
            secondary,
            gate: RateGate::new(config.secondary_min_interval),
            results: LayeredCache::in_memory("geocode"),
            suggestions: LayeredCache::in_memory("suggest"),
            config,
        }
    }

    /// Consult `primary` before the secondary provider.
    #[must_use]
    pub fn with_primary(mut self, primary: Arc<dyn GeocodingProvider>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Replace the default in-memory caches.
    #[must_use]
    pub fn with_caches(
        mut self,
        results: LayeredCache<GeocodeResult>,
        suggestions: LayeredCache<Vec<Place>>,
    ) -> Self {
        self.results = results;
        self.suggestions = suggestions;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Resolve `address` to a single best match.
    ///
    /// # Errors
    ///
    /// [`GeocodeError::InvalidInput`] for blank input and
    /// [`GeocodeError::LocationNotFound`] when every provider fails or
    /// returns nothing.
    pub async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let key = normalize(address);
        if key.is_empty() {
            return Err(GeocodeError::InvalidInput);
        }
        if let Some(hit) = self.results.get(&key) {
            return Ok(hit);
        }

        let query = self.query(address, 1);
        if let Some(primary) = &self.primary {
            match self.search(primary.as_ref(), &query).await {
                Ok(places) => {
                    if let Some(best) = places.into_iter().next() {
                        return Ok(self.remember(&key, best));
                    }
                    debug!("primary provider {} found nothing for {key:?}", primary.name());
                }
                Err(err) => {
                    warn!("primary provider {} failed for {key:?}: {err}", primary.name());
                }
            }
        }

        match self.search_secondary(&query).await {
            Ok(places) => places.into_iter().next().map_or_else(
                || {
                    Err(GeocodeError::LocationNotFound {
                        address: address.trim().to_owned(),
                    })
                },
                |best| Ok(self.remember(&key, best)),
            ),
            Err(err) => {
                warn!(
                    "secondary provider {} failed for {key:?}: {err}",
                    self.secondary.name()
                );
                Err(GeocodeError::LocationNotFound {
                    address: address.trim().to_owned(),
                })
            }
        }
    }

    /// Suggest up to `max_suggestions` places for a partial address.
    ///
    /// Never fails: provider errors degrade to an empty list. Empty answers
    /// are not cached so a later keystroke can retry.
    pub async fn suggest(&self, text: &str) -> Vec<Place> {
        let key = normalize(text);
        if key.chars().count() < self.config.min_suggestion_chars.max(1) {
            return Vec::new();
        }
        if let Some(hit) = self.suggestions.get(&key) {
            return hit;
        }

        let query = self.query(text, self.config.max_suggestions);
        let mut candidates = Vec::new();
        if let Some(primary) = &self.primary {
            match self.search(primary.as_ref(), &query).await {
                Ok(places) => candidates = self.filter_suggestions(places),
                Err(err) => warn!(
                    "primary provider {} suggestions failed for {key:?}: {err}",
                    primary.name()
                ),
            }
        }
        if candidates.is_empty() {
            match self.search_secondary(&query).await {
                Ok(places) => candidates = self.filter_suggestions(places),
                Err(err) => warn!(
                    "secondary provider {} suggestions failed for {key:?}: {err}",
                    self.secondary.name()
                ),
            }
        }

        if !candidates.is_empty() {
            self.suggestions.set(&key, candidates.clone());
        }
        candidates
    }

    fn query(&self, text: &str, limit: usize) -> GeocodeQuery {
        GeocodeQuery::new(text.trim(), limit).with_country(self.config.country_filter.clone())
    }

    fn remember(&self, key: &str, place: Place) -> GeocodeResult {
        let result = GeocodeResult::from(place);
        self.results.set(key, result.clone());
        result
    }

    async fn search_secondary(&self, query: &GeocodeQuery) -> Result<Vec<Place>, ProviderError> {
        self.gate.acquire().await;
        self.search(self.secondary.as_ref(), query).await
    }

    async fn search(
        &self,
        provider: &dyn GeocodingProvider,
        query: &GeocodeQuery,
    ) -> Result<Vec<Place>, ProviderError> {
        debug!("querying {} for {:?}", provider.name(), query.text);
        timeout(self.config.provider_timeout, provider.search(query))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::timeout(
                    provider.name(),
                    self.config.provider_timeout,
                ))
            })
    }

    fn filter_suggestions(&self, places: Vec<Place>) -> Vec<Place> {
        let mut seen = HashSet::new();
        places
            .into_iter()
            .filter(|place| !is_low_quality(place))
            .filter(|place| seen.insert(normalize(&place.formatted_address)))
            .take(self.config.max_suggestions)
            .collect()
    }
}

fn is_low_quality(place: &Place) -> bool {
    let name = place.name.to_lowercase();
    let address = place.formatted_address.to_lowercase();
    name.trim().is_empty()
        || LOW_QUALITY_MARKERS
            .iter()
            .any(|marker| name.contains(marker) || address.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGeocodingProvider, place};
    use rstest::{fixture, rstest};
    use tokio::time::Instant;

    #[fixture]
    fn pune() -> Place {
        place("MG Road", "MG Road, Pune, Maharashtra", 18.5204, 73.8567)
    }

    fn geocoder(secondary: &Arc<StubGeocodingProvider>) -> Geocoder {
        Geocoder::new(secondary.clone(), GeocoderConfig::default())
    }

    #[rstest]
    #[tokio::test]
    async fn blank_address_is_invalid(pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let err = geocoder(&secondary)
            .geocode("   ")
            .await
            .expect_err("blank input");
        assert_eq!(err, GeocodeError::InvalidInput);
        assert_eq!(secondary.call_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn repeated_lookups_hit_cache(pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary);
        let first = geocoder.geocode("  MG Road, Pune  ").await.expect("found");
        let second = geocoder.geocode("mg road, pune").await.expect("found");
        assert_eq!(first, second);
        assert_eq!(secondary.call_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn primary_success_skips_secondary(pune: Place) {
        let primary = Arc::new(StubGeocodingProvider::with_places("primary", vec![pune.clone()]));
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary).with_primary(primary.clone());
        geocoder.geocode("MG Road, Pune").await.expect("found");
        assert_eq!(primary.call_count(), 1);
        assert_eq!(secondary.call_count(), 0);
    }

    #[rstest]
    #[case::primary_fails(StubGeocodingProvider::with_error(
        "primary",
        ProviderError::NetworkError { url: "http://primary".into(), message: "refused".into() },
    ))]
    #[case::primary_empty(StubGeocodingProvider::with_places("primary", Vec::new()))]
    #[tokio::test]
    async fn falls_back_to_secondary(#[case] primary: StubGeocodingProvider, pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune.clone()]));
        let geocoder = geocoder(&secondary).with_primary(Arc::new(primary));
        let result = geocoder.geocode("MG Road, Pune").await.expect("found");
        assert_eq!(result.coordinate, pune.coordinate);
        assert_eq!(secondary.call_count(), 1);
    }

    #[rstest]
    #[case::empty(StubGeocodingProvider::with_places("secondary", Vec::new()))]
    #[case::failure(StubGeocodingProvider::with_error("secondary", ProviderError::NoResults))]
    #[tokio::test]
    async fn exhausted_providers_report_not_found(#[case] secondary: StubGeocodingProvider) {
        let geocoder = Geocoder::new(Arc::new(secondary), GeocoderConfig::default());
        let err = geocoder.geocode("Atlantis").await.expect_err("not found");
        assert_eq!(
            err,
            GeocodeError::LocationNotFound {
                address: "Atlantis".into()
            }
        );
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn slow_primary_times_out_and_falls_back(pune: Place) {
        let primary = Arc::new(
            StubGeocodingProvider::with_places("primary", vec![pune.clone()])
                .with_delay(Duration::from_secs(30)),
        );
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let config = GeocoderConfig::default().with_provider_timeout(Duration::from_secs(2));
        let geocoder = Geocoder::new(secondary.clone(), config).with_primary(primary);

        let start = Instant::now();
        geocoder.geocode("MG Road, Pune").await.expect("found");

        assert_eq!(secondary.call_count(), 1);
        assert!(Instant::now() - start < Duration::from_secs(30));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn concurrent_secondary_calls_are_spaced(pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary);

        let (a, b, c) = tokio::join!(
            geocoder.geocode("Shivaji Nagar"),
            geocoder.geocode("Kothrud"),
            geocoder.geocode("Baner"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let mut instants = secondary.call_instants();
        instants.sort();
        assert_eq!(instants.len(), 3);
        for pair in instants.windows(2) {
            assert!(pair[1] - pair[0] >= DEFAULT_MIN_INTERVAL);
        }
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn primary_is_not_rate_limited(pune: Place) {
        let primary = Arc::new(StubGeocodingProvider::with_places("primary", vec![pune.clone()]));
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary).with_primary(primary.clone());

        let start = Instant::now();
        let (a, b) = tokio::join!(geocoder.geocode("Kothrud"), geocoder.geocode("Baner"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(Instant::now(), start);
        assert_eq!(primary.call_count(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn suggestions_are_filtered_and_capped() {
        let places = vec![
            place("Unnamed Road", "Unnamed Road, Pune", 18.5, 73.8),
            place("MG Road", "MG Road, Pune", 18.52, 73.85),
            place("MG Road", "mg road, pune", 18.52, 73.85),
            place("MG Road Camp", "MG Road, Camp, Pune", 18.51, 73.87),
            place("MG Road Metro", "MG Road Metro, Pune", 18.53, 73.86),
        ];
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", places));
        let config = GeocoderConfig::default().with_max_suggestions(2);
        let geocoder = Geocoder::new(secondary, config);

        let suggestions = geocoder.suggest("MG Road").await;

        let names: Vec<_> = suggestions.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["MG Road", "MG Road Camp"]);
    }

    #[rstest]
    #[tokio::test]
    async fn suggestion_failures_degrade_to_empty() {
        let secondary = Arc::new(StubGeocodingProvider::with_error(
            "secondary",
            ProviderError::HttpError {
                url: "http://nominatim".into(),
                status: 503,
                message: "unavailable".into(),
            },
        ));
        let geocoder = Geocoder::new(secondary.clone(), GeocoderConfig::default());
        assert!(geocoder.suggest("MG Road").await.is_empty());
        assert!(geocoder.suggest("MG Road").await.is_empty());
        assert_eq!(secondary.call_count(), 2, "empty answers are not cached");
    }

    #[rstest]
    #[tokio::test]
    async fn short_queries_skip_providers(pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary);
        assert!(geocoder.suggest(" m ").await.is_empty());
        assert_eq!(secondary.call_count(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn suggestions_do_not_share_geocode_cache(pune: Place) {
        let secondary = Arc::new(StubGeocodingProvider::with_places("secondary", vec![pune]));
        let geocoder = geocoder(&secondary);
        geocoder.geocode("MG Road").await.expect("found");
        let suggestions = geocoder.suggest("MG Road").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(secondary.call_count(), 2);
        geocoder.suggest("mg road").await;
        assert_eq!(secondary.call_count(), 2);
    }
}
