//! Driving distance and duration between two locations.
//!
//! [`RouteResolver`] geocodes address endpoints, asks the routing provider
//! for a driving route and, when that fails for any reason, degrades to a
//! great-circle estimate. Once both coordinates are known it cannot fail.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;
use tokio::time::timeout;

use crate::address::route_key;
use crate::cache::LayeredCache;
use crate::geocode::{GeocodeError, Geocoder};
use crate::provider::{ProviderError, RawRoute, RoutingProvider};
use crate::{Coordinate, Location};

/// Mean Earth radius used by the great-circle estimate, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const ESTIMATE_SUFFIX: &str = " (est.)";

/// Which end of a trip a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Endpoint {
    /// Pickup.
    From,
    /// Drop.
    To,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::From => "from",
            Self::To => "to",
        })
    }
}

/// Errors returned by [`RouteResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// An address endpoint could not be geocoded.
    #[error("could not resolve {endpoint} location: {source}")]
    UnresolvableLocation {
        /// The endpoint that failed.
        endpoint: Endpoint,
        /// Underlying geocoding failure.
        #[source]
        source: GeocodeError,
    },
}

/// Distance and travel time between two points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteMetrics {
    /// Driving distance in kilometres, one decimal place.
    pub distance_km: f64,
    /// Travel time in whole minutes.
    pub duration_minutes: u32,
    /// Human-readable distance, e.g. `"12.3 km"`.
    pub distance_label: String,
    /// Human-readable duration, e.g. `"1 hr 2 min"`.
    pub duration_label: String,
    /// Resolved pickup coordinate.
    pub from: Coordinate,
    /// Resolved drop coordinate.
    pub to: Coordinate,
    /// Route geometry; absent for estimates.
    pub path: Option<Vec<Coordinate>>,
    /// Whether the metrics are a great-circle estimate.
    pub is_estimate: bool,
}

/// Tunables for [`RouteResolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Bound on each routing call.
    pub provider_timeout: Duration,
    /// Assumed speed for estimates, in km/h.
    pub fallback_speed_kmh: f64,
    /// Smallest estimated distance, in kilometres.
    pub min_estimate_km: f64,
    /// Smallest estimated duration, in minutes.
    pub min_estimate_minutes: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            fallback_speed_kmh: 45.0,
            min_estimate_km: 1.0,
            min_estimate_minutes: 15,
        }
    }
}

impl ResolverConfig {
    /// Set the routing timeout.
    #[must_use]
    pub const fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    /// Set the speed assumed by estimates.
    #[must_use]
    pub const fn with_fallback_speed_kmh(mut self, speed: f64) -> Self {
        self.fallback_speed_kmh = speed;
        self
    }
}

/// Resolves [`Location`] pairs to [`RouteMetrics`].
pub struct RouteResolver {
    geocoder: Arc<Geocoder>,
    router: Arc<dyn RoutingProvider>,
    cache: LayeredCache<RouteMetrics>,
    config: ResolverConfig,
}

impl fmt::Debug for RouteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResolver")
            .field("geocoder", &self.geocoder)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RouteResolver {
    /// Create a resolver with an in-memory route cache.
    #[must_use]
    pub fn new(
        geocoder: Arc<Geocoder>,
        router: Arc<dyn RoutingProvider>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            geocoder,
            router,
            cache: LayeredCache::in_memory("route"),
            config,
        }
    }

    /// Replace the route cache.
    #[must_use]
    pub fn with_cache(mut self, cache: LayeredCache<RouteMetrics>) -> Self {
        self.cache = cache;
        self
    }

    /// Geocoder used for address endpoints.
    #[must_use]
    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Resolve the driving metrics from `from` to `to`.
    ///
    /// Results involving an address are cached in every tier; results for
    /// two raw coordinates stay in the first tier only.
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnresolvableLocation`] when an address endpoint cannot
    /// be geocoded. Routing failures never surface; they yield an estimate.
    pub async fn resolve(
        &self,
        from: &Location,
        to: &Location,
    ) -> Result<RouteMetrics, ResolveError> {
        let key = route_key(from, to);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let origin = self.locate(from, Endpoint::From).await?;
        let destination = self.locate(to, Endpoint::To).await?;
        let metrics = if origin.cache_key() == destination.cache_key() {
            debug!("identical endpoints {origin}; skipping routing");
            stationary(origin, destination)
        } else {
            self.route(origin, destination).await
        };

        if from.is_address() || to.is_address() {
            self.cache.set(&key, metrics.clone());
        } else {
            self.cache.set_local(&key, metrics.clone());
        }
        Ok(metrics)
    }

    async fn locate(
        &self,
        location: &Location,
        endpoint: Endpoint,
    ) -> Result<Coordinate, ResolveError> {
        match location {
            Location::Coordinate(coordinate) => Ok(*coordinate),
            Location::Address(address) => self
                .geocoder
                .geocode(address)
                .await
                .map(|result| result.coordinate)
                .map_err(|source| ResolveError::UnresolvableLocation { endpoint, source }),
        }
    }

    async fn route(&self, from: Coordinate, to: Coordinate) -> RouteMetrics {
        let outcome = timeout(self.config.provider_timeout, self.router.route(from, to))
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::timeout("routing provider", self.config.provider_timeout))
            })
            .and_then(validate);

        match outcome {
            Ok(route) => measured(from, to, route),
            Err(err) => {
                match &err {
                    ProviderError::Timeout { .. } | ProviderError::NetworkError { .. } => {
                        warn!("routing provider unreachable, estimating {from} -> {to}: {err}");
                    }
                    ProviderError::NoResults | ProviderError::ServiceError { .. } => {
                        warn!("routing provider found no route, estimating {from} -> {to}: {err}");
                    }
                    ProviderError::HttpError { .. } | ProviderError::ParseError { .. } => {
                        warn!("routing provider failed, estimating {from} -> {to}: {err}");
                    }
                }
                self.estimate(from, to)
            }
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "estimates are floating-point distance over speed"
    )]
    fn estimate(&self, from: Coordinate, to: Coordinate) -> RouteMetrics {
        let distance_km = round_tenths(haversine_km(from, to)).max(self.config.min_estimate_km);
        let speed = if self.config.fallback_speed_kmh.is_finite()
            && self.config.fallback_speed_kmh > 0.0
        {
            self.config.fallback_speed_kmh
        } else {
            ResolverConfig::default().fallback_speed_kmh
        };
        let duration_minutes =
            whole_minutes(distance_km / speed * 60.0).max(self.config.min_estimate_minutes);
        RouteMetrics {
            distance_km,
            duration_minutes,
            distance_label: format!("{}{ESTIMATE_SUFFIX}", distance_label(distance_km)),
            duration_label: format!("{}{ESTIMATE_SUFFIX}", duration_label(duration_minutes)),
            from,
            to,
            path: None,
            is_estimate: true,
        }
    }
}

fn validate(route: RawRoute) -> Result<RawRoute, ProviderError> {
    let usable = |value: f64| value.is_finite() && value >= 0.0;
    if usable(route.distance_meters) && usable(route.duration_seconds) {
        Ok(route)
    } else {
        Err(ProviderError::ParseError {
            message: format!(
                "route has unusable metrics: {} m, {} s",
                route.distance_meters, route.duration_seconds
            ),
        })
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "unit conversion of provider metrics"
)]
fn measured(from: Coordinate, to: Coordinate, route: RawRoute) -> RouteMetrics {
    let distance_km = round_tenths(route.distance_meters / 1000.0);
    let duration_minutes = whole_minutes(route.duration_seconds / 60.0);
    let path = if route.path.is_empty() {
        vec![from, to]
    } else {
        route.path
    };
    RouteMetrics {
        distance_km,
        duration_minutes,
        distance_label: distance_label(distance_km),
        duration_label: duration_label(duration_minutes),
        from,
        to,
        path: Some(path),
        is_estimate: false,
    }
}

fn stationary(from: Coordinate, to: Coordinate) -> RouteMetrics {
    RouteMetrics {
        distance_km: 0.0,
        duration_minutes: 0,
        distance_label: distance_label(0.0),
        duration_label: duration_label(0),
        from,
        to,
        path: Some(vec![from]),
        is_estimate: false,
    }
}

/// Great-circle distance between two coordinates, in kilometres.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "haversine formula is floating-point trigonometry"
)]
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Format minutes as `"<h> hr <m> min"` from an hour upwards, else `"<m> min"`.
#[must_use]
pub fn duration_label(minutes: u32) -> String {
    let hours = minutes.div_euclid(60);
    let rest = minutes.rem_euclid(60);
    if hours > 0 {
        format!("{hours} hr {rest} min")
    } else {
        format!("{rest} min")
    }
}

/// Format kilometres as `"<km> km"`.
#[must_use]
pub fn distance_label(km: f64) -> String {
    format!("{km} km")
}

#[expect(clippy::float_arithmetic, reason = "decimal rounding")]
fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "minutes are clamped to the u32 range before the cast"
)]
fn whole_minutes(minutes: f64) -> u32 {
    minutes.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
