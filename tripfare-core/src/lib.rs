//! Core domain types for the Tripfare engine.
//!
//! The crate turns two free-text or coordinate locations into a billable
//! distance, a travel-time estimate and a fare. Remote geocoding and routing
//! services are reached through the [`GeocodingProvider`] and
//! [`RoutingProvider`] traits; concrete HTTP adapters live in
//! `tripfare-data`.
//!
//! Constructors return `Result` to surface invalid input early.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod address;
pub mod cache;
pub mod fare;
pub mod geocode;
pub mod provider;
pub mod rate_gate;
pub mod route;

#[doc(hidden)]
pub mod test_support;

pub use address::normalize;
pub use cache::{
    CacheEntry, CacheError, CacheTier, Clock, LayeredCache, MemoryTier, SystemClock,
};
#[cfg(feature = "store-sqlite")]
pub use cache::{SqliteTier, SqliteTierError};
pub use fare::{
    FareQuote, FareRequest, MIN_KM_PER_DAY, PricingSettings, RideType, RideTypeParseError,
    compute_fare,
};
pub use geocode::{GeocodeError, Geocoder, GeocoderConfig};
pub use provider::{GeocodeQuery, GeocodingProvider, ProviderError, RawRoute, RoutingProvider};
pub use rate_gate::RateGate;
pub use route::{Endpoint, ResolveError, ResolverConfig, RouteMetrics, RouteResolver};

/// A WGS84 position in decimal degrees.
///
/// # Examples
///
/// ```
/// use tripfare_core::Coordinate;
///
/// # fn main() -> Result<(), tripfare_core::CoordinateError> {
/// let pune = Coordinate::new(18.5204, 73.8567)?;
/// assert_eq!(pune.cache_key(), "18.520400,73.856700");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "CoordinateParts")
)]
pub struct Coordinate {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
}

/// Unvalidated wire form of a [`Coordinate`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CoordinateParts {
    latitude: f64,
    longitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<CoordinateParts> for Coordinate {
    type Error = CoordinateError;

    fn try_from(parts: CoordinateParts) -> Result<Self, Self::Error> {
        Self::new(parts.latitude, parts.longitude)
    }
}

/// Errors returned by [`Coordinate::new`] and [`Coordinate::from_str`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// Latitude was not finite or fell outside `[-90, 90]`.
    #[error("latitude must be a finite value between -90 and 90")]
    LatitudeOutOfRange,
    /// Longitude was not finite or fell outside `[-180, 180]`.
    #[error("longitude must be a finite value between -180 and 180")]
    LongitudeOutOfRange,
    /// Text did not contain a `lat,lon` pair.
    #[error("expected a `lat,lon` pair, found {text:?}")]
    Malformed {
        /// The rejected input.
        text: String,
    },
}

impl Coordinate {
    /// Validates and constructs a [`Coordinate`].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange);
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Stable cache key with six decimal places (roughly 0.1 m).
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{:.6},{:.6}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    /// Parse a `lat,lon` pair such as `"18.52,73.85"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordinateError::Malformed { text: s.to_owned() };
        let (lat, lon) = s.split_once(',').ok_or_else(malformed)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| malformed())?;
        let longitude: f64 = lon.trim().parse().map_err(|_| malformed())?;
        Self::new(latitude, longitude)
    }
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeocodeResult {
    /// Position of the address.
    pub coordinate: Coordinate,
    /// Provider-formatted, human-readable address.
    pub formatted_address: String,
}

/// A single candidate returned by a geocoding provider.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Place {
    /// Short name, e.g. a street or landmark.
    pub name: String,
    /// Full display address.
    pub formatted_address: String,
    /// Position of the candidate.
    pub coordinate: Coordinate,
}

impl From<Place> for GeocodeResult {
    fn from(place: Place) -> Self {
        Self {
            coordinate: place.coordinate,
            formatted_address: place.formatted_address,
        }
    }
}

/// One end of a trip: either free text still to be geocoded or a known point.
///
/// Parsing never fails; text that is not a valid `lat,lon` pair is treated as
/// an address.
///
/// # Examples
///
/// ```
/// use tripfare_core::Location;
///
/// let pin: Location = "18.52,73.85".parse().unwrap_or_else(|never| match never {});
/// assert!(matches!(pin, Location::Coordinate(_)));
///
/// let address: Location = "MG Road, Pune".parse().unwrap_or_else(|never| match never {});
/// assert!(matches!(address, Location::Address(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    /// Free-text address.
    Address(String),
    /// Already-resolved position, e.g. a manually dropped pin.
    Coordinate(Coordinate),
}

impl Location {
    /// Whether this endpoint still needs geocoding.
    #[must_use]
    pub const fn is_address(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

impl From<Coordinate> for Location {
    fn from(coordinate: Coordinate) -> Self {
        Self::Coordinate(coordinate)
    }
}

impl FromStr for Location {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<Coordinate>()
            .map_or_else(|_| Self::Address(s.to_owned()), Self::Coordinate))
    }
}
