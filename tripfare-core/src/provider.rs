//! Seams to the external geocoding and routing services.
//!
//! The engine treats provider responses as opaque and only sees the mapped
//! [`Place`] and [`RawRoute`] values. Every failure is reported as a
//! [`ProviderError`]; the geocoder and resolver decide how to degrade, so
//! these errors never reach callers of the engine.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Coordinate, Place};

/// Errors from a provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout {
        /// Endpoint that was queried.
        url: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// The service answered with a non-success HTTP status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    HttpError {
        /// Endpoint that was queried.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The request failed before a response arrived.
    #[error("network error requesting {url}: {message}")]
    NetworkError {
        /// Endpoint that was queried.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The service answered but reported a non-OK status in its payload.
    #[error("service returned {code}: {message}")]
    ServiceError {
        /// Service status code, e.g. `"NoRoute"`.
        code: String,
        /// Service-supplied message.
        message: String,
    },
    /// The payload could not be decoded.
    #[error("failed to parse provider response: {message}")]
    ParseError {
        /// Decoder detail.
        message: String,
    },
    /// The service answered successfully with no usable result.
    #[error("provider returned no results")]
    NoResults,
}

impl ProviderError {
    /// Build the error used when a call exceeds `timeout`.
    #[must_use]
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether retrying later might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::NetworkError { .. } => true,
            Self::HttpError { status, .. } => *status == 429 || *status >= 500,
            Self::ServiceError { .. } | Self::ParseError { .. } | Self::NoResults => false,
        }
    }
}

/// Parameters of a geocoding search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    /// Free-text query.
    pub text: String,
    /// ISO 3166-1 alpha-2 country filter, e.g. `"in"`.
    pub country_filter: Option<String>,
    /// Maximum number of candidates to return.
    pub limit: usize,
}

impl GeocodeQuery {
    /// Create a query for `text` returning at most `limit` candidates.
    #[must_use]
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            country_filter: None,
            limit,
        }
    }

    /// Restrict results to a country.
    #[must_use]
    pub fn with_country(mut self, country: Option<String>) -> Self {
        self.country_filter = country;
        self
    }
}

/// Resolve free text to candidate places.
///
/// Implementations return candidates best-first and may return fewer than
/// `query.limit`. An empty list is a valid answer, not an error.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &str;

    /// Search for places matching `query`.
    async fn search(&self, query: &GeocodeQuery) -> Result<Vec<Place>, ProviderError>;
}

/// A driving route as reported by a routing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoute {
    /// Route length in metres.
    pub distance_meters: f64,
    /// Travel time in seconds.
    pub duration_seconds: f64,
    /// Route geometry, ordered from start to end. May be empty.
    pub path: Vec<Coordinate>,
}

/// Compute a driving route between two points.
///
/// Implementations must return [`ProviderError::NoResults`] when the service
/// reports success but no route, and [`ProviderError::ServiceError`] for a
/// non-OK status.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Request the preferred driving route from `from` to `to`.
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RawRoute, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ProviderError::timeout("http://x", Duration::from_secs(1)), true)]
    #[case(ProviderError::NetworkError { url: "u".into(), message: "m".into() }, true)]
    #[case(ProviderError::HttpError { url: "u".into(), status: 503, message: "m".into() }, true)]
    #[case(ProviderError::HttpError { url: "u".into(), status: 429, message: "m".into() }, true)]
    #[case(ProviderError::HttpError { url: "u".into(), status: 404, message: "m".into() }, false)]
    #[case(ProviderError::ServiceError { code: "NoRoute".into(), message: String::new() }, false)]
    #[case(ProviderError::NoResults, false)]
    fn classifies_transient_errors(#[case] error: ProviderError, #[case] transient: bool) {
        assert_eq!(error.is_transient(), transient);
    }

    #[rstest]
    fn timeout_records_milliseconds() {
        let err = ProviderError::timeout("http://osrm", Duration::from_millis(1500));
        assert_eq!(
            err,
            ProviderError::Timeout {
                url: "http://osrm".into(),
                timeout_ms: 1500,
            }
        );
    }

    #[rstest]
    fn query_builder_sets_country() {
        let query = GeocodeQuery::new("MG Road", 5).with_country(Some("in".into()));
        assert_eq!(query.country_filter.as_deref(), Some("in"));
        assert_eq!(query.limit, 5);
    }
}
