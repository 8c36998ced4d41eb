//! HTTP adapters for the Tripfare engine.
//!
//! Responsibilities:
//! - Implement [`tripfare_core::GeocodingProvider`] for the Pelias
//!   (OpenRouteService) and Nominatim search APIs.
//! - Implement [`tripfare_core::RoutingProvider`] for the OSRM route API.
//! - Map transport and payload failures onto
//!   [`tripfare_core::ProviderError`].
//!
//! Boundaries:
//! - Do not encode fallback, caching or rate limiting; those live in
//!   `tripfare-core`.
//!
//! Invariants:
//! - Adapters are `Send + Sync` and hold no mutable state.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod geocoding;
mod http;
pub mod routing;

pub use geocoding::{
    NominatimGeocodingProvider, NominatimGeocodingProviderConfig, PeliasGeocodingProvider,
    PeliasGeocodingProviderConfig,
};
pub use http::DEFAULT_USER_AGENT;
pub use routing::{OsrmRoutingProvider, OsrmRoutingProviderConfig};

/// Error raised while constructing an HTTP adapter.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The configured base URL is not an absolute URL.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Parser detail.
        #[source]
        source: url::ParseError,
    },
    /// The provider requires an API key and none was configured.
    #[error("{provider} requires an API key")]
    MissingApiKey {
        /// Provider name.
        provider: &'static str,
    },
}
