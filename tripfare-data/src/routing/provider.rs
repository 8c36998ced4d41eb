//! `RoutingProvider` backed by OSRM's Route API.
//!
//! # Example
//!
//! ```no_run
//! use tripfare_core::{Coordinate, RoutingProvider};
//! use tripfare_data::routing::OsrmRoutingProvider;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OsrmRoutingProvider::new("http://localhost:5000")?;
//! let route = provider
//!     .route(Coordinate::new(18.5204, 73.8567)?, Coordinate::new(19.0760, 72.8777)?)
//!     .await?;
//! println!("{} m", route.distance_meters);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use tripfare_core::{Coordinate, ProviderError, RawRoute, RoutingProvider};
use url::Url;

use super::osrm::RouteResponse;
use crate::ProviderBuildError;
use crate::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, build_client, endpoint, get_json, parse_base_url};

/// Configuration for [`OsrmRoutingProvider`].
#[derive(Debug, Clone)]
pub struct OsrmRoutingProviderConfig {
    /// Base URL for the OSRM service (e.g., `"http://localhost:5000"`).
    pub base_url: String,
    /// Routing profile segment of the URL.
    pub profile: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OsrmRoutingProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            profile: "driving".to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OsrmRoutingProviderConfig {
    /// Create a new configuration with the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Driving routes from an OSRM server.
#[derive(Debug)]
pub struct OsrmRoutingProvider {
    client: Client,
    base_url: Url,
    config: OsrmRoutingProviderConfig,
}

impl OsrmRoutingProvider {
    /// Create a provider with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OsrmRoutingProviderConfig::new(base_url))
    }

    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(config: OsrmRoutingProviderConfig) -> Result<Self, ProviderBuildError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Build the Route API URL.
    ///
    /// The URL format is
    /// `{base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?overview=full&geometries=geojson`.
    fn build_route_url(&self, from: Coordinate, to: Coordinate) -> Url {
        let path = format!(
            "route/v1/{}/{},{};{},{}",
            self.config.profile, from.longitude, from.latitude, to.longitude, to.latitude
        );
        let mut url = endpoint(&self.base_url, &path);
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        url
    }

    /// Convert an OSRM response to the preferred route.
    fn convert_response(response: RouteResponse) -> Result<RawRoute, ProviderError> {
        if !response.is_ok() {
            return Err(ProviderError::ServiceError {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }
        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::NoResults)?;
        let path = route
            .geometry
            .map(|line| {
                line.coordinates
                    .into_iter()
                    .filter_map(|[longitude, latitude]| Coordinate::new(latitude, longitude).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(RawRoute {
            distance_meters: route.distance,
            duration_seconds: route.duration,
            path,
        })
    }
}

#[async_trait]
impl RoutingProvider for OsrmRoutingProvider {
    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RawRoute, ProviderError> {
        let url = self.build_route_url(from, to);
        let response: RouteResponse = get_json(&self.client, url, self.config.timeout).await?;
        let route = Self::convert_response(response)?;
        debug!(
            "osrm route {from} -> {to}: {} m, {} s",
            route.distance_meters, route.duration_seconds
        );
        Ok(route)
    }
}
