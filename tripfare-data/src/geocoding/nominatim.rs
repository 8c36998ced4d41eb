//! `GeocodingProvider` backed by Nominatim's `/search` API.
//!
//! Nominatim's usage policy allows roughly one request per second and asks
//! for an identifying user agent; the engine's rate gate enforces spacing,
//! this adapter only sends requests.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use tripfare_core::{Coordinate, GeocodeQuery, GeocodingProvider, Place, ProviderError};
use url::Url;

use crate::ProviderBuildError;
use crate::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, build_client, endpoint, get_json, parse_base_url};

/// Public Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// One result of a `format=jsonv2` search.
#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    #[serde(default)]
    name: Option<String>,
    display_name: String,
}

impl SearchResult {
    fn into_place(self) -> Option<Place> {
        let latitude = self.lat.trim().parse().ok()?;
        let longitude = self.lon.trim().parse().ok()?;
        let coordinate = Coordinate::new(latitude, longitude).ok()?;
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                self.display_name
                    .split(',')
                    .next()
                    .map(|head| head.trim().to_owned())
            })
            .unwrap_or_default();
        Some(Place {
            name,
            formatted_address: self.display_name,
            coordinate,
        })
    }
}

/// Configuration for [`NominatimGeocodingProvider`].
#[derive(Debug, Clone)]
pub struct NominatimGeocodingProviderConfig {
    /// Base URL of the Nominatim instance.
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for NominatimGeocodingProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl NominatimGeocodingProviderConfig {
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

/// Secondary geocoder querying a Nominatim instance.
#[derive(Debug)]
pub struct NominatimGeocodingProvider {
    client: Client,
    base_url: Url,
    config: NominatimGeocodingProviderConfig,
}

impl NominatimGeocodingProvider {
    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(
        config: NominatimGeocodingProviderConfig,
    ) -> Result<Self, ProviderBuildError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn build_search_url(&self, query: &GeocodeQuery) -> Url {
        let mut url = endpoint(&self.base_url, "search");
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &query.text)
                .append_pair("format", "jsonv2")
                .append_pair("limit", &query.limit.max(1).to_string());
            if let Some(country) = &query.country_filter {
                pairs.append_pair("countrycodes", &country.to_ascii_lowercase());
            }
        }
        url
    }

    fn convert_response(results: Vec<SearchResult>) -> Vec<Place> {
        results
            .into_iter()
            .filter_map(SearchResult::into_place)
            .collect()
    }
}

#[async_trait]
impl GeocodingProvider for NominatimGeocodingProvider {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn search(&self, query: &GeocodeQuery) -> Result<Vec<Place>, ProviderError> {
        let url = self.build_search_url(query);
        let results: Vec<SearchResult> = get_json(&self.client, url, self.config.timeout).await?;
        let places = Self::convert_response(results);
        debug!("nominatim returned {} places for {:?}", places.len(), query.text);
        Ok(places)
    }
}
