//! `GeocodingProvider` backed by a Pelias search endpoint.
//!
//! Defaults target the OpenRouteService deployment, which requires an API key
//! passed as the `api_key` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use tripfare_core::{Coordinate, GeocodeQuery, GeocodingProvider, Place, ProviderError};
use url::Url;

use crate::ProviderBuildError;
use crate::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, build_client, endpoint, get_json, parse_base_url};

/// OpenRouteService API root.
pub const DEFAULT_PELIAS_URL: &str = "https://api.openrouteservice.org";

/// GeoJSON feature collection returned by `/geocode/search`.
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Point,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Point {
    /// `[longitude, latitude]`.
    coordinates: [f64; 2],
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    name: Option<String>,
    label: Option<String>,
}

impl Feature {
    fn into_place(self) -> Option<Place> {
        let [longitude, latitude] = self.geometry.coordinates;
        let coordinate = Coordinate::new(latitude, longitude).ok()?;
        let Properties { name, label } = self.properties;
        let formatted_address = label.clone().or_else(|| name.clone())?;
        Some(Place {
            name: name.unwrap_or_else(|| formatted_address.clone()),
            formatted_address,
            coordinate,
        })
    }
}

/// Configuration for [`PeliasGeocodingProvider`].
#[derive(Debug, Clone)]
pub struct PeliasGeocodingProviderConfig {
    /// API root; `/geocode/search` is appended.
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl PeliasGeocodingProviderConfig {
    /// Create a configuration for the default endpoint with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_PELIAS_URL.to_owned(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Point at another Pelias deployment.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
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

/// Primary geocoder querying a Pelias endpoint.
pub struct PeliasGeocodingProvider {
    client: Client,
    base_url: Url,
    config: PeliasGeocodingProviderConfig,
}

impl std::fmt::Debug for PeliasGeocodingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeliasGeocodingProvider")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.config.timeout)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl PeliasGeocodingProvider {
    /// Create a provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is blank, the base URL is invalid or
    /// the HTTP client fails to build.
    pub fn with_config(config: PeliasGeocodingProviderConfig) -> Result<Self, ProviderBuildError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderBuildError::MissingApiKey { provider: "pelias" });
        }
        let base_url = parse_base_url(&config.base_url)?;
        let client = build_client(&config.user_agent, config.timeout)?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn build_search_url(&self, query: &GeocodeQuery) -> Url {
        let mut url = endpoint(&self.base_url, "geocode/search");
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("api_key", self.config.api_key.trim())
                .append_pair("text", &query.text)
                .append_pair("size", &query.limit.max(1).to_string());
            if let Some(country) = &query.country_filter {
                pairs.append_pair("boundary.country", &country.to_ascii_uppercase());
            }
        }
        url
    }

    fn convert_response(collection: FeatureCollection) -> Vec<Place> {
        collection
            .features
            .into_iter()
            .filter_map(Feature::into_place)
            .collect()
    }
}

#[async_trait]
impl GeocodingProvider for PeliasGeocodingProvider {
    fn name(&self) -> &str {
        "pelias"
    }

    async fn search(&self, query: &GeocodeQuery) -> Result<Vec<Place>, ProviderError> {
        let url = self.build_search_url(query);
        let collection: FeatureCollection =
            get_json(&self.client, url, self.config.timeout).await?;
        let places = Self::convert_response(collection);
        debug!("pelias returned {} places for {:?}", places.len(), query.text);
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn provider() -> PeliasGeocodingProvider {
        PeliasGeocodingProvider::with_config(
            PeliasGeocodingProviderConfig::new("secret").with_base_url("https://ors.example"),
        )
        .expect("provider should build")
    }

    #[rstest]
    fn build_search_url_carries_key_and_country(provider: PeliasGeocodingProvider) {
        let query = GeocodeQuery::new("MG Road", 5).with_country(Some("in".to_owned()));

        let url = provider.build_search_url(&query);

        assert_eq!(
            url.as_str(),
            "https://ors.example/geocode/search?api_key=secret&text=MG+Road&size=5&boundary.country=IN"
        );
    }

    #[rstest]
    fn blank_api_key_is_rejected() {
        let err = PeliasGeocodingProvider::with_config(PeliasGeocodingProviderConfig::new("  "))
            .expect_err("should fail");
        assert!(matches!(err, ProviderBuildError::MissingApiKey { .. }));
    }

    #[rstest]
    fn debug_output_hides_api_key(provider: PeliasGeocodingProvider) {
        assert!(!format!("{provider:?}").contains("secret"));
    }

    #[rstest]
    fn converts_features() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"geometry": {"type": "Point", "coordinates": [73.8567, 18.5204]},
                 "properties": {"name": "MG Road", "label": "MG Road, Pune, MH, India"}},
                {"geometry": {"type": "Point", "coordinates": [73.87, 18.53]},
                 "properties": {"label": "Koregaon Park, Pune"}},
                {"geometry": {"type": "Point", "coordinates": [200.0, 18.53]},
                 "properties": {"label": "Nowhere"}}
            ]
        }"#;
        let collection: FeatureCollection = serde_json::from_str(json).expect("should deserialise");

        let places = PeliasGeocodingProvider::convert_response(collection);

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "MG Road");
        assert_eq!(places[0].formatted_address, "MG Road, Pune, MH, India");
        assert_eq!(places[1].name, "Koregaon Park, Pune");
    }
}
