//! OSRM API response types for the Route service.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use serde::Deserialize;

/// OSRM Route API response.
///
/// The `code` field indicates the response status; `routes` is present on
/// success and ordered best-first.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"NoRoute"` - No route between the coordinates
    /// - `"InvalidQuery"` - Invalid query parameters
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Candidate routes, best first.
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl RouteResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// One route from an OSRM response.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// Route length in metres.
    pub distance: f64,
    /// Travel time in seconds.
    pub duration: f64,
    /// Route geometry, present when requested with `geometries=geojson`.
    pub geometry: Option<LineString>,
}

/// A GeoJSON `LineString` geometry.
#[derive(Debug, Deserialize)]
pub struct LineString {
    /// Positions as `[longitude, latitude]` pairs.
    pub coordinates: Vec<[f64; 2]>,
}
