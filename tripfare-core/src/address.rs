//! Address canonicalisation for cache-key stability.
//!
//! Two addresses that differ only in case or surrounding whitespace must map
//! to the same key. Keys are namespaced per lookup kind so geocode results,
//! suggestion lists and route metrics never collide in a shared store.

use crate::{Coordinate, Location};

/// Namespace for single-result geocode entries.
pub const GEOCODE_NAMESPACE: &str = "geocode";
/// Namespace for suggestion lists.
pub const SUGGEST_NAMESPACE: &str = "suggest";
/// Namespace for route metrics.
pub const ROUTE_NAMESPACE: &str = "route";

/// Canonicalise a free-text address.
///
/// Trims and lower-cases. Interior whitespace runs also collapse to a single
/// space, so `"MG  Road"` and `"MG Road"` share a key; this goes beyond
/// trimming on purpose and only ever merges keys, never splits them.
/// Whitespace-only input yields an empty string, which lookups reject as
/// invalid.
///
/// # Examples
///
/// ```
/// use tripfare_core::normalize;
///
/// assert_eq!(normalize("  MG Road, Pune  "), normalize("mg road, pune"));
/// assert_eq!(normalize("MG  Road"), normalize("MG Road"));
/// assert_eq!(normalize("   "), "");
/// ```
#[must_use]
pub fn normalize(address: &str) -> String {
    address
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cache key for one trip endpoint.
#[must_use]
pub fn location_key(location: &Location) -> String {
    match location {
        Location::Address(text) => format!("a:{}", normalize(text)),
        Location::Coordinate(coordinate) => format!("c:{}", coordinate.cache_key()),
    }
}

/// Cache key for a directed pair of endpoints.
#[must_use]
pub fn route_key(from: &Location, to: &Location) -> String {
    format!("{}|{}", location_key(from), location_key(to))
}

/// Cache key for a directed pair of resolved coordinates.
#[must_use]
pub fn coordinate_pair_key(from: Coordinate, to: Coordinate) -> String {
    route_key(&Location::Coordinate(from), &Location::Coordinate(to))
}
