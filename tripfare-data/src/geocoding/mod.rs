//! Geocoding adapters.
//!
//! [`PeliasGeocodingProvider`] is the keyed primary service and
//! [`NominatimGeocodingProvider`] the free, rate-limited secondary. Both map
//! candidates onto [`tripfare_core::Place`] and drop entries whose
//! coordinates are out of range.

mod nominatim;
mod pelias;

pub use nominatim::{
    DEFAULT_NOMINATIM_URL, NominatimGeocodingProvider, NominatimGeocodingProviderConfig,
};
pub use pelias::{DEFAULT_PELIAS_URL, PeliasGeocodingProvider, PeliasGeocodingProviderConfig};
