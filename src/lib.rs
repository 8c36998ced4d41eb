//! Facade crate for the Tripfare distance and fare engine.
//!
//! This crate re-exports the core domain types and exposes the HTTP provider
//! adapters and the persisted cache tier behind feature flags.

#![forbid(unsafe_code)]

pub use tripfare_core::{
    CacheError, CacheTier, Coordinate, CoordinateError, Endpoint, FareQuote, FareRequest,
    GeocodeError, GeocodeQuery, GeocodeResult, Geocoder, GeocoderConfig, GeocodingProvider,
    LayeredCache, Location, MIN_KM_PER_DAY, MemoryTier, Place, PricingSettings, ProviderError,
    RateGate, RawRoute, ResolveError, ResolverConfig, RideType, RouteMetrics, RouteResolver,
    RoutingProvider, compute_fare, normalize,
};

#[cfg(feature = "store-sqlite")]
pub use tripfare_core::{SqliteTier, SqliteTierError};

#[cfg(feature = "http")]
pub use tripfare_data::{
    NominatimGeocodingProvider, NominatimGeocodingProviderConfig, OsrmRoutingProvider,
    OsrmRoutingProviderConfig, PeliasGeocodingProvider, PeliasGeocodingProviderConfig,
    ProviderBuildError,
};
