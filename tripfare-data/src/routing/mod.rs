//! Routing adapters.
//!
//! [`OsrmRoutingProvider`] requests the preferred driving route between two
//! coordinates from an OSRM server and maps it onto
//! [`tripfare_core::RawRoute`]. Service-level failures (`NoRoute`, an empty
//! route list) surface as [`tripfare_core::ProviderError`] so the resolver
//! can fall back to an estimate.

mod osrm;
mod provider;

pub use provider::{OsrmRoutingProvider, OsrmRoutingProviderConfig};
