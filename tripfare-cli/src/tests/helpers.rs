//! Stub engine and argument builders shared by the CLI tests.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use tripfare_core::test_support::{StubGeocodingProvider, StubResponse, StubRoutingProvider, place};
use tripfare_core::{Geocoder, GeocoderConfig, ProviderError};

use super::*;
use crate::engine::{Caches, Engine, EngineBuilder, ProviderSettings, assemble};

/// Engine builder wiring stub providers behind in-memory caches.
pub(super) struct StubEngineBuilder {
    pub(super) secondary: Arc<StubGeocodingProvider>,
    pub(super) router: Arc<StubRoutingProvider>,
    pub(super) seen: RefCell<Option<ProviderSettings>>,
}

impl StubEngineBuilder {
    pub(super) fn new(secondary: StubGeocodingProvider, router: StubRoutingProvider) -> Self {
        Self {
            secondary: Arc::new(secondary),
            router: Arc::new(router),
            seen: RefCell::new(None),
        }
    }

    /// Geocoder knowing MG Road and Pune airport, router answering 12.3 km.
    pub(super) fn pune() -> Self {
        Self::new(pune_geocoder(), StubRoutingProvider::with_metrics(12_345.0, 3_725.0))
    }

    pub(super) fn seen_settings(&self) -> ProviderSettings {
        self.seen
            .borrow()
            .clone()
            .expect("engine should have been built")
    }
}

impl EngineBuilder for StubEngineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<Engine, CliError> {
        *self.seen.borrow_mut() = Some(settings.clone());
        let config = GeocoderConfig::default().with_secondary_min_interval(Duration::ZERO);
        let geocoder = Geocoder::new(self.secondary.clone(), config);
        Ok(assemble(geocoder, self.router.clone(), Caches::in_memory()))
    }
}

/// Secondary geocoder answering two Pune addresses and nothing else.
pub(super) fn pune_geocoder() -> StubGeocodingProvider {
    StubGeocodingProvider::with_error("stub-secondary", ProviderError::NoResults)
        .with_answer(
            "MG Road, Pune",
            StubResponse::Success(vec![place("MG Road", "MG Road, Camp, Pune", 18.5204, 73.8567)]),
        )
        .with_answer(
            "Pune Airport",
            StubResponse::Success(vec![place(
                "Pune Airport",
                "Pune International Airport, Lohegaon, Pune",
                18.5822,
                73.9197,
            )]),
        )
        .with_answer(
            "MG Ro",
            StubResponse::Success(vec![
                place("MG Road", "MG Road, Camp, Pune", 18.5204, 73.8567),
                place("Unnamed Road", "Unnamed Road, Pune", 18.53, 73.86),
                place("MG Road Metro", "MG Road Metro, Pune", 18.53, 73.87),
            ]),
        )
}

/// Quote arguments for an address-to-address trip at 10 per km.
pub(super) fn quote_args() -> QuoteArgs {
    QuoteArgs {
        from: Some("MG Road, Pune".to_owned()),
        to: Some("Pune Airport".to_owned()),
        price_per_km: Some(10.0),
        ..QuoteArgs::default()
    }
}

/// Decode the JSON document a command wrote.
pub(super) fn output_json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).expect("command output should be JSON")
}
