//! Wiring of providers and caches into a geocoder and route resolver.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use tripfare_core::{Geocoder, GeocoderConfig, LayeredCache, ResolverConfig, RouteResolver};
use tripfare_data::geocoding::{DEFAULT_NOMINATIM_URL, DEFAULT_PELIAS_URL};
use tripfare_data::{
    NominatimGeocodingProvider, NominatimGeocodingProviderConfig, OsrmRoutingProvider,
    OsrmRoutingProviderConfig, PeliasGeocodingProvider, PeliasGeocodingProviderConfig,
};

use crate::CliError;

/// Provider endpoints and cache location shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProviderSettings {
    /// Base URL of the OSRM server.
    pub(crate) osrm_base_url: String,
    /// Base URL of the Nominatim instance.
    pub(crate) nominatim_base_url: String,
    /// Base URL of the Pelias deployment.
    pub(crate) pelias_base_url: String,
    /// Pelias API key; without one geocoding uses Nominatim only.
    pub(crate) pelias_api_key: Option<String>,
    /// SQLite file backing the persisted cache tier.
    pub(crate) cache_db: Option<Utf8PathBuf>,
}

impl ProviderSettings {
    pub(crate) fn from_options(
        osrm_base_url: Option<String>,
        nominatim_base_url: Option<String>,
        pelias_base_url: Option<String>,
        pelias_api_key: Option<String>,
        cache_db: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            osrm_base_url: osrm_base_url
                .unwrap_or_else(|| OsrmRoutingProviderConfig::default().base_url),
            nominatim_base_url: nominatim_base_url
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_owned()),
            pelias_base_url: pelias_base_url.unwrap_or_else(|| DEFAULT_PELIAS_URL.to_owned()),
            pelias_api_key: pelias_api_key.filter(|key| !key.trim().is_empty()),
            cache_db,
        }
    }
}

/// Geocoder and resolver sharing one set of caches.
#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) geocoder: Arc<Geocoder>,
    pub(crate) resolver: RouteResolver,
}

/// Builds the engine for the current invocation.
pub(crate) trait EngineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<Engine, CliError>;
}

/// Builds an engine talking to the configured HTTP services.
pub(crate) struct HttpEngineBuilder;

impl EngineBuilder for HttpEngineBuilder {
    fn build(&self, settings: &ProviderSettings) -> Result<Engine, CliError> {
        let secondary = NominatimGeocodingProvider::with_config(
            NominatimGeocodingProviderConfig::new(settings.nominatim_base_url.clone()),
        )
        .map_err(|source| CliError::BuildProvider {
            provider: "nominatim",
            base_url: settings.nominatim_base_url.clone(),
            source,
        })?;
        let mut geocoder = Geocoder::new(Arc::new(secondary), GeocoderConfig::default());
        if let Some(api_key) = &settings.pelias_api_key {
            let primary = PeliasGeocodingProvider::with_config(
                PeliasGeocodingProviderConfig::new(api_key.clone())
                    .with_base_url(settings.pelias_base_url.clone()),
            )
            .map_err(|source| CliError::BuildProvider {
                provider: "pelias",
                base_url: settings.pelias_base_url.clone(),
                source,
            })?;
            geocoder = geocoder.with_primary(Arc::new(primary));
        } else {
            info!("no Pelias API key configured; geocoding through Nominatim only");
        }

        let router = OsrmRoutingProvider::new(settings.osrm_base_url.clone()).map_err(|source| {
            CliError::BuildProvider {
                provider: "osrm",
                base_url: settings.osrm_base_url.clone(),
                source,
            }
        })?;

        let caches = Caches::open(settings.cache_db.as_deref())?;
        Ok(assemble(geocoder, Arc::new(router), caches))
    }
}

/// Attach `caches` and pair the geocoder with a resolver over `router`.
pub(crate) fn assemble(
    geocoder: Geocoder,
    router: Arc<dyn tripfare_core::RoutingProvider>,
    caches: Caches,
) -> Engine {
    let geocoder = Arc::new(geocoder.with_caches(caches.results, caches.suggestions));
    let resolver = RouteResolver::new(Arc::clone(&geocoder), router, ResolverConfig::default())
        .with_cache(caches.routes);
    Engine { geocoder, resolver }
}

/// The three layered caches used by one engine.
#[derive(Debug)]
pub(crate) struct Caches {
    pub(crate) results: LayeredCache<tripfare_core::GeocodeResult>,
    pub(crate) suggestions: LayeredCache<Vec<tripfare_core::Place>>,
    pub(crate) routes: LayeredCache<tripfare_core::RouteMetrics>,
}

impl Caches {
    /// Process-memory caches without expiry.
    pub(crate) fn in_memory() -> Self {
        Self {
            results: LayeredCache::in_memory("geocode"),
            suggestions: LayeredCache::in_memory("suggest"),
            routes: LayeredCache::in_memory("route"),
        }
    }

    /// Memory caches over a session store: the SQLite file at `cache_db`, or
    /// an in-memory database when no file is given.
    #[cfg(feature = "store-sqlite")]
    pub(crate) fn open(cache_db: Option<&Utf8Path>) -> Result<Self, CliError> {
        use tripfare_core::SqliteTier;
        use tripfare_core::address::GEOCODE_NAMESPACE;

        let store = match cache_db {
            Some(path) => {
                let store = SqliteTier::open(path.as_std_path(), GEOCODE_NAMESPACE).map_err(
                    |source| CliError::OpenCache {
                        path: path.to_path_buf(),
                        source,
                    },
                )?;
                info!("persisting cache entries to {path}");
                store
            }
            None => SqliteTier::in_memory(GEOCODE_NAMESPACE).map_err(|source| {
                CliError::OpenCache {
                    path: Utf8PathBuf::from(":memory:"),
                    source,
                }
            })?,
        };
        Ok(Self::in_memory().with_store(store))
    }

    /// Memory caches; a cache file needs the `store-sqlite` feature.
    #[cfg(not(feature = "store-sqlite"))]
    pub(crate) fn open(cache_db: Option<&Utf8Path>) -> Result<Self, CliError> {
        match cache_db {
            Some(_) => Err(CliError::MissingFeature {
                feature: "store-sqlite",
                action: "--cache-db",
            }),
            None => Ok(Self::in_memory()),
        }
    }

    /// Append `store` as the second tier, one namespace per cache.
    #[cfg(feature = "store-sqlite")]
    fn with_store(self, store: tripfare_core::SqliteTier<tripfare_core::GeocodeResult>) -> Self {
        use tripfare_core::SqliteTier;
        use tripfare_core::address::{ROUTE_NAMESPACE, SUGGEST_NAMESPACE};
        use tripfare_core::cache::{GEOCODE_TTL, ROUTE_TTL};

        let suggestions: SqliteTier<Vec<tripfare_core::Place>> =
            store.for_namespace(SUGGEST_NAMESPACE);
        let routes: SqliteTier<tripfare_core::RouteMetrics> = store.for_namespace(ROUTE_NAMESPACE);
        Self {
            results: self.results.with_tier(Arc::new(store), Some(GEOCODE_TTL)),
            suggestions: self
                .suggestions
                .with_tier(Arc::new(suggestions), Some(GEOCODE_TTL)),
            routes: self.routes.with_tier(Arc::new(routes), Some(ROUTE_TTL)),
        }
    }
}
