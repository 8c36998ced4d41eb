//! Error types emitted by the Tripfare CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

#[cfg(feature = "store-sqlite")]
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use thiserror::Error;
use tripfare_core::{ResolveError, RideTypeParseError};
use tripfare_data::ProviderBuildError;

/// Errors emitted by the Tripfare CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name without dashes.
        field: &'static str,
        /// Environment variable that can supply the value.
        env: &'static str,
    },
    /// Neither a trip rate nor a default rate was configured.
    #[error("no rate configured (set --price-per-km or --default-price-per-km)")]
    MissingPricing,
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        /// Cargo feature name.
        feature: &'static str,
        /// What the user asked for.
        action: &'static str,
    },
    /// The ride type is not one of `oneway`, `roundtrip` or `airport`.
    #[error(transparent)]
    InvalidRideType(#[from] RideTypeParseError),
    /// A date option is not a `YYYY-MM-DD` calendar date.
    #[error("{field} {value:?} is not a YYYY-MM-DD date: {source}")]
    InvalidDate {
        /// Long flag name without dashes.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Parser detail.
        #[source]
        source: chrono::ParseError,
    },
    /// The return date precedes the pickup date.
    #[error("return date {return_date} is before pickup date {pickup}")]
    ReturnBeforePickup {
        /// Pickup date.
        pickup: NaiveDate,
        /// Return date.
        return_date: NaiveDate,
    },
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Constructing an HTTP adapter failed.
    #[error("failed to build {provider} provider for {base_url:?}: {source}")]
    BuildProvider {
        /// Provider name.
        provider: &'static str,
        /// Configured base URL.
        base_url: String,
        /// Construction failure.
        #[source]
        source: ProviderBuildError,
    },
    /// Opening the persisted cache failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open cache database {path:?}: {source}")]
    OpenCache {
        /// Database path.
        path: Utf8PathBuf,
        /// Store failure.
        #[source]
        source: tripfare_core::SqliteTierError,
    },
    /// An endpoint could not be located.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Serializing the command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing the command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
