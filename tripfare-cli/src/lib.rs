//! Command-line interface for quoting trips with the Tripfare engine.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod engine;
mod error;
mod quote;
mod suggest;

pub use error::CliError;

use quote::{QuoteArgs, run_quote};
use suggest::{SuggestArgs, run_suggest};

const ARG_FROM: &str = "from";
const ARG_TO: &str = "to";
const ARG_RIDE_TYPE: &str = "ride-type";
const ARG_PICKUP_DATE: &str = "pickup-date";
const ARG_RETURN_DATE: &str = "return-date";
const ARG_PRICE_PER_KM: &str = "price-per-km";
const ARG_MIN_KM_THRESHOLD: &str = "min-km-threshold";
const ARG_MIN_KM_ONEWAY_APPLY: &str = "min-km-oneway-apply";
const ARG_MIN_KM_ROUNDTRIP_APPLY: &str = "min-km-roundtrip-apply";
const ARG_MIN_KM_AIRPORT_APPLY: &str = "min-km-airport-apply";
const ARG_DEFAULT_PRICE_PER_KM: &str = "default-price-per-km";
const ARG_OSRM_BASE_URL: &str = "osrm-base-url";
const ARG_NOMINATIM_BASE_URL: &str = "nominatim-base-url";
const ARG_PELIAS_BASE_URL: &str = "pelias-base-url";
const ARG_PELIAS_API_KEY: &str = "pelias-api-key";
const ARG_CACHE_DB: &str = "cache-db";
const ARG_TEXT: &str = "text";
const ENV_QUOTE_FROM: &str = "TRIPFARE_CMDS_QUOTE_FROM";
const ENV_QUOTE_TO: &str = "TRIPFARE_CMDS_QUOTE_TO";
const ENV_SUGGEST_TEXT: &str = "TRIPFARE_CMDS_SUGGEST_TEXT";

/// Run the Tripfare CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, a
/// provider cannot be built, an endpoint cannot be located, or the output
/// cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Quote(args) => run_quote(args),
        Command::Suggest(args) => run_suggest(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tripfare",
    about = "Distance and fare quotes for chauffeured trips",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a route between two locations and price it.
    Quote(QuoteArgs),
    /// List address candidates for partial input.
    Suggest(SuggestArgs),
}

/// Single-threaded runtime driving one command.
fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
