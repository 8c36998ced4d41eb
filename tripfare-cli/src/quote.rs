//! Quote command implementation for the Tripfare CLI.

use std::convert::Infallible;
use std::io::Write;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tripfare_core::{
    FareQuote, FareRequest, Location, PricingSettings, RideType, RouteMetrics, compute_fare,
};

use crate::engine::{Engine, EngineBuilder, HttpEngineBuilder, ProviderSettings};
use crate::{
    ARG_CACHE_DB, ARG_DEFAULT_PRICE_PER_KM, ARG_FROM, ARG_MIN_KM_AIRPORT_APPLY,
    ARG_MIN_KM_ONEWAY_APPLY, ARG_MIN_KM_ROUNDTRIP_APPLY, ARG_MIN_KM_THRESHOLD,
    ARG_NOMINATIM_BASE_URL, ARG_OSRM_BASE_URL, ARG_PELIAS_API_KEY, ARG_PELIAS_BASE_URL,
    ARG_PICKUP_DATE, ARG_PRICE_PER_KM, ARG_RETURN_DATE, ARG_RIDE_TYPE, ARG_TO, CliError,
    ENV_QUOTE_FROM, ENV_QUOTE_TO, build_runtime, write_json,
};

/// CLI arguments for the `quote` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve the driving distance between two locations and price \
                 the trip. Locations are free-text addresses or `lat,lon` \
                 pairs. Pricing settings can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Quote a fare between two locations"
)]
#[ortho_config(prefix = "TRIPFARE")]
pub(crate) struct QuoteArgs {
    /// Pickup address or `lat,lon` pair.
    #[arg(long = ARG_FROM, value_name = "location")]
    #[serde(default)]
    pub(crate) from: Option<String>,
    /// Drop address or `lat,lon` pair.
    #[arg(long = ARG_TO, value_name = "location")]
    #[serde(default)]
    pub(crate) to: Option<String>,
    /// One of `oneway` (default), `roundtrip` or `airport`.
    #[arg(long = ARG_RIDE_TYPE, value_name = "type")]
    #[serde(default)]
    pub(crate) ride_type: Option<String>,
    /// Pickup date as `YYYY-MM-DD`.
    #[arg(long = ARG_PICKUP_DATE, value_name = "date")]
    #[serde(default)]
    pub(crate) pickup_date: Option<String>,
    /// Return date as `YYYY-MM-DD`, for round trips.
    #[arg(long = ARG_RETURN_DATE, value_name = "date")]
    #[serde(default)]
    pub(crate) return_date: Option<String>,
    /// Rate for this trip, per kilometre.
    #[arg(long = ARG_PRICE_PER_KM, value_name = "rate")]
    #[serde(default)]
    pub(crate) price_per_km: Option<f64>,
    /// Distance a trip must exceed before the minimum applies, in kilometres.
    #[arg(long = ARG_MIN_KM_THRESHOLD, value_name = "km")]
    #[serde(default)]
    pub(crate) min_km_threshold: Option<f64>,
    /// Apply the minimum to one-way trips.
    #[arg(long = ARG_MIN_KM_ONEWAY_APPLY, value_name = "bool")]
    #[serde(default)]
    pub(crate) min_km_oneway_apply: Option<bool>,
    /// Apply the minimum to round trips.
    #[arg(long = ARG_MIN_KM_ROUNDTRIP_APPLY, value_name = "bool")]
    #[serde(default)]
    pub(crate) min_km_roundtrip_apply: Option<bool>,
    /// Apply the minimum to airport transfers.
    #[arg(long = ARG_MIN_KM_AIRPORT_APPLY, value_name = "bool")]
    #[serde(default)]
    pub(crate) min_km_airport_apply: Option<bool>,
    /// Rate used when the trip carries none.
    #[arg(long = ARG_DEFAULT_PRICE_PER_KM, value_name = "rate")]
    #[serde(default)]
    pub(crate) default_price_per_km: Option<f64>,
    /// Base URL for the OSRM server (e.g. "http://localhost:5000").
    #[arg(long = ARG_OSRM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// Base URL for the Nominatim instance.
    #[arg(long = ARG_NOMINATIM_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_base_url: Option<String>,
    /// Base URL for the Pelias deployment.
    #[arg(long = ARG_PELIAS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) pelias_base_url: Option<String>,
    /// Pelias API key; enables the primary geocoder.
    #[arg(long = ARG_PELIAS_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) pelias_api_key: Option<String>,
    /// SQLite file for the persisted cache tier.
    #[arg(long = ARG_CACHE_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) cache_db: Option<Utf8PathBuf>,
}

impl QuoteArgs {
    pub(crate) fn into_config(self) -> Result<QuoteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        QuoteConfig::try_from(merged)
    }
}

/// Resolved `quote` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuoteConfig {
    pub(crate) from: Location,
    pub(crate) to: Location,
    pub(crate) ride_type: RideType,
    pub(crate) pickup_date: Option<NaiveDate>,
    pub(crate) return_date: Option<NaiveDate>,
    /// Trip rate; zero defers to the configured default.
    pub(crate) price_per_km: f64,
    pub(crate) pricing: PricingSettings,
    pub(crate) providers: ProviderSettings,
}

impl TryFrom<QuoteArgs> for QuoteConfig {
    type Error = CliError;

    fn try_from(args: QuoteArgs) -> Result<Self, Self::Error> {
        let from = required_location(args.from, ARG_FROM, ENV_QUOTE_FROM)?;
        let to = required_location(args.to, ARG_TO, ENV_QUOTE_TO)?;
        let ride_type = args
            .ride_type
            .as_deref()
            .map_or(Ok(RideType::Oneway), str::parse)?;
        let pickup_date = parse_date(args.pickup_date, ARG_PICKUP_DATE)?;
        let return_date = parse_date(args.return_date, ARG_RETURN_DATE)?;
        if let (Some(pickup), Some(return_date)) = (pickup_date, return_date)
            && return_date < pickup
        {
            return Err(CliError::ReturnBeforePickup {
                pickup,
                return_date,
            });
        }
        if args.price_per_km.is_none() && args.default_price_per_km.is_none() {
            return Err(CliError::MissingPricing);
        }

        let defaults = PricingSettings::default();
        let pricing = PricingSettings {
            min_km_threshold: args.min_km_threshold.unwrap_or(defaults.min_km_threshold),
            min_km_airport_apply: args.min_km_airport_apply.unwrap_or(false),
            min_km_oneway_apply: args.min_km_oneway_apply.unwrap_or(false),
            min_km_roundtrip_apply: args.min_km_roundtrip_apply.unwrap_or(false),
            price_per_km: args.default_price_per_km.unwrap_or(defaults.price_per_km),
        };
        let providers = ProviderSettings::from_options(
            args.osrm_base_url,
            args.nominatim_base_url,
            args.pelias_base_url,
            args.pelias_api_key,
            args.cache_db,
        );

        Ok(Self {
            from,
            to,
            ride_type,
            pickup_date,
            return_date,
            price_per_km: args.price_per_km.unwrap_or(0.0),
            pricing,
            providers,
        })
    }
}

fn required_location(
    text: Option<String>,
    field: &'static str,
    env: &'static str,
) -> Result<Location, CliError> {
    let text = text
        .filter(|text| !text.trim().is_empty())
        .ok_or(CliError::MissingArgument { field, env })?;
    Ok(text
        .trim()
        .parse()
        .unwrap_or_else(|never: Infallible| match never {}))
}

fn parse_date(value: Option<String>, field: &'static str) -> Result<Option<NaiveDate>, CliError> {
    value
        .map(|value| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|source| CliError::InvalidDate {
                    field,
                    value,
                    source,
                })
        })
        .transpose()
}

/// JSON document written by `quote`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuoteOutput {
    pub(crate) ride_type: RideType,
    pub(crate) trip_days: u32,
    pub(crate) route: RouteMetrics,
    pub(crate) fare: FareQuote,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_quote_with(args, &HttpEngineBuilder, &mut stdout)
}

pub(crate) fn run_quote_with(
    args: QuoteArgs,
    builder: &dyn EngineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let engine = builder.build(&config.providers)?;
    let output = build_runtime()?.block_on(execute_quote(&engine, &config))?;
    write_json(writer, &output)
}

pub(crate) async fn execute_quote(
    engine: &Engine,
    config: &QuoteConfig,
) -> Result<QuoteOutput, CliError> {
    let route = engine.resolver.resolve(&config.from, &config.to).await?;
    let request = FareRequest::new(config.ride_type, route.distance_km, config.price_per_km)
        .with_dates(config.pickup_date, config.return_date);
    let fare = compute_fare(&request, Some(&config.pricing));
    info!(
        "{} quote over {}: {} km billed, fare {}",
        config.ride_type, route.distance_label, fare.billable_distance_km, fare.total_fare
    );
    Ok(QuoteOutput {
        ride_type: config.ride_type,
        trip_days: request.trip_days(),
        route,
        fare,
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<QuoteConfig, CliError> {
    let merged = QuoteArgs::merge_from_layers(layers).map_err(CliError::from)?;
    QuoteConfig::try_from(merged)
}
