//! Suggest command implementation for the Tripfare CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tripfare_core::Place;

use crate::engine::{EngineBuilder, HttpEngineBuilder, ProviderSettings};
use crate::{
    ARG_CACHE_DB, ARG_NOMINATIM_BASE_URL, ARG_PELIAS_API_KEY, ARG_PELIAS_BASE_URL, ARG_TEXT,
    CliError, ENV_SUGGEST_TEXT, build_runtime, write_json,
};

/// CLI arguments for the `suggest` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List address candidates for partial input. Short input \
                 and provider outages yield an empty list rather than an \
                 error.",
    about = "Suggest addresses for partial input"
)]
#[ortho_config(prefix = "TRIPFARE")]
pub(crate) struct SuggestArgs {
    /// Partial address typed so far.
    #[arg(long = ARG_TEXT, value_name = "text")]
    #[serde(default)]
    pub(crate) text: Option<String>,
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

impl SuggestArgs {
    pub(crate) fn into_config(self) -> Result<SuggestConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SuggestConfig::try_from(merged)
    }
}

/// Resolved `suggest` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SuggestConfig {
    pub(crate) text: String,
    pub(crate) providers: ProviderSettings,
}

impl TryFrom<SuggestArgs> for SuggestConfig {
    type Error = CliError;

    fn try_from(args: SuggestArgs) -> Result<Self, Self::Error> {
        let text = args.text.ok_or(CliError::MissingArgument {
            field: ARG_TEXT,
            env: ENV_SUGGEST_TEXT,
        })?;
        let providers = ProviderSettings::from_options(
            None,
            args.nominatim_base_url,
            args.pelias_base_url,
            args.pelias_api_key,
            args.cache_db,
        );
        Ok(Self { text, providers })
    }
}

/// JSON document written by `suggest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SuggestOutput {
    pub(crate) text: String,
    pub(crate) suggestions: Vec<Place>,
}

pub(crate) fn run_suggest(args: SuggestArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_suggest_with(args, &HttpEngineBuilder, &mut stdout)
}

pub(crate) fn run_suggest_with(
    args: SuggestArgs,
    builder: &dyn EngineBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let engine = builder.build(&config.providers)?;
    let suggestions = build_runtime()?.block_on(engine.geocoder.suggest(&config.text));
    write_json(
        writer,
        &SuggestOutput {
            text: config.text,
            suggestions,
        },
    )
}
