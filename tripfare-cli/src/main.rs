//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use env_logger::{Builder, Env};
use log::error;
use tripfare_cli::CliError;

fn main() {
    init_logging();
    match tripfare_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}

/// Log at `info` unless `RUST_LOG` says otherwise.
fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_module_path(false)
        .init();
}
