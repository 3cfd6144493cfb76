//! CLI module graph and command dispatch.

pub mod command;
pub mod deliveries;
pub mod delivery;
mod list;
pub mod orders;
pub mod output;
pub mod track;

use command::{Cli, ColorChoice, Commands};
use output::OutputConfig;

use crate::error::Result;
use crate::infrastructure::bootstrap::Trackly;
use crate::infrastructure::config::Config;

/// Output settings for the global flags of `cli`.
#[must_use]
pub fn output_config(cli: &Cli) -> OutputConfig {
    let color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => output::detect_color(),
    };
    OutputConfig::new(cli.json, cli.quiet, cli.verbose).with_color(color)
}

/// Log level implied by `-v` flags, if any.
#[must_use]
pub const fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Build the client from `config` and run the selected command.
///
/// # Errors
///
/// Returns the first failure of the command, which the binary reports.
pub async fn execute(cli: &Cli, config: &Config) -> Result<()> {
    let trackly = Trackly::build(config)?;
    match &cli.command {
        Commands::Orders(args) => orders::execute(&trackly, args).await,
        Commands::Deliveries(args) => deliveries::execute(&trackly, args).await,
        Commands::Track(args) => track::execute(&trackly, args).await,
        Commands::Delivery(args) => delivery::execute(&trackly, args).await,
    }
}
