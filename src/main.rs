use clap::Parser;
use tracing::{debug, error};

use trackly::adapter::inbound::cli::{self, command::Cli, output};
use trackly::infrastructure::config::Config;

#[tokio::main]
async fn main() {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(cli::output_config(&cli));

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(level) = cli::verbosity_level(cli.verbose) {
        config.logging.level = level.to_string();
    }
    config.init_logging();
    debug!(config = %cli.config.display(), "Configuration loaded");

    cli::execute(cli, &config).await?;
    Ok(())
}
