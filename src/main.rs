// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, build an API client and hand the
//   chosen command to the UI layer.
// - The UI layer reports on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

use secret_post_cli::{
    api::ApiClient,
    config::{Cli, Config},
    ui,
};

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secret_post=warn,secret_post_cli=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli).context("Invalid configuration")?;
    info!(url = %config.base_url, timeout = ?config.timeout, "using message store");

    let api = ApiClient::from_config(&config).context("Failed to build HTTP client")?;

    let mut stdout = std::io::stdout().lock();
    let outcome = ui::run(&api, &config, cli.command(), &mut stdout)?;
    Ok(outcome.exit_code())
}
