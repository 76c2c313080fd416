use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use style_advisor::cli::{dispatch, Cli};
use style_advisor::config_loader::load_config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    dispatch(cli, config)
}
