use clap::Parser;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod config;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::CliConfig::resolve(cli.config.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        config.level()?
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    commands::run_command(cli, &config)
}
