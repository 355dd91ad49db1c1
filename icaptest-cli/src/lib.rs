//! Icaptest CLI library.
//!
//! This library exposes internal modules (orchestrator, assertion
//! engine, output) for integration testing. In production,
//! `icaptest-cli` is used as a binary (main.rs).

pub mod assert;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod report;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

use icaptest_core::config::{GeneralConfig, HarnessConfig};

/// Parse-free entry point: dispatch an already-parsed CLI invocation.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        config: config_path,
        log_level,
        output,
        command,
    } = cli;
    let writer = OutputWriter::new(output);

    match command {
        Commands::Config(args) => {
            // Config tooling must stay usable when the config itself is
            // broken, so it runs on default logging settings.
            let mut general = GeneralConfig::default();
            if let Some(level) = &log_level {
                general.log_level = level.clone();
            }
            logging::init_tracing(&general)?;
            commands::config::execute(args, &config_path, &writer).await
        }
        Commands::Run(args) => {
            let config = load_config(&config_path, log_level.as_deref()).await?;
            logging::init_tracing(&config.general)?;
            commands::run::execute(args, &config, &writer, output).await
        }
        Commands::Probe(args) => {
            let config = load_config(&config_path, log_level.as_deref()).await?;
            logging::init_tracing(&config.general)?;
            commands::probe::execute(args, &config, &writer).await
        }
    }
}

async fn load_config(
    path: &std::path::Path,
    log_level: Option<&str>,
) -> Result<HarnessConfig, CliError> {
    let mut config = HarnessConfig::load(path).await?;
    if let Some(level) = log_level {
        config.general.log_level = level.to_owned();
    }
    Ok(config)
}
