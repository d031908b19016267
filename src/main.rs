//! Agentpack - Tiered chatbot package loader
//!
//! CLI entry point that dispatches to subcommands.

use agentpack::cli::{Cli, Commands};
use agentpack::config::{Config, ConfigManager};
use agentpack::error::PackResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PackResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Resolve(args) => agentpack::cli::commands::resolve(args, &config).await,
        Commands::Preload(args) => agentpack::cli::commands::preload(args, &config).await,
        Commands::Invalidate(args) => agentpack::cli::commands::invalidate(args, &config).await,
        Commands::Cache(args) => agentpack::cli::commands::cache(args, &config).await,
        Commands::Builtins(args) => agentpack::cli::commands::builtins(args).await,
        Commands::Config(args) => {
            agentpack::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` takes precedence
fn init_logging(verbose: u8, config: &Config) {
    let default_directive = match verbose {
        0 => "agentpack=warn",
        1 => "agentpack=info",
        _ => "agentpack=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
