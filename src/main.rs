//! preview-cache - path-to-URL cache for live previews
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use preview_cache::cli::args::ConfigAction;
use preview_cache::cli::{commands, Cli, Commands};
use preview_cache::config::ConfigManager;
use preview_cache::error::PreviewResult;
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

async fn run() -> PreviewResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    match cli.command {
        // `config path` and `config init` must work even when the file is broken
        Commands::Config(args) if !matches!(args.action, None | Some(ConfigAction::Show)) => {
            init_logging(cli.verbose, "text");
            commands::config(args, &manager).await
        }
        command => {
            let config = manager.load().await?;
            init_logging(cli.verbose, &config.general.log_format);

            match command {
                Commands::Scan(args) => commands::scan(args, &config).await,
                Commands::Status(args) => commands::status(args, &config).await,
                Commands::Config(args) => commands::config(args, &manager).await,
            }
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug. Logs go to stderr so JSON output stays clean.
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("preview_cache=warn"),
        1 => EnvFilter::new("preview_cache=info"),
        _ => EnvFilter::new("preview_cache=debug"),
    };

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
