//! CLI argument definitions using clap derive

use crate::provider::ProviderMode;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Preview Cache - path-to-URL cache for live previews
///
/// Maps project file paths onto addresses a preview can load, backed by
/// in-process handles or a persistent store.
#[derive(Parser, Debug)]
#[command(name = "preview-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PREVIEW_CACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a directory into a fresh cache and print its addresses
    Scan(ScanArgs),

    /// Show store capabilities and the provider that would be selected
    Status(StatusArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the scan command
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Host directory holding the project files
    pub dir: PathBuf,

    /// Virtual project root (defaults to cache.project_root)
    #[arg(short, long)]
    pub root: Option<String>,

    /// Provider mode (defaults to cache.mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<ProviderMode>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Provider mode to evaluate (defaults to cache.mode)
    #[arg(short, long, value_enum)]
    pub mode: Option<ProviderMode>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Tab-separated path and address, one per line
    Plain,
}
