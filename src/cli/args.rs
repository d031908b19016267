//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Agentpack - Tiered chatbot package loader
///
/// Resolves agent packages through memory, disk and remote tiers and
/// manages the local package cache.
#[derive(Parser, Debug)]
#[command(name = "agentpack")]
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
    #[arg(short, long, global = true, env = "AGENTPACK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a package and print its metadata
    Resolve(ResolveArgs),

    /// Load several packages concurrently
    Preload(PreloadArgs),

    /// Remove a package from the memory and disk caches
    Invalidate(InvalidateArgs),

    /// Inspect and maintain the disk cache
    Cache(CacheArgs),

    /// List built-in packages
    Builtins(BuiltinsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Package id
    pub id: String,

    /// Print metadata as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print loader statistics
    #[arg(long)]
    pub stats: bool,
}

/// Arguments for the preload command
#[derive(Parser, Debug)]
pub struct PreloadArgs {
    /// Package ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Arguments for the invalidate command
#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    /// Package id
    pub id: String,
}

/// Arguments for the builtins command
#[derive(Parser, Debug)]
pub struct BuiltinsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
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

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached bundles, oldest first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show cache location, usage and limits
    Info,

    /// Remove expired bundles and enforce the size limit
    Cleanup,

    /// Remove every cached bundle
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
