//! CLI command modules
//!
//! Each subcommand has its own module with argument definitions.

pub mod check;
pub mod config;
pub mod prune;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "registry-pruner")]
#[command(
    version,
    about = "Prune stale RPC/REST endpoints from a chain registry"
)]
#[command(after_help = r#"EXAMPLES:
    # Remove endpoints with no success in 10 days that fail a live probe
    registry-pruner prune --root ./chain-registry

    # See what would be removed, with a 30 day window
    registry-pruner prune --root ./chain-registry --freshness-days 30 --dry-run

    # Only look at two chains
    registry-pruner prune --root ./chain-registry --chain osmosis --chain juno

    # Health report for selected providers
    registry-pruner check --root ./chain-registry --provider Polkachu -o health.json

CONFIG FILE:
    Default: ~/.config/registry-pruner/config.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the per-user config)
    #[arg(long, global = true, env = "REGISTRY_PRUNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove stale endpoints that fail a live probe
    Prune(prune::PruneArgs),

    /// Health-check every endpoint and write a JSON report
    Check(check::CheckArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}

/// Registry selection shared by commands
#[derive(Args, Clone, Debug)]
pub struct RegistryArgs {
    /// Registry root (one folder per chain)
    #[arg(long, env = "REGISTRY_ROOT")]
    pub root: Option<PathBuf>,

    /// Only process this chain (can be repeated)
    #[arg(long = "chain", action = clap::ArgAction::Append)]
    pub chains: Vec<String>,

    /// Skip this chain (can be repeated)
    #[arg(long = "skip-chain", action = clap::ArgAction::Append)]
    pub skip_chains: Vec<String>,

    /// Only consider endpoints from this provider (can be repeated)
    #[arg(long = "provider", action = clap::ArgAction::Append)]
    pub providers: Vec<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of concurrent workers
    #[arg(short = 'n', long)]
    pub workers: Option<usize>,
}
