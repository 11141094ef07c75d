//! Prune command - one reconciliation pass

use super::RegistryArgs;
use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct PruneArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Endpoints without a success in this many days are probed
    #[arg(long)]
    pub freshness_days: Option<u64>,

    /// Read attempts before a record update is abandoned
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Status source base URL
    #[arg(long, env = "REGISTRY_STATUS_URL")]
    pub status_url: Option<String>,

    /// Abort the pass after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Report what would be removed without touching the registry
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
