//! Check command - endpoint health report

use super::RegistryArgs;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
