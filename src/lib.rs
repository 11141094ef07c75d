//! registry-pruner - Stale endpoint pruning for a chain registry
//!
//! Cross-checks every RPC/REST endpoint listed in a registry of per-chain
//! `chain.json` records against a remote status history, probes endpoints
//! whose history is stale, and removes the ones that are confirmed dead.
//!
//! # Example
//!
//! ```rust,no_run
//! use registry_pruner::{Config, Reconciler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder()
//!         .registry_root("./chain-registry")
//!         .freshness_days(10)
//!         .workers(16)
//!         .build()?;
//!
//!     let report = Reconciler::new(config)?.run().await?;
//!
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod pool;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod status;

// Re-exports for convenience
pub use config::{
    default_workers, ChainFilter, Config, ConfigBuilder, ConfigFile, FilterSettings, RetryPolicy,
    Settings,
};
pub use error::{
    ConfigError, Error, OutputError, PoolError, ProbeError, RecordError, Result, StatusError,
};
pub use health::{EndpointCheck, HealthChecker, HealthReport, HealthSummary, Tally};
pub use pool::{Deadline, WorkerPool};
pub use probe::{CheckResult, HealthStatus, ProbeOutcome, Prober};
pub use reconcile::{
    now_ms, PassProgress, PassReport, Phase, Reconciler, Removal, Staleness, StalenessDecision,
    WorkOutcome, WorkUnit,
};
pub use registry::{ApiKind, ChainRecord, Endpoint, RegistryStore};
pub use status::{ChainStatus, EndpointStatus, StatusClient, DEFAULT_STATUS_URL};
