//! Runtime configuration for a reconciliation pass

mod file;
mod filter;

pub use file::{ConfigFile, FilterSettings, Settings};
pub use filter::{ChainFilter, DEFAULT_IGNORED_FOLDERS};

use crate::error::{ConfigError, Result};
use crate::status::DEFAULT_STATUS_URL;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECS_PER_DAY: u64 = 60 * 60 * 24;

/// Window of `days` days, saturating instead of wrapping
fn days(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(SECS_PER_DAY))
}

/// Default freshness window, in days
pub const DEFAULT_FRESHNESS_DAYS: u64 = 10;

/// Default per-request timeout, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of read attempts before a record update is abandoned
pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

/// Bounded retry with uniformly jittered backoff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Lower bound of the backoff between attempts
    pub min_backoff: Duration,
    /// Upper bound of the backoff between attempts
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_backoff: Duration, max_backoff: Duration) -> Self {
        let (min_backoff, max_backoff) = if min_backoff <= max_backoff {
            (min_backoff, max_backoff)
        } else {
            (max_backoff, min_backoff)
        };

        Self {
            max_attempts: max_attempts.max(1),
            min_backoff,
            max_backoff,
        }
    }

    /// Pick a random delay within the backoff bounds
    pub fn backoff(&self) -> Duration {
        if self.min_backoff == self.max_backoff {
            return self.min_backoff;
        }
        rand::thread_rng().gen_range(self.min_backoff..=self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
    }
}

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing one folder per chain
    pub registry_root: PathBuf,
    /// Base URL of the remote status source
    pub status_url: String,
    /// Maximum age of a recorded success before an endpoint is probed
    pub freshness_window: Duration,
    /// Timeout for status fetches and probes
    pub timeout: Duration,
    /// Number of concurrent workers
    pub workers: usize,
    /// Capacity of the work queue
    pub queue_depth: usize,
    /// Retry policy for record reads
    pub retry: RetryPolicy,
    /// Which chains and providers to consider
    pub filter: ChainFilter,
    /// Report removals without touching the registry
    pub dry_run: bool,
    /// Optional bound on the whole pass
    pub deadline: Option<Duration>,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Freshness window in milliseconds
    pub fn freshness_window_ms(&self) -> i64 {
        i64::try_from(self.freshness_window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Default worker count: twice the available parallelism, since the work is
/// dominated by waiting on the network.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(4)
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    registry_root: Option<PathBuf>,
    status_url: Option<String>,
    freshness_window: Option<Duration>,
    timeout: Option<Duration>,
    workers: Option<usize>,
    queue_depth: Option<usize>,
    retry: Option<RetryPolicy>,
    filter: Option<ChainFilter>,
    dry_run: bool,
    deadline: Option<Duration>,
}

impl ConfigBuilder {
    /// Set the registry root directory
    pub fn registry_root(mut self, root: impl AsRef<Path>) -> Self {
        self.registry_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Set the status source base URL
    pub fn status_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = Some(url.into());
        self
    }

    /// Set the freshness window
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = Some(window);
        self
    }

    /// Set the freshness window in days
    pub fn freshness_days(self, n: u64) -> Self {
        self.freshness_window(days(n))
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the number of workers
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    /// Set the work queue capacity
    pub fn queue_depth(mut self, n: usize) -> Self {
        self.queue_depth = Some(n);
        self
    }

    /// Set the record retry policy
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the chain filter
    pub fn filter(mut self, filter: ChainFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set a deadline for the whole pass
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<Config> {
        let registry_root = self.registry_root.unwrap_or_else(|| PathBuf::from("."));
        if !registry_root.is_dir() {
            return Err(ConfigError::RegistryNotFound(registry_root).into());
        }

        let workers = self.workers.unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        let status_url = self
            .status_url
            .unwrap_or_else(|| DEFAULT_STATUS_URL.to_string());
        if !status_url.starts_with("http://") && !status_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "status_url".to_string(),
                reason: format!("{} is not an http(s) URL", status_url),
            }
            .into());
        }

        Ok(Config {
            registry_root,
            status_url,
            freshness_window: self
                .freshness_window
                .unwrap_or_else(|| days(DEFAULT_FRESHNESS_DAYS)),
            timeout,
            workers,
            queue_depth: self.queue_depth.unwrap_or(workers * 2).max(1),
            retry: self.retry.unwrap_or_default(),
            filter: self.filter.unwrap_or_default(),
            dry_run: self.dry_run,
            deadline: self.deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder().registry_root(dir.path()).build().unwrap();

        assert_eq!(config.status_url, DEFAULT_STATUS_URL);
        assert_eq!(config.freshness_window, Duration::from_secs(10 * 86_400));
        assert_eq!(config.freshness_window_ms(), 864_000_000);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 25);
        assert_eq!(config.queue_depth, config.workers * 2);
        assert!(!config.dry_run);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Config::builder()
            .registry_root(dir.path().join("missing"))
            .build()
            .is_err());
        assert!(Config::builder()
            .registry_root(dir.path())
            .workers(0)
            .build()
            .is_err());
        assert!(Config::builder()
            .registry_root(dir.path())
            .status_url("status.example")
            .build()
            .is_err());
    }

    #[test]
    fn test_freshness_days() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .registry_root(dir.path())
            .freshness_days(30)
            .build()
            .unwrap();
        assert_eq!(config.freshness_window, Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn test_huge_freshness_days_never_shrink_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let requested = u32::MAX as u64 + 2;
        let config = Config::builder()
            .registry_root(dir.path())
            .freshness_days(requested)
            .build()
            .unwrap();
        assert_eq!(config.freshness_window.as_secs() / 86_400, requested);

        let config = Config::builder()
            .registry_root(dir.path())
            .freshness_days(u64::MAX)
            .build()
            .unwrap();
        assert_eq!(config.freshness_window, Duration::from_secs(u64::MAX));
        assert_eq!(config.freshness_window_ms(), i64::MAX);
    }

    #[test]
    fn test_retry_backoff_bounds() {
        let policy = RetryPolicy::new(0, Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.min_backoff, Duration::from_millis(10));

        for _ in 0..100 {
            let delay = policy.backoff();
            assert!(delay >= Duration::from_millis(10));
            assert!(delay <= Duration::from_millis(50));
        }

        let fixed = RetryPolicy::new(3, Duration::ZERO, Duration::ZERO);
        assert_eq!(fixed.backoff(), Duration::ZERO);
    }
}
