//! Registry-wide endpoint health checks
//!
//! Every selected rpc/rest endpoint is queried on its service path and the
//! results are aggregated into a [`HealthReport`].

use crate::config::ChainFilter;
use crate::error::{OutputError, Result};
use crate::probe::{HealthStatus, Prober};
use crate::registry::{ApiKind, RegistryStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Number of entries in the fastest/slowest lists
const RANKING_SIZE: usize = 10;

/// One checked endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointCheck {
    pub chain: String,
    pub kind: ApiKind,
    pub url: String,
    pub provider: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-chain or per-provider counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub healthy: usize,
    pub unhealthy: usize,
    pub failed: usize,
    pub total: usize,
}

impl Tally {
    fn add(&mut self, status: HealthStatus) {
        match status {
            HealthStatus::Healthy => self.healthy += 1,
            HealthStatus::Unhealthy => self.unhealthy += 1,
            HealthStatus::Failed => self.failed += 1,
        }
        self.total += 1;
    }

    /// Share of healthy endpoints, in percent
    pub fn health_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.healthy as f64 * 100.0 / self.total as f64
        }
    }
}

/// Headline numbers
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthSummary {
    pub total_endpoints: usize,
    pub healthy_endpoints: usize,
    pub unhealthy_endpoints: usize,
    pub failed_endpoints: usize,
    pub health_rate: f64,
    pub avg_response_time_ms: u64,
}

/// Aggregated health report
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub summary: HealthSummary,
    pub details: Vec<EndpointCheck>,
    pub by_chain: BTreeMap<String, Tally>,
    pub by_provider: BTreeMap<String, Tally>,
    pub slowest: Vec<EndpointCheck>,
    pub fastest: Vec<EndpointCheck>,
}

impl HealthReport {
    /// Aggregate individual checks
    pub fn from_checks(mut details: Vec<EndpointCheck>) -> Self {
        details.sort_by(|a, b| (&a.chain, a.kind, &a.url).cmp(&(&b.chain, b.kind, &b.url)));

        let mut overall = Tally::default();
        let mut by_chain: BTreeMap<String, Tally> = BTreeMap::new();
        let mut by_provider: BTreeMap<String, Tally> = BTreeMap::new();
        for check in &details {
            overall.add(check.status);
            by_chain.entry(check.chain.clone()).or_default().add(check.status);
            by_provider
                .entry(check.provider.clone())
                .or_default()
                .add(check.status);
        }

        let mut healthy: Vec<EndpointCheck> = details
            .iter()
            .filter(|c| c.status == HealthStatus::Healthy)
            .cloned()
            .collect();
        let avg_response_time_ms = if healthy.is_empty() {
            0
        } else {
            healthy.iter().map(|c| c.response_time_ms).sum::<u64>() / healthy.len() as u64
        };

        healthy.sort_by_key(|c| c.response_time_ms);
        let fastest: Vec<_> = healthy.iter().take(RANKING_SIZE).cloned().collect();
        let slowest: Vec<_> = healthy.iter().rev().take(RANKING_SIZE).cloned().collect();

        Self {
            summary: HealthSummary {
                total_endpoints: overall.total,
                healthy_endpoints: overall.healthy,
                unhealthy_endpoints: overall.unhealthy,
                failed_endpoints: overall.failed,
                health_rate: (overall.health_rate() * 10.0).round() / 10.0,
                avg_response_time_ms,
            },
            details,
            by_chain,
            by_provider,
            slowest,
            fastest,
        }
    }

    /// Write the report as pretty JSON to a file, or stdout
    pub fn write_json(&self, path: Option<&Path>) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');

        match path {
            Some(p) => std::fs::write(p, content).map_err(|e| {
                OutputError::FileCreate(format!("{}: {}", p.display(), e))
            })?,
            None => std::io::stdout().lock().write_all(content.as_bytes())?,
        }
        Ok(())
    }
}

/// Checks every endpoint of a registry with bounded concurrency
pub struct HealthChecker {
    prober: Prober,
    concurrency: usize,
}

impl HealthChecker {
    pub fn new(prober: Prober, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.max(1),
        }
    }

    /// Check all endpoints of the selected chains
    pub async fn check_registry(
        &self,
        store: &RegistryStore,
        filter: &ChainFilter,
    ) -> Result<HealthReport> {
        let mut targets = Vec::new();
        for chain in store.discover(filter)? {
            let record = match store.load(&chain) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(chain = %chain, "Skipping record: {}", e);
                    continue;
                }
            };
            for kind in ApiKind::ALL {
                for endpoint in record.endpoints(kind) {
                    if filter.allows_provider(endpoint.provider.as_deref()) {
                        targets.push((chain.clone(), kind, endpoint.clone()));
                    }
                }
            }
        }

        tracing::info!("Checking {} endpoints", targets.len());

        let checks: Vec<EndpointCheck> = stream::iter(targets)
            .map(|(chain, kind, endpoint)| async move {
                let result = self.prober.check(&endpoint.address, kind).await;
                match result.status {
                    HealthStatus::Healthy => tracing::info!(
                        chain = %chain,
                        %kind,
                        "OK {} ({}ms)",
                        endpoint.address,
                        result.response_time_ms
                    ),
                    _ => tracing::warn!(
                        chain = %chain,
                        %kind,
                        "FAIL {} {}",
                        endpoint.address,
                        result
                            .error
                            .clone()
                            .or_else(|| result.http_status.map(|s| format!("HTTP {}", s)))
                            .unwrap_or_default()
                    ),
                }

                EndpointCheck {
                    chain,
                    kind,
                    url: endpoint.address,
                    provider: endpoint.provider.unwrap_or_else(|| "Unknown".to_string()),
                    status: result.status,
                    response_time_ms: result.response_time_ms,
                    http_status: result.http_status,
                    error: result.error,
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        Ok(HealthReport::from_checks(checks))
    }
}
