//! Endpoint staleness reconciliation
//!
//! A pass runs in three sequenced phases over the worker pool:
//!
//! 1. one [`StatusFetchTask`] per chain loads its record, judges every
//!    endpoint against the remote history and collects stale candidates;
//! 2. one [`ProbeTask`] per candidate decides whether it is really dead;
//! 3. one [`RemovalTask`] per affected chain rewrites its record.
//!
//! No removal starts before every decision is made, and each chain's
//! removals land in a single reload-then-write.

mod decision;
mod report;
mod task;

pub use decision::{Staleness, StalenessDecision};
pub use report::PassReport;
pub use task::{ProbeTask, Removal, RemovalTask, StatusFetchTask, WorkOutcome, WorkUnit};

use crate::config::{ChainFilter, Config, RetryPolicy};
use crate::error::{RecordError, Result};
use crate::pool::{Deadline, WorkerPool};
use crate::probe::Prober;
use crate::registry::{ApiKind, RegistryStore};
use crate::status::StatusClient;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pass phase, for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Status,
    Probe,
    Removal,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Status => "fetching status",
            Phase::Probe => "probing",
            Phase::Removal => "removing",
        })
    }
}

/// Pass progress information
#[derive(Debug, Clone, Copy)]
pub struct PassProgress {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

/// Progress callback type
pub type ProgressCallback = Arc<dyn Fn(PassProgress) + Send + Sync>;

/// Current time in milliseconds since epoch
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// State shared by every work unit
struct Executor {
    store: RegistryStore,
    status: StatusClient,
    prober: Prober,
    retry: RetryPolicy,
    filter: ChainFilter,
}

impl Executor {
    async fn execute(&self, unit: WorkUnit, cutoff_ms: i64) -> WorkOutcome {
        match unit {
            WorkUnit::StatusFetch(task) => self.judge_chain(task.chain, cutoff_ms).await,
            WorkUnit::Probe(task) => self.probe(task).await,
            WorkUnit::Removal(task) => self.apply_removals(task).await,
        }
    }

    async fn judge_chain(&self, chain: String, cutoff_ms: i64) -> WorkOutcome {
        let mut record = match self.store.load_retrying(&chain, &self.retry).await {
            Ok(record) => record,
            Err(RecordError::MissingApis(_)) => {
                tracing::debug!(chain = %chain, "No apis, skipping");
                return WorkOutcome::Skipped { chain };
            }
            Err(e) => {
                tracing::warn!(chain = %chain, "Unreadable record: {}", e);
                return WorkOutcome::Abandoned {
                    chain,
                    reason: e.to_string(),
                };
            }
        };

        record
            .rpc
            .retain(|e| self.filter.allows_provider(e.provider.as_deref()));
        record
            .rest
            .retain(|e| self.filter.allows_provider(e.provider.as_deref()));
        if record.is_empty() {
            return WorkOutcome::Skipped { chain };
        }
        let endpoints = record.endpoint_count();

        let status = match self.status.fetch(&chain).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(chain = %chain, "Skipping chain: {}", e);
                return WorkOutcome::StatusUnavailable {
                    chain,
                    endpoints,
                    reason: e.to_string(),
                };
            }
        };

        let mut fresh = 0;
        let mut unseen = 0;
        let mut candidates = Vec::new();
        let mut queued = HashSet::new();

        for kind in ApiKind::ALL {
            for endpoint in record.endpoints(kind) {
                match Staleness::judge(status.lookup(kind, &endpoint.address), cutoff_ms) {
                    Staleness::Fresh => fresh += 1,
                    Staleness::Unseen => unseen += 1,
                    Staleness::Stale { last_success_at } => {
                        if !queued.insert((kind, endpoint.base_url().to_string())) {
                            continue;
                        }
                        tracing::debug!(
                            chain = %chain,
                            %kind,
                            address = %endpoint.address,
                            last_success_at,
                            "Stale endpoint"
                        );
                        candidates.push(ProbeTask {
                            chain: chain.clone(),
                            kind,
                            address: endpoint.address.clone(),
                            provider: endpoint.provider.clone(),
                            last_success_at,
                        });
                    }
                }
            }
        }

        WorkOutcome::Judged {
            chain,
            endpoints,
            fresh,
            unseen,
            candidates,
        }
    }

    async fn probe(&self, task: ProbeTask) -> WorkOutcome {
        let decision = StalenessDecision::after_probe(self.prober.probe(&task.address).await);

        match &decision {
            StalenessDecision::ConfirmedDead(reason) => tracing::info!(
                chain = %task.chain,
                kind = %task.kind,
                address = %task.address,
                "Probe failed: {}",
                reason
            ),
            StalenessDecision::StaleButAlive(status) => tracing::debug!(
                chain = %task.chain,
                kind = %task.kind,
                address = %task.address,
                status,
                "Stale endpoint still answers"
            ),
            _ => {}
        }

        WorkOutcome::Probed { task, decision }
    }

    async fn apply_removals(&self, task: RemovalTask) -> WorkOutcome {
        let pairs: Vec<(ApiKind, String)> = task
            .removals
            .iter()
            .map(|r| (r.kind, r.address.clone()))
            .collect();

        match self
            .store
            .remove_endpoints(&task.chain, &pairs, &self.retry)
            .await
        {
            Ok(written) => {
                for removal in &task.removals {
                    tracing::info!(
                        chain = %task.chain,
                        kind = %removal.kind,
                        address = %removal.address,
                        "Removed stale endpoint"
                    );
                }
                WorkOutcome::Removed {
                    chain: task.chain,
                    removals: task.removals,
                    written,
                }
            }
            Err(e) => {
                tracing::error!(
                    chain = %task.chain,
                    endpoints = ?pairs,
                    "Failed to update record: {}",
                    e
                );
                WorkOutcome::Abandoned {
                    chain: task.chain,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Runs reconciliation passes over a registry
pub struct Reconciler {
    /// Configuration
    config: Config,
    /// Shared executor
    executor: Arc<Executor>,
    /// Worker pool
    pool: WorkerPool,
    /// Progress callback
    progress_callback: Option<ProgressCallback>,
}

impl Reconciler {
    /// Create a new reconciler from config
    pub fn new(config: Config) -> Result<Self> {
        let store = RegistryStore::open(&config.registry_root)?;
        let status = StatusClient::new(config.status_url.clone(), config.timeout)?;
        let prober = Prober::new(config.timeout)?;
        let pool = WorkerPool::new(config.workers, config.queue_depth);

        Ok(Self {
            executor: Arc::new(Executor {
                store,
                status,
                prober,
                retry: config.retry.clone(),
                filter: config.filter.clone(),
            }),
            config,
            pool,
            progress_callback: None,
        })
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(PassProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run one full pass.
    ///
    /// With a configured deadline, a pass that runs out of time stops every
    /// worker before returning [`PoolError::DeadlineExceeded`]; removals not
    /// yet written are dropped.
    ///
    /// [`PoolError::DeadlineExceeded`]: crate::error::PoolError::DeadlineExceeded
    pub async fn run(&self) -> Result<PassReport> {
        let deadline = self.config.deadline.map(Deadline::after);
        let cutoff_ms = now_ms().saturating_sub(self.config.freshness_window_ms());
        let mut report = PassReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        let chains = self.executor.store.discover(&self.config.filter)?;
        tracing::info!(
            "Reconciling {} chains with {} workers",
            chains.len(),
            self.pool.workers()
        );

        // Phase 1: load records and judge remote history
        let units = chains
            .into_iter()
            .map(|chain| WorkUnit::StatusFetch(StatusFetchTask { chain }))
            .collect();
        let mut probes = Vec::new();
        for outcome in self.dispatch(Phase::Status, units, cutoff_ms, deadline).await? {
            match outcome {
                WorkOutcome::Judged {
                    endpoints,
                    fresh,
                    unseen,
                    candidates,
                    ..
                } => {
                    report.chains_scanned += 1;
                    report.endpoints_seen += endpoints;
                    report.fresh += fresh;
                    report.unseen += unseen;
                    probes.extend(candidates);
                }
                WorkOutcome::StatusUnavailable {
                    chain,
                    endpoints,
                    reason,
                } => {
                    report.chains_scanned += 1;
                    report.endpoints_seen += endpoints;
                    report.unavailable.insert(chain, reason);
                }
                WorkOutcome::Abandoned { chain, reason } => {
                    report.abandoned.insert(chain, reason);
                }
                WorkOutcome::Skipped { .. } => {}
                other => tracing::warn!("Unexpected outcome in status phase: {:?}", other),
            }
        }

        // Phase 2: probe stale candidates
        report.probed = probes.len();
        let units = probes.into_iter().map(WorkUnit::Probe).collect();
        let mut dead: BTreeMap<String, Vec<Removal>> = BTreeMap::new();
        for outcome in self.dispatch(Phase::Probe, units, cutoff_ms, deadline).await? {
            match outcome {
                WorkOutcome::Probed { task, decision } => match decision {
                    StalenessDecision::StaleButAlive(_) => report.stale_but_alive += 1,
                    StalenessDecision::ConfirmedDead(reason) => {
                        dead.entry(task.chain.clone())
                            .or_default()
                            .push(Removal::new(task, &reason));
                    }
                    StalenessDecision::Fresh | StalenessDecision::Unseen => {}
                },
                other => tracing::warn!("Unexpected outcome in probe phase: {:?}", other),
            }
        }

        for removals in dead.values_mut() {
            removals.sort_by(|a, b| (a.kind, &a.address).cmp(&(b.kind, &b.address)));
        }

        if self.config.dry_run {
            report.removed = dead;
            return Ok(report);
        }

        // Phase 3: apply removals, one write per chain
        let units = dead
            .into_iter()
            .map(|(chain, removals)| WorkUnit::Removal(RemovalTask { chain, removals }))
            .collect();
        for outcome in self.dispatch(Phase::Removal, units, cutoff_ms, deadline).await? {
            match outcome {
                WorkOutcome::Removed {
                    chain,
                    removals,
                    written,
                } => {
                    if written == 0 {
                        tracing::debug!(chain = %chain, "Endpoints were already gone from the record");
                    } else {
                        report.removed.insert(chain, removals);
                    }
                }
                WorkOutcome::Abandoned { chain, reason } => {
                    report.abandoned.insert(chain, reason);
                }
                other => tracing::warn!("Unexpected outcome in removal phase: {:?}", other),
            }
        }

        Ok(report)
    }

    async fn dispatch(
        &self,
        phase: Phase,
        units: Vec<WorkUnit>,
        cutoff_ms: i64,
        deadline: Option<Deadline>,
    ) -> Result<Vec<WorkOutcome>> {
        let total = units.len();
        tracing::debug!("{}: {} tasks", phase, total);

        let executor = self.executor.clone();
        let callback = self.progress_callback.clone();
        let completed = Arc::new(AtomicUsize::new(0));

        let outcomes = self
            .pool
            .run(
                units,
                move |unit| {
                    let executor = executor.clone();
                    let callback = callback.clone();
                    let completed = completed.clone();

                    async move {
                        let outcome = executor.execute(unit, cutoff_ms).await;
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(cb) = &callback {
                            cb(PassProgress {
                                phase,
                                completed: done,
                                total,
                            });
                        }
                        outcome
                    }
                },
                deadline,
            )
            .await?;
        Ok(outcomes)
    }
}
