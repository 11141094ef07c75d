//! Typed work units dispatched through the worker pool

use super::decision::StalenessDecision;
use crate::error::ProbeError;
use crate::registry::ApiKind;
use serde::Serialize;

/// Load one chain's record, fetch its remote history and pick probe candidates
#[derive(Debug, Clone)]
pub struct StatusFetchTask {
    pub chain: String,
}

/// Probe one endpoint whose remote history is stale
#[derive(Debug, Clone)]
pub struct ProbeTask {
    pub chain: String,
    pub kind: ApiKind,
    pub address: String,
    pub provider: Option<String>,
    /// Last remote success in ms, -1 if unknown
    pub last_success_at: i64,
}

/// Remove every confirmed-dead endpoint of one chain in a single write
#[derive(Debug, Clone)]
pub struct RemovalTask {
    pub chain: String,
    pub removals: Vec<Removal>,
}

/// An endpoint removed (or to be removed) from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub kind: ApiKind,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Why the probe judged it dead
    pub reason: String,
}

impl Removal {
    pub fn new(task: ProbeTask, reason: &ProbeError) -> Self {
        Self {
            kind: task.kind,
            address: task.address,
            provider: task.provider,
            reason: reason.to_string(),
        }
    }
}

/// A unit of work for the pool
#[derive(Debug, Clone)]
pub enum WorkUnit {
    StatusFetch(StatusFetchTask),
    Probe(ProbeTask),
    Removal(RemovalTask),
}

/// What a unit of work produced
#[derive(Debug)]
pub enum WorkOutcome {
    /// Remote history judged; stale endpoints need probing
    Judged {
        chain: String,
        endpoints: usize,
        fresh: usize,
        unseen: usize,
        candidates: Vec<ProbeTask>,
    },
    /// Remote history could not be fetched; the chain is left alone
    StatusUnavailable {
        chain: String,
        endpoints: usize,
        reason: String,
    },
    /// Nothing to reconcile: no `apis`, or no endpoint passes the filter
    Skipped { chain: String },
    /// A stale endpoint was probed
    Probed {
        task: ProbeTask,
        decision: StalenessDecision,
    },
    /// Removals were written
    Removed {
        chain: String,
        removals: Vec<Removal>,
        written: usize,
    },
    /// The record could not be updated this pass
    Abandoned { chain: String, reason: String },
}
