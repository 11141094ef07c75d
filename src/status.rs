//! Remote endpoint status history
//!
//! The status source reports, per chain, when each previously observed
//! endpoint last answered successfully:
//!
//! ```json
//! { "rpc":  { "current": { "<address>": { "lastSuccessAt": 1700000000000 } } },
//!   "rest": { "current": { ... } } }
//! ```

use crate::error::StatusError;
use crate::registry::{trim_trailing_slash, ApiKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Public status service for the Cosmos chain registry
pub const DEFAULT_STATUS_URL: &str = "https://status.cosmos.directory";

/// Sentinel for "never seen succeeding"
pub const UNKNOWN_SUCCESS: i64 = -1;

/// Status of a single endpoint as reported remotely
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EndpointStatus {
    /// Last successful contact, milliseconds since epoch
    #[serde(rename = "lastSuccessAt", default)]
    pub last_success_at: Option<i64>,
}

impl EndpointStatus {
    pub fn at(ms: i64) -> Self {
        Self {
            last_success_at: Some(ms),
        }
    }

    /// Last success in ms, or [`UNKNOWN_SUCCESS`]
    pub fn last_success_ms(&self) -> i64 {
        self.last_success_at.unwrap_or(UNKNOWN_SUCCESS)
    }
}

/// Remote history for one endpoint class
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassStatus {
    #[serde(default)]
    pub current: HashMap<String, EndpointStatus>,
}

/// Remote history for one chain
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainStatus {
    #[serde(default)]
    pub rpc: ClassStatus,
    #[serde(default)]
    pub rest: ClassStatus,
}

impl ChainStatus {
    fn class(&self, kind: ApiKind) -> &ClassStatus {
        match kind {
            ApiKind::Rpc => &self.rpc,
            ApiKind::Rest => &self.rest,
        }
    }

    /// Look up an address, falling back to a trailing-slash-insensitive match
    pub fn lookup(&self, kind: ApiKind, address: &str) -> Option<&EndpointStatus> {
        let current = &self.class(kind).current;
        current.get(address).or_else(|| {
            let wanted = trim_trailing_slash(address);
            current
                .iter()
                .find(|(addr, _)| trim_trailing_slash(addr) == wanted)
                .map(|(_, status)| status)
        })
    }

    /// Number of endpoints the source knows about
    pub fn len(&self) -> usize {
        self.rpc.current.len() + self.rest.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Client for the remote status source
#[derive(Debug, Clone)]
pub struct StatusClient {
    /// HTTP client
    client: reqwest::Client,
    /// Base URL; the chain name is appended as the last path segment
    base_url: String,
}

impl StatusClient {
    /// Create a new status client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StatusError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatusError::HttpClientInit(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// URL queried for a chain
    pub fn chain_url(&self, chain: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), chain)
    }

    /// Fetch the status history of a chain
    pub async fn fetch(&self, chain: &str) -> Result<ChainStatus, StatusError> {
        let url = self.chain_url(chain);
        tracing::debug!(chain, "Fetching status from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StatusError::Request {
                chain: chain.to_string(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(StatusError::HttpStatus {
                chain: chain.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| StatusError::Request {
                chain: chain.to_string(),
                source,
            })?;

        serde_json::from_str(&body).map_err(|e| StatusError::Malformed {
            chain: chain.to_string(),
            reason: e.to_string(),
        })
    }
}
