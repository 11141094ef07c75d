//! Chain record and endpoint types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Endpoint class reconciled by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    Rpc,
    Rest,
}

impl ApiKind {
    /// All reconciled classes, in registry order
    pub const ALL: [ApiKind; 2] = [ApiKind::Rpc, ApiKind::Rest];

    /// Key of this class in the record's `apis` object
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKind::Rpc => "rpc",
            ApiKind::Rest => "rest",
        }
    }

    /// Path appended to the address when health-checking this class
    pub fn health_path(&self) -> &'static str {
        match self {
            ApiKind::Rpc => "/status",
            ApiKind::Rest => "/cosmos/base/tendermint/v1beta1/syncing",
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rpc" => Ok(ApiKind::Rpc),
            "rest" | "lcd" => Ok(ApiKind::Rest),
            other => Err(format!("Unknown API kind: {}", other)),
        }
    }
}

/// Strip a single trailing slash from an address
pub fn trim_trailing_slash(address: &str) -> &str {
    address.strip_suffix('/').unwrap_or(address)
}

/// A single RPC or REST endpoint as listed in `chain.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL
    pub address: String,
    /// Operator of the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            provider: None,
        }
    }

    /// Builder-style setter for provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Address without its trailing slash
    pub fn base_url(&self) -> &str {
        trim_trailing_slash(&self.address)
    }
}

/// The reconciled view of one chain's `chain.json`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainRecord {
    /// Chain identifier (registry folder name)
    pub chain: String,
    /// RPC endpoints, in file order
    pub rpc: Vec<Endpoint>,
    /// REST endpoints, in file order
    pub rest: Vec<Endpoint>,
}

impl ChainRecord {
    /// Extract the endpoint lists from a parsed record.
    ///
    /// Entries without a string `address` are skipped rather than rejected.
    pub fn from_document(chain: impl Into<String>, doc: &Value) -> Self {
        let apis = doc.get("apis");
        let list = |kind: ApiKind| -> Vec<Endpoint> {
            apis.and_then(|a| a.get(kind.as_str()))
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| {
                            let address = entry.get("address")?.as_str()?;
                            let provider = entry
                                .get("provider")
                                .and_then(Value::as_str)
                                .map(str::to_string);
                            Some(Endpoint {
                                address: address.to_string(),
                                provider,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            chain: chain.into(),
            rpc: list(ApiKind::Rpc),
            rest: list(ApiKind::Rest),
        }
    }

    /// Endpoints of one class
    pub fn endpoints(&self, kind: ApiKind) -> &[Endpoint] {
        match kind {
            ApiKind::Rpc => &self.rpc,
            ApiKind::Rest => &self.rest,
        }
    }

    /// Total number of reconciled endpoints
    pub fn endpoint_count(&self) -> usize {
        self.rpc.len() + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoint_count() == 0
    }
}

/// Remove every entry of `kind` whose address is in `addresses`.
///
/// Operates on the raw document so unrelated fields, including unknown keys
/// on endpoint entries, survive untouched. Returns the number of entries
/// dropped; duplicates of a removed address all go.
pub fn remove_addresses(doc: &mut Value, kind: ApiKind, addresses: &HashSet<String>) -> usize {
    let Some(entries) = doc
        .get_mut("apis")
        .and_then(|apis| apis.get_mut(kind.as_str()))
        .and_then(Value::as_array_mut)
    else {
        return 0;
    };

    let before = entries.len();
    entries.retain(|entry| {
        entry
            .get("address")
            .and_then(Value::as_str)
            .map(|addr| !addresses.contains(trim_trailing_slash(addr)))
            .unwrap_or(true)
    });
    before - entries.len()
}
