//! On-disk registry of per-chain records

use super::record::{remove_addresses, trim_trailing_slash, ApiKind, ChainRecord};
use crate::config::{ChainFilter, RetryPolicy};
use crate::error::{ConfigError, RecordError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of a chain record inside its folder
pub const RECORD_FILE: &str = "chain.json";

/// Directory tree of `<chain>/chain.json` records
#[derive(Debug, Clone)]
pub struct RegistryStore {
    root: PathBuf,
}

impl RegistryStore {
    /// Open a registry rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ConfigError::RegistryNotFound(root).into());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a chain's record
    pub fn record_path(&self, chain: &str) -> PathBuf {
        self.root.join(chain).join(RECORD_FILE)
    }

    /// List chain folders that contain a record and pass the filter, sorted
    pub fn discover(&self, filter: &ChainFilter) -> Result<Vec<String>> {
        let mut chains = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!("Skipping non UTF-8 folder {:?}", entry.file_name());
                continue;
            };
            if !filter.allows_folder(&name) {
                continue;
            }
            if self.record_path(&name).is_file() {
                chains.push(name);
            }
        }

        chains.sort();
        Ok(chains)
    }

    /// Read and parse a chain's record as a raw JSON document
    pub fn read_document(&self, chain: &str) -> std::result::Result<Value, RecordError> {
        let path = self.record_path(chain);
        let content = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RecordError::NotFound(path.clone())
            } else {
                RecordError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|source| RecordError::Corrupt { path, source })
    }

    /// Load the reconciled view of a chain's record
    pub fn load(&self, chain: &str) -> std::result::Result<ChainRecord, RecordError> {
        let doc = self.read_document(chain)?;
        self.to_record(chain, &doc)
    }

    fn to_record(&self, chain: &str, doc: &Value) -> std::result::Result<ChainRecord, RecordError> {
        if !doc.get("apis").is_some_and(Value::is_object) {
            return Err(RecordError::MissingApis(self.record_path(chain)));
        }
        Ok(ChainRecord::from_document(chain, doc))
    }

    /// Write a full document back to a chain's record.
    ///
    /// Output is 2-space indented with non-ASCII characters kept literal.
    /// The file is replaced by rename so readers never see a partial write.
    pub fn write_document(&self, chain: &str, doc: &Value) -> std::result::Result<(), RecordError> {
        let path = self.record_path(chain);
        let dir = path.parent().unwrap_or(&self.root);
        let io_err = |source: std::io::Error| RecordError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        serde_json::to_writer_pretty(&mut tmp, doc).map_err(|e| io_err(e.into()))?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        Ok(())
    }

    /// Read a chain's record, retrying corrupt reads.
    ///
    /// A corrupt read usually means another writer is mid-write, so it is
    /// retried with jittered backoff up to the policy's attempt limit. Other
    /// failures are returned at once.
    pub async fn read_document_retrying(
        &self,
        chain: &str,
        retry: &RetryPolicy,
    ) -> std::result::Result<Value, RecordError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.read_document(chain) {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.backoff();
                    tracing::warn!(
                        chain,
                        attempt,
                        "Record unreadable, retrying in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    tracing::error!(chain, "Giving up on record after {} attempts: {}", attempt, e);
                    return Err(RecordError::RetriesExhausted {
                        path: self.record_path(chain),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like [`RegistryStore::load`], retrying corrupt reads
    pub async fn load_retrying(
        &self,
        chain: &str,
        retry: &RetryPolicy,
    ) -> std::result::Result<ChainRecord, RecordError> {
        let doc = self.read_document_retrying(chain, retry).await?;
        self.to_record(chain, &doc)
    }

    /// Remove addresses from a chain's record.
    ///
    /// The record is reloaded right before the write, with the same bounded
    /// retry as [`RegistryStore::read_document_retrying`]. The file is only
    /// rewritten when something was actually removed.
    pub async fn remove_endpoints(
        &self,
        chain: &str,
        removals: &[(ApiKind, String)],
        retry: &RetryPolicy,
    ) -> std::result::Result<usize, RecordError> {
        let mut by_kind: BTreeMap<ApiKind, HashSet<String>> = BTreeMap::new();
        for (kind, address) in removals {
            by_kind
                .entry(*kind)
                .or_default()
                .insert(trim_trailing_slash(address).to_string());
        }

        let mut doc = self.read_document_retrying(chain, retry).await?;

        // No await from here on: once the reload succeeded the write is not
        // interrupted by cancellation.
        let removed: usize = by_kind
            .iter()
            .map(|(kind, addresses)| remove_addresses(&mut doc, *kind, addresses))
            .sum();

        if removed > 0 {
            self.write_document(chain, &doc)?;
        }
        Ok(removed)
    }
}
