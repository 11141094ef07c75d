//! Error types for registry-pruner

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Remote status source errors
    #[error("Status error: {0}")]
    Status(#[from] StatusError),

    /// Endpoint probe errors
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Registry record errors
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Report output errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote status source could not provide history for a chain
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Request for {chain} failed: {source}")]
    Request {
        chain: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Status source returned HTTP {status} for {chain}")]
    HttpStatus { chain: String, status: u16 },

    #[error("Malformed status response for {chain}: {reason}")]
    Malformed { chain: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClientInit(String),
}

/// Reasons an endpoint probe is judged dead
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid endpoint address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClientInit(String),
}

/// Errors reading or writing a chain record
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(PathBuf),

    #[error("Record {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {0} has no apis object")]
    MissingApis(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Gave up on {path} after {attempts} attempts")]
    RetriesExhausted { path: PathBuf, attempts: u32 },
}

impl RecordError {
    /// Whether a later attempt may succeed.
    ///
    /// A corrupt read usually means another writer is mid-write, so it is
    /// worth retrying. Everything else is permanent for this pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecordError::Corrupt { .. })
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Registry root not found: {0}")]
    RegistryNotFound(PathBuf),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pass deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Report output errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output file: {0}")]
    FileCreate(String),
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_record_is_transient() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RecordError::Corrupt {
            path: PathBuf::from("demo/chain.json"),
            source,
        };
        assert!(err.is_transient());
        assert!(!RecordError::MissingApis(PathBuf::from("demo/chain.json")).is_transient());
        assert!(!RecordError::NotFound(PathBuf::from("demo/chain.json")).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err: Error = StatusError::HttpStatus {
            chain: "demo".to_string(),
            status: 500,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Status error: Status source returned HTTP 500 for demo"
        );
    }

    #[test]
    fn test_deadline_display_keeps_sub_second_precision() {
        let err: Error = PoolError::DeadlineExceeded(Duration::from_millis(600)).into();
        assert_eq!(err.to_string(), "Pool error: Pass deadline of 600ms exceeded");
    }
}
