//! Endpoint liveness probes

use crate::error::ProbeError;
use crate::registry::{trim_trailing_slash, ApiKind};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Result of probing an endpoint's base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint answered with an accepted status
    Alive(u16),
    /// Endpoint failed the probe
    Dead(ProbeError),
}

impl ProbeOutcome {
    /// Judge a response status.
    ///
    /// 501 is what an unconfigured but running REST server answers on `/`.
    pub fn from_status(status: u16) -> Self {
        match status {
            200 | 501 => ProbeOutcome::Alive(status),
            other => ProbeOutcome::Dead(ProbeError::UnexpectedStatus(other)),
        }
    }
}

/// Health of an endpoint on its service path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Answered 200
    Healthy,
    /// Answered with another status
    Unhealthy,
    /// No answer
    Failed,
}

/// Result of a service-path health check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: HealthStatus,
    pub http_status: Option<u16>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Issues liveness probes with a fixed timeout
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    timeout: Duration,
}

impl Prober {
    /// Create a new prober
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::HttpClientInit(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Probe `<address>/` once. Only the status code is consulted.
    pub async fn probe(&self, address: &str) -> ProbeOutcome {
        let url = format!("{}/", trim_trailing_slash(address));

        match self.client.get(&url).send().await {
            Ok(response) => ProbeOutcome::from_status(response.status().as_u16()),
            Err(e) => ProbeOutcome::Dead(self.classify_error(&e)),
        }
    }

    /// Health-check an endpoint on the service path of its class
    pub async fn check(&self, address: &str, kind: ApiKind) -> CheckResult {
        let url = format!("{}{}", trim_trailing_slash(address), kind.health_path());
        let start = Instant::now();

        let result = self.client.get(&url).send().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let code = response.status().as_u16();
                CheckResult {
                    status: if code == 200 {
                        HealthStatus::Healthy
                    } else {
                        HealthStatus::Unhealthy
                    },
                    http_status: Some(code),
                    response_time_ms,
                    error: None,
                }
            }
            Err(e) => CheckResult {
                status: HealthStatus::Failed,
                http_status: None,
                response_time_ms,
                error: Some(self.classify_error(&e).to_string()),
            },
        }
    }

    fn classify_error(&self, e: &reqwest::Error) -> ProbeError {
        if e.is_timeout() {
            ProbeError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_builder() {
            ProbeError::InvalidAddress(e.to_string())
        } else {
            ProbeError::ConnectionFailed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_status_judgement() {
        assert_eq!(ProbeOutcome::from_status(200), ProbeOutcome::Alive(200));
        assert_eq!(ProbeOutcome::from_status(501), ProbeOutcome::Alive(501));
        assert_eq!(
            ProbeOutcome::from_status(404),
            ProbeOutcome::Dead(ProbeError::UnexpectedStatus(404))
        );
        assert!(matches!(ProbeOutcome::from_status(503), ProbeOutcome::Dead(_)));
        assert!(matches!(ProbeOutcome::from_status(301), ProbeOutcome::Dead(_)));
    }

    #[tokio::test]
    async fn test_probe_strips_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/"))
            .respond_with(ResponseTemplate::new(501))
            .expect(2)
            .mount(&server)
            .await;

        let prober = Prober::new(Duration::from_secs(2)).unwrap();
        let base = format!("{}/rest", server.uri());

        assert_eq!(prober.probe(&base).await, ProbeOutcome::Alive(501));
        assert_eq!(
            prober.probe(&format!("{}/", base)).await,
            ProbeOutcome::Alive(501)
        );
    }

    #[tokio::test]
    async fn test_probe_timeout_is_dead() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let prober = Prober::new(Duration::from_millis(200)).unwrap();
        let outcome = prober.probe(&server.uri()).await;
        assert_eq!(outcome, ProbeOutcome::Dead(ProbeError::Timeout(200)));
    }

    #[tokio::test]
    async fn test_probe_connection_refused_is_dead() {
        let prober = Prober::new(Duration::from_millis(500)).unwrap();
        let outcome = prober.probe("http://127.0.0.1:1").await;
        assert!(matches!(
            outcome,
            ProbeOutcome::Dead(ProbeError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_check_uses_service_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cosmos/base/tendermint/v1beta1/syncing"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let prober = Prober::new(Duration::from_secs(2)).unwrap();

        let rpc = prober.check(&server.uri(), ApiKind::Rpc).await;
        assert_eq!(rpc.status, HealthStatus::Healthy);
        assert_eq!(rpc.http_status, Some(200));

        let rest = prober.check(&format!("{}/", server.uri()), ApiKind::Rest).await;
        assert_eq!(rest.status, HealthStatus::Unhealthy);
        assert_eq!(rest.http_status, Some(503));
    }
}
