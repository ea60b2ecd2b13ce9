//! Remote transport seam.
//!
//! The dispatcher talks to the aggregation endpoint through the
//! [`Transport`] trait so tests can substitute a recording transport.
//! [`HttpTransport`] is the production implementation: one authenticated
//! POST per batch, body is a JSON array of entries, addressed to the
//! configured group and the entry's stream.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::error;

use crate::config::Config;
use crate::envelope::LogEntry;
use crate::error::{ConfigError, SendError};
use crate::stream::StreamId;

/// Submits one ordered batch for one stream to the remote endpoint.
///
/// Implementations classify failures: [`SendError::Transient`] is retried
/// by the dispatcher, [`SendError::Permanent`] drops the batch immediately.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, stream: StreamId, batch: &[LogEntry]) -> Result<(), SendError>;
}

/// HTTP transport for the remote aggregation endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    group: String,
    api_key: String,
}

impl HttpTransport {
    /// Builds the transport from validated configuration.
    pub fn new(config: &Config) -> Result<HttpTransport, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.flush_timeout)
            .pool_idle_timeout(Some(std::time::Duration::from_secs(270)))
            .tcp_keepalive(Some(std::time::Duration::from_secs(120)))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(HttpTransport {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            group: config.group.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn ingest_url(&self, stream: StreamId) -> String {
        format!("{}/v1/ingest/{}/{}", self.endpoint, self.group, stream)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, stream: StreamId, batch: &[LogEntry]) -> Result<(), SendError> {
        let resp = self
            .client
            .post(self.ingest_url(stream))
            .header("X-Api-Key", &self.api_key)
            .json(&batch)
            .send()
            .await;

        match resp {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(());
                }
                if status == StatusCode::FORBIDDEN {
                    // Credential problem; retrying cannot help.
                    error!(
                        "TRANSPORT | {} | request denied by aggregation endpoint, check API key",
                        stream
                    );
                    return Err(SendError::Permanent(format!("status {status}")));
                }
                if status == StatusCode::REQUEST_TIMEOUT
                    || status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
                {
                    return Err(SendError::Transient(format!("status {status}")));
                }
                Err(SendError::Permanent(format!("status {status}")))
            }
            Err(e) => Err(SendError::Transient(e.to_string())),
        }
    }
}
