use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::domain::errors::AgentError;
use crate::domain::models::{AgentConfig, Host};
use crate::domain::ports::AgentStatusProbe;

/// Wire format of the status endpoint: `{"count": <integer>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusBody {
    pub count: u32,
}

/// reqwest-backed [`AgentStatusProbe`].
///
/// Features:
/// - Connection pooling via a shared `reqwest::Client`
/// - Per-attempt timeout supplied by the caller (cluster-scoped)
/// - One retry after a fixed delay; the second failure is surfaced
pub struct HttpAgentStatusProbe {
    http_client: ReqwestClient,
    config: AgentConfig,
}

impl HttpAgentStatusProbe {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(2)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| AgentError::Request(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn url_for(&self, host: &Host) -> String {
        format!(
            "{}://{}:{}/",
            self.config.scheme, host.address, self.config.port
        )
    }

    async fn send_request(&self, url: &str, timeout: Duration) -> Result<u32, AgentError> {
        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(timeout)
                } else {
                    AgentError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Status(status.as_u16()));
        }

        let body: AgentStatusBody = response
            .json()
            .await
            .map_err(|e| AgentError::Malformed(e.to_string()))?;

        Ok(body.count)
    }
}

#[async_trait]
impl AgentStatusProbe for HttpAgentStatusProbe {
    #[instrument(skip(self, host), fields(host_id = %host.id))]
    async fn running_count(&self, host: &Host, timeout: Duration) -> Result<u32, AgentError> {
        if !self.config.enabled {
            return Err(AgentError::Disabled);
        }

        let url = self.url_for(host);
        match self.send_request(&url, timeout).await {
            Ok(count) => {
                debug!(url = %url, count, "status agent answered");
                Ok(count)
            }
            Err(err) if err.is_retryable() => {
                warn!(
                    url = %url,
                    error = %err,
                    retry_delay_ms = self.config.retry_delay_ms,
                    "status agent request failed, retrying once"
                );
                sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                self.send_request(&url, timeout).await
            }
            Err(err) => Err(err),
        }
    }
}
