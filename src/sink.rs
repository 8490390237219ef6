// Telemetry sink: where finished snapshots go

use crate::error::SinkError;
use crate::models::Snapshot;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Collector route, appended to `api_address`.
pub const UPDATE_PATH: &str = "/api/host/update_host_details";

/// Application status the collector uses for an accepted payload.
pub const SUCCESS_CODE: i64 = 200;

/// Collector reply envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl SinkResponse {
    pub fn into_result(self) -> Result<(), SinkError> {
        if self.code == SUCCESS_CODE {
            Ok(())
        } else {
            Err(SinkError::Rejected {
                code: self.code,
                message: self.message,
            })
        }
    }
}

pub trait TelemetrySink: Send + Sync + 'static {
    /// Deliver one snapshot. `Transport` errors (including non-2xx HTTP
    /// statuses) are retried by the caller on the next tick; `Rejected` stops
    /// the agent.
    fn send(&self, snapshot: &Snapshot) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// JSON-over-HTTP POST to the collector.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(api_address: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::agent_id())
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint_url(api_address),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TelemetrySink for HttpSink {
    async fn send(&self, snapshot: &Snapshot) -> Result<(), SinkError> {
        let resp = self.client.post(&self.endpoint).json(snapshot).send().await?;
        let status = resp.status();
        // Only a 2xx reply carries a verdict on the payload; anything else is
        // the collector or a proxy failing, retried like a timeout.
        if !status.is_success() {
            return Err(SinkError::Transport(format!("collector answered HTTP {status}")));
        }
        let body = resp.text().await?;
        let reply: SinkResponse = serde_json::from_str(&body).map_err(|e| {
            SinkError::Transport(format!("unexpected reply (HTTP {status}): {e}"))
        })?;
        reply.into_result()
    }
}

fn endpoint_url(api_address: &str) -> String {
    format!("{}{}", api_address.trim().trim_end_matches('/'), UPDATE_PATH)
}
