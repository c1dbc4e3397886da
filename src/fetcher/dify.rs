//! Dify workflow client.
//!
//! The history pages are served by a Dify workflow that wraps the Slack
//! `conversations.history` API. Each fetch is a blocking workflow run: one
//! POST, one JSON body, one page summary back.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::fetcher::{BatchResult, FetcherError, FetcherResult, PageFetcher};

/// Request timeout. Workflow runs block until the wrapped Slack call and any
/// downstream persistence finish, which can take well over a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for a Dify workflow endpoint serving history pages.
pub struct DifyWorkflowClient {
    client: Client,
    endpoint: String,
    api_key: String,
    user_id: String,
    channel: String,
    page_size: u32,
    oldest_ts: Option<String>,
    latest_ts: Option<String>,
}

impl DifyWorkflowClient {
    /// Build a client from the harvest configuration.
    pub fn new(config: &HarvestConfig) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            user_id: config.user_id.clone(),
            channel: config.channel_id.clone(),
            page_size: config.page_size,
            oldest_ts: config.oldest_ts.clone(),
            latest_ts: config.latest_ts.clone(),
        })
    }

    /// Assemble the workflow `inputs` object for one page request.
    ///
    /// Optional inputs are omitted entirely rather than sent as null; the
    /// workflow treats a present-but-empty value as a real argument.
    fn build_inputs(&self, cursor: Option<&str>) -> Value {
        let mut inputs = json!({
            "channel": self.channel,
            "limit": self.page_size,
        });
        if let Some(cursor) = cursor {
            inputs["cursor"] = json!(cursor);
        }
        if let Some(oldest_ts) = &self.oldest_ts {
            inputs["oldest_ts"] = json!(oldest_ts);
        }
        if let Some(latest_ts) = &self.latest_ts {
            inputs["latest_ts"] = json!(latest_ts);
        }
        inputs
    }

    /// Extract the workflow outputs from a response body.
    ///
    /// Blocking workflow runs wrap outputs as `data.outputs`; some proxy
    /// deployments return the outputs object at the top level. Missing keys
    /// deserialize as absent fields, which is how the remote-internal-error
    /// sentinel reaches the retry policy.
    fn parse_outputs(body: &Value) -> FetcherResult<BatchResult> {
        let outputs = body
            .get("data")
            .and_then(|data| data.get("outputs"))
            .filter(|outputs| !outputs.is_null())
            .unwrap_or(body);

        serde_json::from_value(outputs.clone())
            .map_err(|e| FetcherError::ParseError(format!("failed to deserialize outputs: {e}")))
    }
}

#[async_trait]
impl PageFetcher for DifyWorkflowClient {
    async fn fetch_page(&self, cursor: Option<&str>) -> FetcherResult<BatchResult> {
        let payload = json!({
            "inputs": self.build_inputs(cursor),
            "response_mode": "blocking",
            "user": self.user_id,
        });

        debug!(
            endpoint = %self.endpoint,
            has_cursor = cursor.is_some(),
            limit = self.page_size,
            "Requesting history page"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FetcherError::HttpError(format!(
                "non-success status {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetcherError::ParseError(format!("invalid JSON body: {e}")))?;

        let result = Self::parse_outputs(&body)?;
        debug!(
            message_size = ?result.message_size,
            oldest_dt = ?result.oldest_dt,
            has_next_cursor = result.continuation().is_some(),
            "Received history page"
        );
        Ok(result)
    }
}
