//! Environment-sourced harvest configuration.
//!
//! All settings are resolved once at startup into an immutable
//! [`HarvestConfig`] that is passed into the loop; nothing reads the
//! environment mid-run. Callers should run `dotenv::dotenv().ok()` before
//! [`HarvestConfig::from_env`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default API user field sent with every workflow run.
const DEFAULT_USER_ID: &str = "slack-history-import";

/// Default checkpoint file path.
const DEFAULT_STATE_FILE: &str = "./cursor.state.json";

/// Resolved harvest configuration.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Dify workflow endpoint URL.
    pub endpoint: String,
    /// Bearer token for the workflow API.
    pub api_key: String,
    /// API user field sent with each run.
    pub user_id: String,
    /// Slack channel whose history is harvested.
    pub channel_id: String,
    /// Optional oldest-timestamp passthrough input for the workflow.
    pub oldest_ts: Option<String>,
    /// Optional latest-timestamp passthrough input (the walk's start point).
    pub latest_ts: Option<String>,
    /// Lower-bound date (`YYYY-MM-DD`); the walk stops once a batch's oldest
    /// message is at or before this date.
    pub lower_bound_date: Option<String>,
    /// Pause between successful batches.
    pub request_interval: Duration,
    /// Page size requested from the workflow.
    pub page_size: u32,
    /// Retry budget per batch attempt.
    pub max_retries: u32,
    /// Fixed pause between retries of the same batch.
    pub retry_interval: Duration,
    /// Checkpoint file path.
    pub state_file: PathBuf,
    /// Optional Prometheus listener address.
    pub metrics_addr: Option<SocketAddr>,
}

impl HarvestConfig {
    /// Resolve just the checkpoint path from the environment.
    ///
    /// Used by read-only commands that inspect the state file without
    /// needing API credentials.
    pub fn state_file_from_env() -> PathBuf {
        optional("STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
    }

    /// Resolve configuration from the environment.
    ///
    /// Missing required variables are fatal configuration errors; optional
    /// variables set to the empty string are treated as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = required("DIFY_ENDPOINT")?;
        let api_key = required("DIFY_API_KEY")?;
        let channel_id = required("CHANNEL_ID")?;

        let user_id = optional("DIFY_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        let oldest_ts = optional("OLDEST_TS");
        let latest_ts = optional("LATEST_TS");
        let lower_bound_date = optional("OLDEST_DATE");

        let interval_min: f64 = parse_or("REQUEST_INTERVAL_MIN", 1.0)?;
        if !interval_min.is_finite() || interval_min < 0.0 {
            return Err(ConfigError::InvalidVar {
                name: "REQUEST_INTERVAL_MIN",
                reason: format!("must be a non-negative number, got {interval_min}"),
            });
        }
        // Fractional minutes are allowed; the wait never drops below 1s.
        let request_interval = Duration::from_secs(((interval_min * 60.0) as u64).max(1));

        let page_size: u32 = parse_or("LIMIT", 5)?;
        let max_retries: u32 = parse_or("MAX_RETRIES", 3)?;
        let retry_secs: u64 = parse_or("RETRY_INTERVAL_SEC", 5)?;
        let retry_interval = Duration::from_secs(retry_secs);

        let state_file =
            PathBuf::from(optional("STATE_FILE").unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()));

        let metrics_addr = match optional("METRICS_ADDR") {
            Some(raw) => Some(raw.parse().map_err(|e| ConfigError::InvalidVar {
                name: "METRICS_ADDR",
                reason: format!("not a socket address: {e}"),
            })?),
            None => None,
        };

        Ok(Self {
            endpoint,
            api_key,
            user_id,
            channel_id,
            oldest_ts,
            latest_ts,
            lower_bound_date,
            request_interval,
            page_size,
            max_retries,
            retry_interval,
            state_file,
            metrics_addr,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidVar {
            name,
            reason: format!("{e}"),
        }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable has an unusable value
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
