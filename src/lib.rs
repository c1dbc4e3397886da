//! # Slack History Harvester
//!
//! A small service that incrementally harvests a Slack channel's message
//! history through a Dify workflow API, walking strictly backward in time
//! from a starting point toward an optional lower date bound. Progress is
//! checkpointed to a JSON state file after every successful page, so the
//! harvest can be interrupted (Ctrl+C, crash, redeploy) and resumed without
//! losing or re-skipping pages.
//!
//! ## How a harvest runs
//!
//! 1. Load the checkpoint (or start fresh from the most recent page)
//! 2. Fetch one page with the saved cursor
//! 3. Classify the result: success, remote internal error, or transport
//!    failure; transient failures retry the same cursor with a fixed delay
//! 4. On success, advance the checkpoint and evaluate termination (empty
//!    continuation cursor, or the oldest message crossing the lower bound)
//! 5. Sleep for the configured interval and repeat
//!
//! The harvester does not store messages itself; the Dify workflow persists
//! each page downstream, and this tool only drives pagination.
//!
//! ## Quick start
//!
//! ```no_run
//! use slack_history_harvester::checkpoint::CheckpointStore;
//! use slack_history_harvester::config::HarvestConfig;
//! use slack_history_harvester::fetcher::dify::DifyWorkflowClient;
//! use slack_history_harvester::harvester::Harvester;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarvestConfig::from_env()?;
//! let store = CheckpointStore::new(&config.state_file);
//! let fetcher = DifyWorkflowClient::new(&config)?;
//!
//! let outcome = Harvester::from_config(fetcher, store, &config).run().await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Environment-sourced immutable configuration
//! - [`fetcher`] - The `PageFetcher` seam and the Dify workflow client
//! - [`harvester`] - The polling loop, retry policy, and termination policy
//! - [`checkpoint`] - Durable resume state with atomic writes
//! - [`shutdown`] - Graceful-interrupt coordination
//! - [`metrics`] - Optional Prometheus counters for unattended runs

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Checkpoint persistence for resumable harvests
pub mod checkpoint;

/// CLI command implementations
pub mod cli;

/// Environment-sourced configuration
pub mod config;

/// Page fetching from the remote history API
pub mod fetcher;

/// Harvest orchestration
pub mod harvester;

/// Observability metrics
pub mod metrics;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

// Re-export commonly used types
pub use checkpoint::{CheckpointState, CheckpointStore};
pub use config::HarvestConfig;
pub use fetcher::BatchResult;
pub use harvester::{Harvester, HarvestOutcome, RunMode};
