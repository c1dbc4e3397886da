//! CLI error types and conversions

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::harvester::HarvestError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Harvest error
    #[error("harvest error: {0}")]
    Harvest(#[from] HarvestError),

    /// Checkpoint error
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}
