//! Harvest command implementation

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::HarvestConfig;
use crate::fetcher::dify::DifyWorkflowClient;
use crate::harvester::{Harvester, HarvestOutcome, RunMode};
use crate::metrics;
use crate::shutdown::SharedShutdown;

use super::CliError;

/// Resumable harvester for Slack channel history served by a Dify workflow
#[derive(Parser, Debug)]
#[command(name = "slack-history-harvester", version, about)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Checkpoint state file (overrides STATE_FILE)
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest channel history backward in time
    Run(RunArgs),

    /// Inspect the checkpoint state file
    State(StateArgs),
}

/// Run command arguments
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Perform exactly one batch and exit (for testing and diagnostics)
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

impl RunArgs {
    /// Execute the harvest.
    pub async fn execute(
        &self,
        cli: &Cli,
        shutdown: SharedShutdown,
    ) -> Result<HarvestOutcome, CliError> {
        let mut config = HarvestConfig::from_env()?;
        if let Some(path) = &cli.state_file {
            config.state_file = path.clone();
        }

        if let Some(addr) = config.metrics_addr {
            if let Err(e) = metrics::init_metrics(addr) {
                warn!(error = %e, "Metrics exporter unavailable, continuing without it");
            }
        }

        let mode = if self.once {
            RunMode::Once
        } else {
            RunMode::Continuous
        };

        info!(
            channel = %config.channel_id,
            oldest_ts = config.oldest_ts.as_deref().unwrap_or("none"),
            latest_ts = config.latest_ts.as_deref().unwrap_or("none"),
            lower_bound = config.lower_bound_date.as_deref().unwrap_or("none"),
            interval_s = config.request_interval.as_secs(),
            page_size = config.page_size,
            state_file = %config.state_file.display(),
            "Harvest configured"
        );

        let store = CheckpointStore::new(&config.state_file);
        let fetcher = DifyWorkflowClient::new(&config)?;
        let harvester = Harvester::from_config(fetcher, store, &config)
            .with_mode(mode)
            .with_shutdown(shutdown);

        let outcome = harvester.run().await?;
        match outcome {
            HarvestOutcome::Finished => info!("Harvest complete"),
            HarvestOutcome::AlreadyFinished => info!("Harvest was already complete"),
            HarvestOutcome::Paused => info!("Harvest paused; rerun to resume"),
            HarvestOutcome::BatchComplete => info!("Batch complete; rerun to continue"),
        }
        Ok(outcome)
    }
}

/// State command arguments
#[derive(Parser, Debug)]
pub struct StateArgs {}

impl StateArgs {
    /// Print the checkpoint state without touching it.
    ///
    /// A corrupt file is reported as an error here (non-zero exit) even
    /// though `run` would silently start over, so an operator can tell the
    /// difference before deleting anything.
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let path = cli
            .state_file
            .clone()
            .unwrap_or_else(HarvestConfig::state_file_from_env);
        let store = CheckpointStore::new(&path);

        match store.read()? {
            Some(state) => {
                info!(
                    path = %path.display(),
                    cursor = state.cursor.as_deref().unwrap_or("none"),
                    batch_no = state.batch_no,
                    finished = state.finished,
                    "Checkpoint state"
                );
            }
            None => {
                info!(path = %path.display(), "No checkpoint file; harvest has not started");
            }
        }
        Ok(())
    }
}
