//! The polling loop that drives the backward walk.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::config::HarvestConfig;
use crate::fetcher::{BatchResult, PageFetcher};
use crate::harvester::policy::{self, FetchClass};
use crate::harvester::HarvestError;
use crate::metrics;
use crate::shutdown::{self, SharedShutdown};

/// Default pause between successful batches.
const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(60);

/// Default fixed pause between retries of the same batch.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Default retry budget per batch attempt.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Run mode for a harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Keep fetching batches until the walk terminates or is interrupted.
    Continuous,
    /// Perform exactly one batch (with retries) and exit.
    Once,
}

/// How a harvest run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// The backward walk reached its end; the checkpoint is marked finished.
    Finished,
    /// The checkpoint was already marked finished; no fetch was attempted.
    AlreadyFinished,
    /// An interrupt was received; progress is saved and resumable.
    Paused,
    /// Single-batch mode completed its one batch with history remaining.
    BatchComplete,
}

/// Result of fetching one batch through the retry policy.
enum FetchAttempt {
    Success(BatchResult),
    Exhausted(String),
    Interrupted,
}

/// Drives fetch → classify → advance/retry → wait against a checkpoint.
pub struct Harvester<F> {
    fetcher: F,
    store: CheckpointStore,
    lower_bound_date: Option<String>,
    request_interval: Duration,
    retry_interval: Duration,
    max_retries: u32,
    mode: RunMode,
    shutdown: Option<SharedShutdown>,
}

impl<F: PageFetcher> Harvester<F> {
    /// Create a harvester with default pacing and retry budget.
    pub fn new(fetcher: F, store: CheckpointStore) -> Self {
        Self {
            fetcher,
            store,
            lower_bound_date: None,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            mode: RunMode::Continuous,
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Create a harvester configured from the environment settings.
    pub fn from_config(fetcher: F, store: CheckpointStore, config: &HarvestConfig) -> Self {
        Self::new(fetcher, store)
            .with_lower_bound(config.lower_bound_date.clone())
            .with_request_interval(config.request_interval)
            .with_retry_policy(config.max_retries, config.retry_interval)
    }

    /// Set the lower-bound date that terminates the walk.
    pub fn with_lower_bound(mut self, bound: Option<String>) -> Self {
        self.lower_bound_date = bound;
        self
    }

    /// Set the pause between successful batches.
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Set the retry budget and the fixed delay between retries.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = retry_interval;
        self
    }

    /// Set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run the harvest to completion, pause, or failure.
    pub async fn run(&self) -> Result<HarvestOutcome, HarvestError> {
        let mut state = self.store.load();

        if state.finished {
            info!("Checkpoint already marked finished; exiting without fetching");
            return Ok(HarvestOutcome::AlreadyFinished);
        }

        info!(
            mode = ?self.mode,
            batch_no = state.batch_no,
            has_cursor = state.cursor.is_some(),
            lower_bound = self.lower_bound_date.as_deref().unwrap_or("none"),
            interval_s = self.request_interval.as_secs(),
            "Starting harvest"
        );

        loop {
            if self.shutdown_requested() {
                return Ok(self.pause(&state));
            }

            let batch = match self.fetch_with_retry(&state).await {
                FetchAttempt::Success(batch) => batch,
                FetchAttempt::Interrupted => return Ok(self.pause(&state)),
                FetchAttempt::Exhausted(last_error) => match self.mode {
                    RunMode::Once => {
                        metrics::record_retry_exhausted("once");
                        error!(
                            attempts = self.attempt_budget(),
                            last_error = %last_error,
                            "Retry budget exhausted in single-batch mode"
                        );
                        return Err(HarvestError::RetriesExhausted {
                            attempts: self.attempt_budget(),
                            last_error,
                        });
                    }
                    RunMode::Continuous => {
                        metrics::record_retry_exhausted("continuous");
                        warn!(
                            attempts = self.attempt_budget(),
                            last_error = %last_error,
                            defer_s = self.request_interval.as_secs(),
                            "Retry budget exhausted; deferring batch to the next interval"
                        );
                        // Full request interval here, not the retry delay; the
                        // next cycle gets a fresh retry budget.
                        if !self.wait(self.request_interval).await {
                            return Ok(self.pause(&state));
                        }
                        continue;
                    }
                },
            };

            state.advance(batch.continuation().map(str::to_string));
            metrics::record_batch_completed();
            info!(
                batch_no = state.batch_no,
                message_size = ?batch.message_size,
                oldest_dt = batch.oldest_dt.as_deref().unwrap_or("unknown"),
                has_next_cursor = batch.continuation().is_some(),
                "Batch completed"
            );

            let termination = policy::evaluate(&batch, self.lower_bound_date.as_deref());
            if termination.is_terminal() {
                state.mark_finished();
                self.persist(&state);
                info!(reason = ?termination, batch_no = state.batch_no, "Harvest finished");
                return Ok(HarvestOutcome::Finished);
            }

            self.persist(&state);

            if self.mode == RunMode::Once {
                info!("Single-batch mode: one batch completed, exiting");
                return Ok(HarvestOutcome::BatchComplete);
            }

            if !self.wait(self.request_interval).await {
                return Ok(self.pause(&state));
            }
        }
    }

    /// Total fetch attempts allowed per batch. The budget counts attempts,
    /// not waits, and is never below one.
    fn attempt_budget(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Fetch the current batch, retrying transient failures in place.
    ///
    /// Remote internal errors and transport failures share one retry counter;
    /// the cursor is never touched here, so an interrupted or exhausted
    /// attempt always resumes at the same page.
    async fn fetch_with_retry(&self, state: &CheckpointState) -> FetchAttempt {
        let cursor = state.cursor.as_deref();
        let budget = self.attempt_budget();
        let mut last_error = String::new();

        for attempt in 1..=budget {
            if self.shutdown_requested() {
                return FetchAttempt::Interrupted;
            }

            let timer = metrics::FetchTimer::start();
            let result = match self.fetch_guarded(cursor).await {
                Some(result) => result,
                None => {
                    timer.record("interrupted");
                    return FetchAttempt::Interrupted;
                }
            };

            let class = policy::classify(result);
            timer.record(class.label());
            match class {
                FetchClass::Success(batch) => return FetchAttempt::Success(batch),
                FetchClass::RemoteInternalError => {
                    warn!(
                        attempt,
                        max_attempts = budget,
                        "All output fields absent (remote internal error)"
                    );
                    last_error = "remote internal error: all output fields absent".to_string();
                }
                FetchClass::TransportError(e) => {
                    warn!(
                        attempt,
                        max_attempts = budget,
                        error = %e,
                        "Fetch attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < budget {
                if !self.wait(self.retry_interval).await {
                    return FetchAttempt::Interrupted;
                }
            }
        }

        FetchAttempt::Exhausted(last_error)
    }

    /// Run one fetch, abandoning it if shutdown is requested mid-flight.
    async fn fetch_guarded(
        &self,
        cursor: Option<&str>,
    ) -> Option<crate::fetcher::FetcherResult<BatchResult>> {
        match &self.shutdown {
            Some(handle) => tokio::select! {
                result = self.fetcher.fetch_page(cursor) => Some(result),
                _ = handle.wait_for_shutdown() => None,
            },
            None => Some(self.fetcher.fetch_page(cursor).await),
        }
    }

    /// Save the current state for a graceful pause.
    fn pause(&self, state: &CheckpointState) -> HarvestOutcome {
        info!(
            batch_no = state.batch_no,
            "Interrupt received; saving checkpoint and pausing"
        );
        self.persist(state);
        HarvestOutcome::Paused
    }

    /// Persist the state, absorbing write failures.
    ///
    /// The in-memory state stays authoritative for this process; a failed
    /// write costs at most a re-fetch of already-seen pages after a crash.
    fn persist(&self, state: &CheckpointState) {
        if let Err(e) = self.store.save(state) {
            metrics::record_checkpoint_save_failure();
            error!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to save checkpoint; continuing with in-memory state"
            );
        }
    }

    /// Cancellable sleep. Returns `false` if shutdown cut it short.
    async fn wait(&self, duration: Duration) -> bool {
        match &self.shutdown {
            Some(handle) => handle.sleep_unless_shutdown(duration).await,
            None => {
                tokio::time::sleep(duration).await;
                true
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}
