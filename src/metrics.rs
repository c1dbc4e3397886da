//! Observability metrics for the harvest loop.
//!
//! Uses the `metrics` crate for low-overhead collection with an optional
//! Prometheus scrape endpoint. When no exporter is installed every recording
//! call is a no-op, so unattended runs without `METRICS_ADDR` pay nothing.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

static METRICS_INITIALIZED: Lazy<AtomicBool> = Lazy::new(|| AtomicBool::new(false));

/// Install the Prometheus exporter and register metric descriptions.
///
/// Called once at startup when a listener address is configured. Idempotent:
/// repeated calls after a successful install are no-ops.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "fetch_attempts_total",
        Unit::Count,
        "Total page fetch attempts, labeled by classified outcome"
    );

    describe_histogram!(
        "fetch_duration_seconds",
        Unit::Seconds,
        "Duration of individual page fetch attempts"
    );

    describe_counter!(
        "batches_completed_total",
        Unit::Count,
        "Total batches successfully completed and checkpointed"
    );

    describe_counter!(
        "retry_budget_exhausted_total",
        Unit::Count,
        "Times the per-batch retry budget was exhausted"
    );

    describe_counter!(
        "checkpoint_save_failures_total",
        Unit::Count,
        "Checkpoint writes that failed and were absorbed"
    );

    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Times one fetch attempt and records its classified outcome.
pub struct FetchTimer {
    started: Instant,
}

impl FetchTimer {
    /// Start timing a fetch attempt.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Record the attempt with its outcome label.
    pub fn record(self, outcome: &'static str) {
        let duration = self.started.elapsed();
        counter!("fetch_attempts_total", "outcome" => outcome).increment(1);
        histogram!("fetch_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
    }
}

/// Record a successfully completed and checkpointed batch.
pub fn record_batch_completed() {
    counter!("batches_completed_total").increment(1);
}

/// Record an exhausted retry budget.
pub fn record_retry_exhausted(mode: &'static str) {
    counter!("retry_budget_exhausted_total", "mode" => mode).increment(1);
}

/// Record an absorbed checkpoint write failure.
pub fn record_checkpoint_save_failure() {
    counter!("checkpoint_save_failures_total").increment(1);
}
