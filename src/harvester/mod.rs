//! Harvest orchestration.
//!
//! This module owns the polling loop that walks a channel's history backward
//! in time:
//!
//! 1. **Load**: read the checkpoint, or start from the most recent page
//! 2. **Fetch**: one page per cycle through a [`crate::fetcher::PageFetcher`]
//! 3. **Classify**: success, remote internal error, or transport failure
//!    ([`policy`])
//! 4. **Advance or retry**: the checkpoint moves only after a success
//! 5. **Wait**: cancellable sleeps between batches and between retries
//!
//! Transient failures are retried in place with a fixed delay; an exhausted
//! retry budget aborts a single-batch run but only defers a continuous run
//! to its next scheduled cycle.

pub mod executor;
pub mod policy;

pub use executor::{Harvester, HarvestOutcome, RunMode};
pub use policy::{FetchClass, Termination};

/// Harvest errors
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// The retry budget for one batch was exhausted in single-batch mode
    #[error("retry budget exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Total fetch attempts made for the batch
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },
}
