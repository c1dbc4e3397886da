//! Fetch classification and termination decisions.
//!
//! Both policies are pure functions so the loop's failure handling can be
//! tested without a fetcher or a clock.

use chrono::{NaiveDate, NaiveDateTime};

use crate::fetcher::{BatchResult, FetcherError, FetcherResult};

/// Classification of one fetch attempt.
#[derive(Debug)]
pub enum FetchClass {
    /// Usable page summary; the checkpoint may advance.
    Success(BatchResult),
    /// The workflow replied but every output field was absent. Treated as a
    /// transient server-side fault and retried on the same cursor.
    RemoteInternalError,
    /// Network, timeout, or HTTP-level failure. Shares the retry budget with
    /// [`FetchClass::RemoteInternalError`].
    TransportError(FetcherError),
}

impl FetchClass {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FetchClass::Success(_) => "success",
            FetchClass::RemoteInternalError => "remote_internal_error",
            FetchClass::TransportError(_) => "transport_error",
        }
    }
}

/// Classify a fetch attempt into exactly one outcome.
pub fn classify(result: FetcherResult<BatchResult>) -> FetchClass {
    match result {
        Ok(batch) if batch.is_internal_error() => FetchClass::RemoteInternalError,
        Ok(batch) => FetchClass::Success(batch),
        Err(e) => FetchClass::TransportError(e),
    }
}

/// Why (or whether) the backward walk is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// More history remains.
    Continue,
    /// The batch's oldest message is at or before the configured lower
    /// bound.
    LowerBoundReached,
    /// The remote returned no continuation cursor.
    CursorExhausted,
}

impl Termination {
    /// Whether this decision ends the harvest.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Termination::Continue)
    }
}

/// Evaluate termination after a successful batch.
///
/// Both checks run after every batch; either alone is sufficient. The lower
/// bound wins the tie purely so the log line names the more informative
/// reason.
pub fn evaluate(batch: &BatchResult, lower_bound: Option<&str>) -> Termination {
    if reached_lower_bound(batch.oldest_dt.as_deref(), lower_bound) {
        return Termination::LowerBoundReached;
    }
    if batch.continuation().is_none() {
        return Termination::CursorExhausted;
    }
    Termination::Continue
}

/// Whether `oldest_dt` is at or before the configured bound date.
///
/// `oldest_dt` uses `YYYY-MM-DD HH:MM:SS`; the bound is a date, compared at
/// midnight, and accepts non-zero-padded components (`2024-1-1`). An absent
/// or unparseable value on either side means "no bound reached".
fn reached_lower_bound(oldest_dt: Option<&str>, bound: Option<&str>) -> bool {
    let (Some(oldest_dt), Some(bound)) = (oldest_dt, bound) else {
        return false;
    };
    let Ok(oldest) = NaiveDateTime::parse_from_str(oldest_dt, "%Y-%m-%d %H:%M:%S") else {
        return false;
    };
    let Ok(bound_date) = NaiveDate::parse_from_str(bound, "%Y-%m-%d") else {
        return false;
    };
    let Some(bound_midnight) = bound_date.and_hms_opt(0, 0, 0) else {
        return false;
    };
    oldest <= bound_midnight
}
