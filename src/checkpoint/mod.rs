//! Checkpoint persistence for resumable harvests.
//!
//! The checkpoint file is the only durable state this tool owns. It records
//! how far the backward walk has progressed so an interrupted run picks up
//! at the same page instead of re-reading or skipping history.

pub mod state;

pub use state::{CheckpointError, CheckpointState, CheckpointStore};
