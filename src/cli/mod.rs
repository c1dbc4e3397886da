//! CLI command implementations

pub mod error;
pub mod harvest;

pub use error::CliError;
pub use harvest::{Cli, Commands, RunArgs, StateArgs};
