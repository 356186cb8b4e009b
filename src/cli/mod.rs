//! CLI layer: argument parsing and command dispatch

pub mod args;
pub mod banner;
pub mod commands;
pub mod error;
pub mod output;
pub mod progress;

pub use args::{Cli, Commands};
pub use error::{CliError, CliResult};
