//! Command-line interface components
//!
//! This module contains CLI-specific code for the Nozomi Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{Cli, Commands, DatasetArgs, DownloadArgs, GlobalArgs, NetworkArgs, PostArgs};
pub use commands::{handle_dataset, handle_download, handle_init, handle_post};
pub use progress::ProgressDisplay;
