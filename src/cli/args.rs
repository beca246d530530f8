//! Command-line argument parsing for Nozomi Fetcher
//!
//! This module defines the CLI structure using clap derive macros. Dataset
//! flags keep their historical snake_case spelling (`--positive_tags`,
//! `--num_process`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::DatasetLayout;
use crate::config::ConfigOverrides;

/// Nozomi Fetcher - build tagged image datasets from nozomi.la
#[derive(Parser, Debug)]
#[command(
    name = "nozomi_fetcher",
    version,
    about = "Build tagged image datasets from the nozomi.la board",
    long_about = "Resolves tag queries against nozomi.la, fetches the matching post metadata \
into a dataset manifest and downloads every image with a tag sidecar file."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a dataset and download its media
    Dataset(DatasetArgs),

    /// Initialize a dataset manifest without downloading media
    Init(DatasetArgs),

    /// Download media for an existing dataset
    Download(DownloadArgs),

    /// Fetch one post and print its metadata as JSON
    Post(PostArgs),
}

/// Arguments describing a dataset query
#[derive(Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Directory the dataset is created in
    #[arg(long, value_name = "DIR")]
    pub path: PathBuf,

    /// Tags every post must carry
    #[arg(long = "positive_tags", num_args = 1.., required = true, value_name = "TAG")]
    pub positive_tags: Vec<String>,

    /// Tags no post may carry
    #[arg(long = "negative_tags", num_args = 0.., value_name = "TAG")]
    pub negative_tags: Vec<String>,

    /// Start filter date (YYYY-MM-DD)
    #[arg(long = "start_date", value_name = "DATE")]
    pub start_date: Option<String>,

    /// End filter date (YYYY-MM-DD)
    #[arg(long = "end_date", value_name = "DATE")]
    pub end_date: Option<String>,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// File placement inside the dataset directory
    #[arg(long, value_enum)]
    pub layout: Option<DatasetLayout>,
}

/// Arguments for downloading an initialized dataset
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Dataset directory containing metadata.json
    #[arg(long, value_name = "DIR")]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// File placement inside the dataset directory
    #[arg(long, value_enum)]
    pub layout: Option<DatasetLayout>,
}

/// Arguments for fetching a single post
#[derive(Args, Debug, Clone)]
pub struct PostArgs {
    /// Post page or metadata URL
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Request settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Number of concurrent requests
    #[arg(long = "num_process", value_name = "N")]
    pub num_process: Option<usize>,

    /// Proxy to use for every request
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,
}

impl NetworkArgs {
    /// Overrides applied on top of the loaded configuration
    pub fn overrides(&self, layout: Option<DatasetLayout>) -> ConfigOverrides {
        ConfigOverrides {
            concurrency: self.num_process,
            proxy: self.proxy.clone(),
            layout,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    ///
    /// Returns `None` when no flag is given, leaving the choice to the
    /// configuration file.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
