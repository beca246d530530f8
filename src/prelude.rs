//! Prelude module for Nozomi Fetcher Library
//!
//! Re-exports the items needed to build and download a dataset with a
//! single `use nozomi_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use nozomi_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = NozomiClient::new(&ClientConfig::default(), 2)?;
//!     let urls = TagResolver::new(client)
//!         .resolve_post_urls(&["cat_ears"], &[] as &[&str])
//!         .await?;
//!     println!("{} posts", urls.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Pipeline stages and their shared context
pub use crate::app::{
    ClientConfig, DatasetBuilder, DatasetLayout, DatasetManifest, MediaDownloader, NozomiClient,
    Post, PostFetcher, ProgressEvent, ProgressReporter, TagResolver,
};

// Configuration
pub use crate::config::AppConfig;
