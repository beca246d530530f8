//! Core application logic for Nozomi Fetcher
//!
//! This module contains the tag-resolution and concurrent-fetch pipeline:
//! index decoding, tag resolution, post fetching, dataset assembly and
//! media download, all sharing one client and its concurrency limiter.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use nozomi_fetcher::app::{ClientConfig, DatasetBuilder, MediaDownloader, NozomiClient};
//! use nozomi_fetcher::app::progress::ProgressReporter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NozomiClient::new(&ClientConfig::default(), 4)?;
//! let progress = ProgressReporter::disabled();
//!
//! let builder = DatasetBuilder::new(client.clone(), progress.clone());
//! let (dataset, posts) = builder
//!     .init_dataset(Path::new("datasets"), &["cat_ears"], &["monochrome"], None, None)
//!     .await?;
//!
//! MediaDownloader::new(client, progress)
//!     .download_dataset(&posts, &dataset)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dataset;
pub mod downloader;
pub mod fetcher;
pub mod index;
pub mod limiter;
pub mod models;
pub mod progress;
pub mod resolver;
pub mod tags;
pub mod urls;

// Re-export main public API
pub use client::{ClientConfig, NozomiClient, Request, RequestKind, Response, Transport};
pub use dataset::{DatasetBuilder, DatasetManifest, DateRange};
pub use downloader::{DatasetLayout, DownloadState, MediaDownloader, PostDownload};
pub use fetcher::PostFetcher;
pub use index::decode_post_ids;
pub use limiter::ConcurrencyLimiter;
pub use models::{MediaMetaData, Post, TagEntry};
pub use progress::{Phase, ProgressEvent, ProgressReporter};
pub use resolver::TagResolver;
pub use tags::{sanitize_tag, Tag, TagQuery};
