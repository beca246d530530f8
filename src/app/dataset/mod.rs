//! Dataset assembly
//!
//! Turns a tag query into a dataset directory: validates the query and
//! date bounds, resolves and fetches every relevant post, applies the date
//! window and writes `metadata.json`. Media are downloaded separately by
//! [`crate::app::downloader::MediaDownloader`].

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::app::client::NozomiClient;
use crate::app::fetcher::PostFetcher;
use crate::app::models::Post;
use crate::app::progress::{Phase, ProgressReporter};
use crate::app::resolver::TagResolver;
use crate::app::tags::TagQuery;
use crate::app::urls;
use crate::errors::Result;

pub mod filter;
pub mod manifest;

pub use filter::DateRange;
pub use manifest::DatasetManifest;

/// Builds datasets from tag queries
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    resolver: TagResolver,
    fetcher: PostFetcher,
    progress: ProgressReporter,
}

impl DatasetBuilder {
    pub fn new(client: NozomiClient, progress: ProgressReporter) -> Self {
        Self {
            resolver: TagResolver::new(client.clone()),
            fetcher: PostFetcher::new(client, progress.clone()),
            progress,
        }
    }

    /// Initialize a dataset and write its manifest
    ///
    /// Returns the dataset directory and the posts to download. Re-running
    /// on an existing directory replaces its manifest.
    ///
    /// # Errors
    ///
    /// Validation errors (`InvalidDateFormat`, `InvalidTagFormat`) are
    /// raised before any directory is created or request is sent. Fetch and
    /// decode failures abort the run without writing a manifest.
    pub async fn init_dataset<S: AsRef<str>>(
        &self,
        path: &Path,
        positive_tags: &[S],
        negative_tags: &[S],
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<(PathBuf, Vec<Post>)> {
        let range = DateRange::parse(start_date, end_date)?;
        let query = TagQuery::new(positive_tags, negative_tags)?;

        let dataset_path = path.join(query.dataset_name());
        tokio::fs::create_dir_all(&dataset_path).await.map_err(|e| {
            error!(
                "Cannot create dataset directory {}: {}",
                dataset_path.display(),
                e
            );
            e
        })?;
        info!("Initializing dataset at {}", dataset_path.display());

        let mut posts = Vec::new();
        for post in self.fetch_query(&query).await? {
            if range.includes(&post)? {
                posts.push(post);
            }
        }
        info!(
            "{} posts kept{}",
            posts.len(),
            if range.is_bounded() {
                " after date filtering"
            } else {
                ""
            }
        );

        let manifest = DatasetManifest::new(
            to_strings(positive_tags),
            to_strings(negative_tags),
            start_date.map(str::to_string),
            end_date.map(str::to_string),
            posts.clone(),
        );
        manifest.write(&dataset_path).await?;

        Ok((dataset_path, posts))
    }

    /// Resolve a tag query and fetch every existing post
    ///
    /// Posts are in ascending id order; tombstones are dropped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTagFormat` before any request for a bad tag; fetch
    /// and decode failures abort the whole query.
    pub async fn get_posts<S: AsRef<str>>(&self, positive: &[S], negative: &[S]) -> Result<Vec<Post>> {
        let query = TagQuery::new(positive, negative)?;
        self.fetch_query(&query).await
    }

    async fn fetch_query(&self, query: &TagQuery) -> Result<Vec<Post>> {
        self.progress
            .phase_started(Phase::Resolve, query.positive.len() + query.negative.len());
        let ids = self
            .resolver
            .resolve_post_ids(&query.positive, &query.negative)
            .await?;
        self.progress.phase_finished(Phase::Resolve);

        let post_urls: Vec<String> = ids.into_iter().map(urls::post_url).collect();
        let fetched = self.fetcher.fetch_posts(&post_urls).await?;
        Ok(fetched.into_iter().flatten().collect())
    }
}

fn to_strings<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|v| v.as_ref().to_string()).collect()
}
