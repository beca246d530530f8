//! Post metadata fetching
//!
//! Metadata fetches for a set of posts run concurrently inside the calling
//! task, each holding one limiter slot for its request. The first failure
//! ends the phase and drops the remaining fetches.

use futures::stream::{FuturesUnordered, TryStreamExt};
use tracing::{debug, error, info};

use crate::app::client::{NozomiClient, Request};
use crate::app::models::Post;
use crate::app::progress::{Phase, ProgressReporter};
use crate::app::urls;
use crate::errors::{AppError, Result};

/// Fetches and decodes post metadata
#[derive(Debug, Clone)]
pub struct PostFetcher {
    client: NozomiClient,
    progress: ProgressReporter,
}

impl PostFetcher {
    pub fn new(client: NozomiClient, progress: ProgressReporter) -> Self {
        Self { client, progress }
    }

    /// Retrieve a single post from its page or metadata URL
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrlFormat` if no post id can be parsed from `url`,
    /// `Fetch` on transport failure, and `Decode` if the body does not match
    /// the post schema or the post no longer exists.
    pub async fn fetch_post(&self, url: &str) -> Result<Post> {
        debug!("Retrieving a post from URL {:?}", url);
        let post_id = urls::parse_post_id(url)?;
        let post_url = urls::post_url(post_id);

        match self.fetch_metadata(&post_url).await? {
            Some(post) => Ok(post),
            None => Err(AppError::Decode {
                url: post_url,
                source: <serde_json::Error as serde::de::Error>::custom(format!(
                    "post {} has no date; it was deleted or is unavailable",
                    post_id
                )),
            }),
        }
    }

    /// Retrieve many posts concurrently
    ///
    /// The result is in the order of `post_urls`; tombstones are `None`.
    /// A progress event is emitted as each fetch completes.
    pub async fn fetch_posts(&self, post_urls: &[String]) -> Result<Vec<Option<Post>>> {
        info!("Fetching metadata for {} posts", post_urls.len());
        self.progress.phase_started(Phase::Fetch, post_urls.len());

        let mut pending: FuturesUnordered<_> = post_urls
            .iter()
            .enumerate()
            .map(|(position, url)| async move {
                let post = self.fetch_metadata(url).await?;
                Ok::<_, AppError>((position, post))
            })
            .collect();

        let mut posts: Vec<Option<Post>> = vec![None; post_urls.len()];
        loop {
            match pending.try_next().await {
                Ok(Some((position, post))) => {
                    self.progress.post_fetched();
                    posts[position] = post;
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Fetching post metadata failed, abandoning remaining fetches: {}", e);
                    return Err(e);
                }
            }
        }

        self.progress.phase_finished(Phase::Fetch);
        let found = posts.iter().filter(|post| post.is_some()).count();
        info!(
            "Fetched {} posts ({} missing)",
            found,
            post_urls.len() - found
        );
        Ok(posts)
    }

    /// Fetch and decode one metadata URL; `None` for tombstones
    async fn fetch_metadata(&self, post_url: &str) -> Result<Option<Post>> {
        let body = self.client.get_bytes(&Request::post(post_url)).await?;
        let post = Post::decode(post_url, &body).map_err(|e| {
            error!("Could not decode post metadata from {}: {}", post_url, e);
            e
        })?;
        if post.is_none() {
            debug!("Skipping missing post {}", post_url);
        }
        Ok(post)
    }
}
