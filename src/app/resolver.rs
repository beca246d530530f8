//! Tag resolution
//!
//! Resolves a tag query to post metadata URLs: each tag's `.nozomi` index is
//! fetched and decoded, positive id-sets are intersected, the union of
//! negative id-sets is subtracted, and the survivors are mapped to URLs in
//! ascending id order.

use std::collections::{BTreeSet, HashSet};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::app::client::{NozomiClient, Request};
use crate::app::index::decode_post_ids;
use crate::app::tags::{sanitize_tag, sanitize_tags, Tag};
use crate::app::urls;
use crate::errors::Result;

/// Resolves tags to post ids through the board's index files
#[derive(Debug, Clone)]
pub struct TagResolver {
    client: NozomiClient,
}

impl TagResolver {
    pub fn new(client: NozomiClient) -> Self {
        Self { client }
    }

    /// Post ids carrying a raw (unsanitized) tag
    ///
    /// # Errors
    ///
    /// Returns `InvalidTagFormat` for a bad tag, `Fetch` if the index cannot
    /// be retrieved and `MalformedIndex` if it cannot be decoded.
    pub async fn resolve_ids(&self, tag: &str) -> Result<HashSet<u32>> {
        let tag = sanitize_tag(tag)?;
        self.resolve_tag_ids(&tag).await
    }

    /// Post ids carrying a sanitized tag
    pub async fn resolve_tag_ids(&self, tag: &Tag) -> Result<HashSet<u32>> {
        let url = urls::tag_index_url(tag);
        debug!("Getting post IDs from {}", url);

        let bytes = self.client.get_bytes(&Request::index(url.as_str())).await?;
        let ids = decode_post_ids(&bytes).map_err(|e| {
            tracing::error!("Index for tag {} is unusable: {}", tag, e);
            e
        })?;

        debug!("Unpacked {} post ids for tag {}", ids.len(), tag);
        Ok(ids.into_iter().collect())
    }

    /// Ids of posts carrying every positive tag and no negative tag
    ///
    /// All index fetches run concurrently, bounded by the shared limiter.
    pub async fn resolve_post_ids(&self, positive: &[Tag], negative: &[Tag]) -> Result<BTreeSet<u32>> {
        if positive.is_empty() {
            return Ok(BTreeSet::new());
        }

        debug!(
            "Retrieving posts with positive_tags={:?} and negative_tags={:?}",
            positive, negative
        );

        let positive_sets = try_join_all(positive.iter().map(|tag| self.resolve_tag_ids(tag)));
        let negative_sets = try_join_all(negative.iter().map(|tag| self.resolve_tag_ids(tag)));
        let (positive_sets, negative_sets) = futures::try_join!(positive_sets, negative_sets)?;

        let relevant = relevant_ids(positive_sets, negative_sets);
        info!("Resolved {} relevant posts", relevant.len());
        Ok(relevant)
    }

    /// Metadata URLs of posts carrying every positive tag and no negative
    /// tag, in ascending post id order
    ///
    /// An empty positive list resolves to no posts without any request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTagFormat` before any request if a tag is invalid.
    pub async fn resolve_post_urls<S: AsRef<str>>(
        &self,
        positive: &[S],
        negative: &[S],
    ) -> Result<Vec<String>> {
        if positive.is_empty() {
            return Ok(Vec::new());
        }

        let positive = sanitize_tags(positive)?;
        let negative = sanitize_tags(negative)?;
        let ids = self.resolve_post_ids(&positive, &negative).await?;

        Ok(ids.into_iter().map(urls::post_url).collect())
    }
}

/// `(∩ positive) − (∪ negative)`; empty when there are no positive sets
pub fn relevant_ids(positive: Vec<HashSet<u32>>, negative: Vec<HashSet<u32>>) -> BTreeSet<u32> {
    let mut sets = positive.into_iter();
    let Some(first) = sets.next() else {
        return BTreeSet::new();
    };
    let intersection = sets.fold(first, |acc, set| acc.intersection(&set).copied().collect());

    let excluded: HashSet<u32> = negative.into_iter().flatten().collect();
    intersection
        .into_iter()
        .filter(|id| !excluded.contains(id))
        .collect()
}
