//! Media and tag file downloads
//!
//! Each post is one unit of work: its media files are streamed to disk in
//! order, then its general tags are written to `<dataid>.txt`. Posts run
//! concurrently; every media request holds a limiter slot while its body is
//! being written. The first failing post ends the phase and drops the
//! remaining downloads.

use std::path::{Path, PathBuf};

use futures::stream::{FuturesUnordered, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, trace};

use crate::app::client::{NozomiClient, Request};
use crate::app::dataset::DatasetManifest;
use crate::app::models::Post;
use crate::app::progress::{Phase, ProgressReporter};
use crate::app::urls;
use crate::constants::dataset::TAG_FILE_EXTENSION;
use crate::constants::limits::MEDIA_CHUNK_SIZE;
use crate::errors::{AppError, FetchError, Result};

/// Where a post's files go inside the dataset directory
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DatasetLayout {
    /// Every file directly in the dataset directory
    #[default]
    Flat,
    /// One sub-directory per post, named by its data id
    PerPost,
}

/// Steps of one post's download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    FetchingMedia,
    WritingTags,
    Done,
}

/// Files written for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDownload {
    pub dataid: String,
    /// Directory the files were written to
    pub directory: PathBuf,
    /// Media file names, in post order
    pub files: Vec<String>,
    /// Path of the tag sidecar file
    pub tag_file: PathBuf,
}

/// Downloads post media and writes tag sidecar files
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: NozomiClient,
    progress: ProgressReporter,
    layout: DatasetLayout,
    chunk_size: usize,
}

impl MediaDownloader {
    pub fn new(client: NozomiClient, progress: ProgressReporter) -> Self {
        Self {
            client,
            progress,
            layout: DatasetLayout::default(),
            chunk_size: MEDIA_CHUNK_SIZE,
        }
    }

    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Size of the slices bodies are written in; zero is treated as one
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn layout(&self) -> DatasetLayout {
        self.layout
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Download media and tags for every post into `path`
    ///
    /// Returns one entry per post, in the order of `posts`.
    pub async fn download_dataset(&self, posts: &[Post], path: &Path) -> Result<Vec<PostDownload>> {
        info!("Downloading {} posts into {}", posts.len(), path.display());
        debug!("Layout {:?}, write chunk {} bytes", self.layout, self.chunk_size);
        self.progress.phase_started(Phase::Download, posts.len());

        let mut pending: FuturesUnordered<_> = posts
            .iter()
            .enumerate()
            .map(|(position, post)| async move {
                let download = self.download_post(post, path).await?;
                Ok::<_, AppError>((position, download))
            })
            .collect();

        let mut downloads: Vec<Option<PostDownload>> = vec![None; posts.len()];
        loop {
            match pending.try_next().await {
                Ok(Some((position, download))) => {
                    self.progress
                        .post_downloaded(&download.dataid, download.files.len());
                    downloads[position] = Some(download);
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Dataset download failed, abandoning remaining posts: {}", e);
                    return Err(e);
                }
            }
        }

        self.progress.phase_finished(Phase::Download);
        info!("Downloaded {} posts", posts.len());
        Ok(downloads.into_iter().flatten().collect())
    }

    /// Download the posts recorded in an existing dataset's manifest
    pub async fn download_from_manifest(&self, dataset_dir: &Path) -> Result<Vec<PostDownload>> {
        let manifest = DatasetManifest::load(dataset_dir).await?;
        info!(
            "Loaded manifest for {:?} with {} posts",
            manifest.positive_tags, manifest.post_count
        );
        self.download_dataset(&manifest.posts, dataset_dir).await
    }

    /// Download one post: all media in order, then its tag file
    pub async fn download_post(&self, post: &Post, path: &Path) -> Result<PostDownload> {
        let mut state = DownloadState::Pending;
        let directory = self.post_directory(post, path)?;
        trace!("Post {}: {:?}", post.dataid, state);

        state = DownloadState::FetchingMedia;
        trace!("Post {}: {:?}", post.dataid, state);
        let files = self.download_media(post, &directory).await?;

        state = DownloadState::WritingTags;
        trace!("Post {}: {:?}", post.dataid, state);
        let tag_file = self.write_tags(post, &directory).await?;

        state = DownloadState::Done;
        trace!("Post {}: {:?}", post.dataid, state);

        Ok(PostDownload {
            dataid: post.dataid.clone(),
            directory,
            files,
            tag_file,
        })
    }

    /// Download every media file of a post into `directory`
    ///
    /// Returns the file names written. The directory is created if needed.
    pub async fn download_media(&self, post: &Post, directory: &Path) -> Result<Vec<String>> {
        tokio::fs::create_dir_all(directory).await?;

        let mut written = Vec::with_capacity(post.imageurls.len());
        for url in post.media_urls() {
            let file_name = urls::media_file_name(&url)?;
            let destination = directory.join(&file_name);
            self.download_file(&url, &destination, &file_name).await?;
            written.push(file_name);
        }
        Ok(written)
    }

    /// Write the post's general tags, space separated, to `<dataid>.txt`
    pub async fn write_tags(&self, post: &Post, directory: &Path) -> Result<PathBuf> {
        check_dataid(post)?;
        let tag_path = directory.join(format!("{}.{}", post.dataid, TAG_FILE_EXTENSION));
        tokio::fs::write(&tag_path, post.general_tag_line())
            .await
            .map_err(|e| {
                error!("Failed to write tag file {}: {}", tag_path.display(), e);
                e
            })?;
        Ok(tag_path)
    }

    fn post_directory(&self, post: &Post, path: &Path) -> Result<PathBuf> {
        match self.layout {
            DatasetLayout::Flat => Ok(path.to_path_buf()),
            DatasetLayout::PerPost => {
                check_dataid(post)?;
                Ok(path.join(&post.dataid))
            }
        }
    }

    /// Stream one media file to disk; returns the bytes written
    async fn download_file(&self, url: &str, destination: &Path, file_name: &str) -> Result<u64> {
        let (_permit, mut response) = self.client.get_stream(&Request::media(url)).await?;
        let total = response.content_length.filter(|&len| len > 0);

        let mut file = File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.body.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Download of {} interrupted: {}", url, e);
                e
            })?;
            for piece in chunk.chunks(self.chunk_size) {
                file.write_all(piece).await.map_err(FetchError::Io)?;
                written += piece.len() as u64;
            }
            self.progress.media_progress(file_name, written, total);
        }
        file.flush().await.map_err(FetchError::Io)?;

        debug!("Image downloaded {} ({} bytes)", destination.display(), written);
        Ok(written)
    }
}

/// Reject data ids that would escape the dataset directory
fn check_dataid(post: &Post) -> Result<()> {
    let dataid = post.dataid.as_str();
    if dataid.is_empty() || dataid == "." || dataid == ".." || dataid.contains(['/', '\\']) {
        return Err(AppError::generic(format!(
            "Post data id {:?} cannot be used as a file name",
            dataid
        )));
    }
    Ok(())
}
