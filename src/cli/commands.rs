//! Command handlers for Nozomi Fetcher CLI
//!
//! This module implements the command handlers that connect parsed
//! arguments and the loaded configuration to the dataset pipeline.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::app::{
    DatasetBuilder, MediaDownloader, NozomiClient, PostDownload, PostFetcher, ProgressReporter,
};
use crate::cli::{DatasetArgs, DownloadArgs, PostArgs, ProgressDisplay};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the dataset command: initialize, then download everything
pub async fn handle_dataset(args: DatasetArgs, config: AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let config = config.apply_overrides(args.network.overrides(args.layout))?;
    let client = build_client(&config)?;
    let (progress, display) = start_progress(&config);

    let result: Result<(PathBuf, usize, Vec<PostDownload>)> = async {
        let (dataset_path, posts) = initialize(&client, &progress, &args).await?;
        let downloads = downloader(&client, &progress, &config)
            .download_dataset(&posts, &dataset_path)
            .await?;
        Ok((dataset_path, posts.len(), downloads))
    }
    .await;
    stop_progress(progress, display).await;

    let (dataset_path, post_count, downloads) = result?;
    info!("Dataset command completed in {:?}", start_time.elapsed());
    println!("Dataset ready: {}", dataset_path.display());
    println!("   Posts: {}", post_count);
    println!("   Media files: {}", media_count(&downloads));
    Ok(())
}

/// Handle the init command: write the manifest only
pub async fn handle_init(args: DatasetArgs, config: AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let config = config.apply_overrides(args.network.overrides(args.layout))?;
    let client = build_client(&config)?;
    let (progress, display) = start_progress(&config);

    let result = initialize(&client, &progress, &args).await;
    stop_progress(progress, display).await;

    let (dataset_path, posts) = result?;
    info!("Init command completed in {:?}", start_time.elapsed());
    if posts.is_empty() {
        warn!("No posts matched the query");
    }
    println!(
        "Initialized {} with {} posts",
        dataset_path.display(),
        posts.len()
    );
    Ok(())
}

/// Handle the download command for an existing dataset
pub async fn handle_download(args: DownloadArgs, config: AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let config = config.apply_overrides(args.network.overrides(args.layout))?;
    let client = build_client(&config)?;
    let (progress, display) = start_progress(&config);

    let result = downloader(&client, &progress, &config)
        .download_from_manifest(&args.dataset)
        .await;
    stop_progress(progress, display).await;

    let downloads = result?;
    info!("Download command completed in {:?}", start_time.elapsed());
    println!(
        "Downloaded {} posts ({} media files) into {}",
        downloads.len(),
        media_count(&downloads),
        args.dataset.display()
    );
    Ok(())
}

/// Handle the post command: print one post's metadata
pub async fn handle_post(args: PostArgs, config: AppConfig) -> Result<()> {
    let config = config.apply_overrides(args.network.overrides(None))?;
    let client = build_client(&config)?;

    let post = PostFetcher::new(client, ProgressReporter::disabled())
        .fetch_post(&args.url)
        .await?;
    let json = serde_json::to_string_pretty(&post)
        .map_err(|e| AppError::generic(format!("Cannot render post {}: {}", post.dataid, e)))?;
    println!("{}", json);
    Ok(())
}

async fn initialize(
    client: &NozomiClient,
    progress: &ProgressReporter,
    args: &DatasetArgs,
) -> Result<(PathBuf, Vec<crate::app::Post>)> {
    info!(
        "Building dataset for +{:?} -{:?}",
        args.positive_tags, args.negative_tags
    );
    DatasetBuilder::new(client.clone(), progress.clone())
        .init_dataset(
            &args.path,
            &args.positive_tags,
            &args.negative_tags,
            args.start_date.as_deref(),
            args.end_date.as_deref(),
        )
        .await
}

fn build_client(config: &AppConfig) -> Result<NozomiClient> {
    NozomiClient::new(&config.to_client_config(), config.fetch.concurrency)
}

fn downloader(
    client: &NozomiClient,
    progress: &ProgressReporter,
    config: &AppConfig,
) -> MediaDownloader {
    MediaDownloader::new(client.clone(), progress.clone())
        .with_layout(config.fetch.layout)
        .with_chunk_size(config.fetch.chunk_size)
}

fn start_progress(config: &AppConfig) -> (ProgressReporter, Option<ProgressDisplay>) {
    if !config.fetch.progress {
        return (ProgressReporter::disabled(), None);
    }
    let (reporter, events) = ProgressReporter::channel();
    (reporter, Some(ProgressDisplay::start(events, true)))
}

async fn stop_progress(progress: ProgressReporter, display: Option<ProgressDisplay>) {
    drop(progress);
    if let Some(display) = display {
        display.finish().await;
    }
}

fn media_count(downloads: &[PostDownload]) -> usize {
    downloads.iter().map(|d| d.files.len()).sum()
}
