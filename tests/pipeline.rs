//! End-to-end tests of the dataset pipeline against an in-memory board

mod common;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use common::{client, index_url, media_url, post_json, tombstone_json, FakeTransport};
use nozomi_fetcher::app::progress::{Phase, ProgressEvent, ProgressReporter};
use nozomi_fetcher::app::urls;
use nozomi_fetcher::app::{
    DatasetBuilder, DatasetLayout, DatasetManifest, MediaDownloader, Post, PostFetcher,
    RequestKind, TagResolver,
};
use nozomi_fetcher::errors::{AppError, FetchError};

const DATE: &str = "2022-02-20 10:00:00-05";
const NO_TAGS: &[&str] = &[];

fn builder(transport: &Arc<FakeTransport>, concurrency: usize) -> DatasetBuilder {
    DatasetBuilder::new(client(transport, concurrency), ProgressReporter::disabled())
}

/// Decoded post `id` with a single image served by `transport`
fn media_post(transport: &FakeTransport, id: u32, body: Vec<u8>) -> Post {
    let dataid = format!("m{}", id);
    transport.serve(media_url(&dataid), body);
    let json = post_json(id, &dataid, DATE, &["cat"]).to_string();
    Post::decode(&urls::post_url(id), json.as_bytes())
        .unwrap()
        .unwrap()
}

/// Board with tag `cat` on posts 101 and 102 (102 deleted)
fn cat_board() -> Arc<FakeTransport> {
    let transport = Arc::new(FakeTransport::new());
    transport.serve_index("cat", &[101, 102]);
    transport.serve_post(101, &post_json(101, "aaa101", DATE, &["cat", "smile"]));
    transport.serve_post(102, &tombstone_json(102));
    transport
}

/// Verifies that the result is the intersection of the positive indexes
/// minus the union of the negative ones, fetched with index headers.
#[tokio::test]
async fn test_positive_intersection_minus_negative_union() {
    let transport = Arc::new(FakeTransport::new());
    transport.serve_index("a", &[1, 2, 3]);
    transport.serve_index("b", &[2, 3, 4]);
    transport.serve_index("c", &[3]);

    let resolver = TagResolver::new(client(&transport, 4));
    let post_urls = resolver
        .resolve_post_urls(&["a", "b"], &["c"])
        .await
        .unwrap();

    assert_eq!(post_urls, vec![urls::post_url(2)]);
    assert_eq!(transport.request_count(), 3);
    assert!(transport
        .requests()
        .iter()
        .all(|request| request.kind == RequestKind::Index
            && request.header("Content-Type") == Some("arraybuffer")));
}

#[tokio::test]
async fn test_empty_positive_list_sends_nothing() {
    let transport = Arc::new(FakeTransport::new());
    let resolver = TagResolver::new(client(&transport, 1));

    let post_urls = resolver.resolve_post_urls(NO_TAGS, &["c"]).await.unwrap();
    assert!(post_urls.is_empty());

    let dir = TempDir::new().unwrap();
    let (_, posts) = builder(&transport, 1)
        .init_dataset(dir.path(), NO_TAGS, NO_TAGS, None, None)
        .await
        .unwrap();
    assert!(posts.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_tombstones_are_skipped() {
    let transport = cat_board();
    let dir = TempDir::new().unwrap();

    let (dataset, posts) = builder(&transport, 2)
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();

    assert_eq!(dataset, dir.path().join("cat"));
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].dataid, "aaa101");

    let manifest = DatasetManifest::load(&dataset).await.unwrap();
    assert_eq!(manifest.post_count, 1);
    assert_eq!(manifest.positive_tags, vec!["cat"]);
    assert!(manifest.negative_tags.is_empty());
    assert_eq!(manifest.start_date, None);
}

#[tokio::test]
async fn test_get_posts_without_dataset() {
    let transport = cat_board();
    transport.serve_index("smile", &[101, 102, 103]);

    let posts = builder(&transport, 2)
        .get_posts(&["cat"], &["smile"])
        .await
        .unwrap();
    assert!(posts.is_empty());

    let posts = builder(&transport, 2)
        .get_posts(&["cat", "smile"], NO_TAGS)
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].general_tag_line(), "cat smile");
}

/// Verifies that metadata fetches never exceed the configured slots.
#[tokio::test]
async fn test_limiter_bounds_requests_in_flight() {
    let transport = Arc::new(FakeTransport::with_delay(Duration::from_millis(20)));
    let ids: Vec<u32> = (100..110).collect();
    for &id in &ids {
        transport.serve_post(id, &post_json(id, &format!("d{}", id), DATE, &["cat"]));
    }

    let fetcher = PostFetcher::new(client(&transport, 2), ProgressReporter::disabled());
    let post_urls: Vec<String> = ids.iter().copied().map(urls::post_url).collect();
    let posts = fetcher.fetch_posts(&post_urls).await.unwrap();

    assert_eq!(posts.len(), 10);
    assert!(posts.iter().all(Option::is_some));
    assert_eq!(transport.request_count(), 10);
    assert!(transport.peak_in_flight() <= 2, "peak {}", transport.peak_in_flight());
    assert!(transport.peak_in_flight() >= 1);
}

/// Verifies that media downloads keep their slot while the body streams
/// and draw from the same pool as metadata requests running beside them.
#[tokio::test]
async fn test_media_downloads_share_the_limiter() {
    let transport = Arc::new(FakeTransport::with_delay(Duration::from_millis(10)));
    let posts: Vec<Post> = (200..210)
        .map(|id| media_post(&transport, id, vec![id as u8; 64]))
        .collect();
    let post_urls: Vec<String> = (300..310)
        .map(|id| {
            transport.serve_post(id, &post_json(id, &format!("d{}", id), DATE, &["cat"]));
            urls::post_url(id)
        })
        .collect();
    let dir = TempDir::new().unwrap();
    let client = client(&transport, 2);

    let downloader = MediaDownloader::new(client.clone(), ProgressReporter::disabled());
    let fetcher = PostFetcher::new(client.clone(), ProgressReporter::disabled());
    let (downloads, fetched) = tokio::join!(
        downloader.download_dataset(&posts, dir.path()),
        fetcher.fetch_posts(&post_urls)
    );

    assert_eq!(downloads.unwrap().len(), 10);
    assert_eq!(fetched.unwrap().len(), 10);
    assert_eq!(transport.request_count(), 20);
    assert_eq!(transport.peak_in_flight(), 2);
    assert_eq!(transport.in_flight(), 0);
    assert_eq!(client.limiter().available(), 2);
    assert_eq!(std::fs::read(dir.path().join("m205.jpg")).unwrap(), vec![205u8; 64]);
}

/// Verifies that a missing or zero content length still downloads the
/// whole body and reports progress without a total.
#[tokio::test]
async fn test_download_without_content_length() {
    let transport = Arc::new(FakeTransport::new());
    let unsized_post = media_post(&transport, 401, Vec::new());
    let zero_post = media_post(&transport, 402, Vec::new());
    transport.serve_with_length(media_url("m401"), vec![4u8; 1500], None);
    transport.serve_with_length(media_url("m402"), vec![2u8; 700], Some(0));
    let dir = TempDir::new().unwrap();
    let (progress, mut events) = ProgressReporter::channel();

    let downloads = MediaDownloader::new(client(&transport, 1), progress.clone())
        .download_dataset(&[unsized_post, zero_post], dir.path())
        .await
        .unwrap();
    drop(progress);

    assert_eq!(downloads.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("m401.jpg")).unwrap(), vec![4u8; 1500]);
    assert_eq!(std::fs::read(dir.path().join("m402.jpg")).unwrap(), vec![2u8; 700]);

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }
    assert!(received.contains(&ProgressEvent::MediaProgress {
        file: "m401.jpg".to_string(),
        written: 1500,
        total: None,
    }));
    assert!(received.contains(&ProgressEvent::MediaProgress {
        file: "m402.jpg".to_string(),
        written: 700,
        total: None,
    }));
}

#[tokio::test]
async fn test_results_follow_input_order() {
    let transport = Arc::new(FakeTransport::new());
    for id in [300, 200, 100] {
        transport.serve_post(id, &post_json(id, &format!("d{}", id), DATE, &["cat"]));
    }
    let fetcher = PostFetcher::new(client(&transport, 3), ProgressReporter::disabled());
    let post_urls: Vec<String> = [300, 200, 100].into_iter().map(urls::post_url).collect();

    let dataids: Vec<String> = fetcher
        .fetch_posts(&post_urls)
        .await
        .unwrap()
        .into_iter()
        .flatten()
        .map(|post| post.dataid)
        .collect();
    assert_eq!(dataids, vec!["d300", "d200", "d100"]);
}

/// Verifies calendar-date filtering and that a single bound is ignored.
#[tokio::test]
async fn test_date_window() {
    let transport = cat_board();
    let dir = TempDir::new().unwrap();
    let builder = builder(&transport, 1);

    let (_, inside) = builder
        .init_dataset(
            dir.path(),
            &["cat"],
            NO_TAGS,
            Some("2022-02-01"),
            Some("2022-02-28"),
        )
        .await
        .unwrap();
    assert_eq!(inside.len(), 1);

    let (_, after_end) = builder
        .init_dataset(
            dir.path(),
            &["cat"],
            NO_TAGS,
            Some("2022-02-01"),
            Some("2022-02-15"),
        )
        .await
        .unwrap();
    assert!(after_end.is_empty());

    // a lone bound disables filtering
    let (_, one_bound) = builder
        .init_dataset(dir.path(), &["cat"], NO_TAGS, Some("2022-03-01"), None)
        .await
        .unwrap();
    assert_eq!(one_bound.len(), 1);
}

#[tokio::test]
async fn test_bad_date_rejected_before_requests() {
    let transport = cat_board();
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 1)
        .init_dataset(
            dir.path(),
            &["cat"],
            NO_TAGS,
            Some("2022/02/01"),
            Some("2022-02-28"),
        )
        .await;

    assert!(matches!(result, Err(AppError::InvalidDateFormat { .. })));
    assert_eq!(transport.request_count(), 0);
    assert!(!dir.path().join("cat").exists());
}

#[tokio::test]
async fn test_bad_tag_rejected_before_requests() {
    let transport = cat_board();
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 1)
        .init_dataset(dir.path(), &["cat", "   "], NO_TAGS, None, None)
        .await;

    assert!(matches!(result, Err(AppError::InvalidTagFormat { .. })));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Verifies that initializing the same query again replaces the manifest
/// rather than appending to it.
#[tokio::test]
async fn test_rerun_overwrites_manifest() {
    let transport = cat_board();
    let dir = TempDir::new().unwrap();
    let builder = builder(&transport, 2);

    let (dataset, _) = builder
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();
    assert_eq!(DatasetManifest::load(&dataset).await.unwrap().post_count, 1);

    // post 102 is restored on the board
    transport.serve_post(102, &post_json(102, "bbb102", DATE, &["cat"]));
    let (again, posts) = builder
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();

    assert_eq!(again, dataset);
    assert_eq!(posts.len(), 2);
    let manifest = DatasetManifest::load(&dataset).await.unwrap();
    assert_eq!(manifest.post_count, 2);
    let ids: Vec<Option<u32>> = manifest.posts.iter().map(|post| post.postid).collect();
    assert_eq!(ids, vec![Some(101), Some(102)]);
}

/// Verifies that a failed metadata request aborts the run before any
/// manifest is written.
#[tokio::test]
async fn test_failed_fetch_aborts_without_manifest() {
    let transport = cat_board();
    transport.fail(urls::post_url(101));
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 2)
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Fetch(FetchError::ServerError { status: 500, .. }))
    ));
    assert!(!DatasetManifest::path_in(&dir.path().join("cat")).exists());
}

#[tokio::test]
async fn test_missing_post_is_not_found() {
    let transport = Arc::new(FakeTransport::new());
    transport.serve_index("cat", &[55]);
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 1)
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Fetch(FetchError::ServerError { status: 404, .. }))
    ));
}

#[tokio::test]
async fn test_malformed_index_propagates() {
    let transport = Arc::new(FakeTransport::new());
    transport.serve(index_url("cat"), vec![0u8; 5]);
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 1)
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await;

    assert!(matches!(result, Err(AppError::MalformedIndex { len: 5 })));
}

#[tokio::test]
async fn test_undecodable_post_is_an_error() {
    let transport = Arc::new(FakeTransport::new());
    transport.serve_index("cat", &[7]);
    transport.serve(urls::post_url(7), "<html>not json</html>");
    let dir = TempDir::new().unwrap();

    let result = builder(&transport, 1)
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await;

    assert!(matches!(result, Err(AppError::Decode { .. })));
}

#[tokio::test]
async fn test_fetch_single_post() {
    let transport = cat_board();
    let fetcher = PostFetcher::new(client(&transport, 1), ProgressReporter::disabled());

    let post = fetcher
        .fetch_post("https://nozomi.la/post/101.html")
        .await
        .unwrap();
    assert_eq!(post.dataid, "aaa101");
    assert_eq!(
        transport.requests()[0].url,
        "https://j.nozomi.la/post/1/10/101.json"
    );

    assert!(matches!(
        fetcher.fetch_post("https://nozomi.la/post/latest.html").await,
        Err(AppError::InvalidUrlFormat { .. })
    ));
    assert!(matches!(
        fetcher.fetch_post("https://nozomi.la/post/102.html").await,
        Err(AppError::Decode { .. })
    ));
    assert_eq!(transport.request_count(), 2);
}

/// Verifies that a download writes each image, its tag sidecar and
/// sends the browser header set.
#[tokio::test]
async fn test_download_writes_media_and_tags() {
    let transport = cat_board();
    transport.serve(media_url("aaa101"), vec![7u8; 3000]);
    let dir = TempDir::new().unwrap();
    let client = client(&transport, 2);

    let (dataset, posts) = DatasetBuilder::new(client.clone(), ProgressReporter::disabled())
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();
    let downloads = MediaDownloader::new(client, ProgressReporter::disabled())
        .download_dataset(&posts, &dataset)
        .await
        .unwrap();

    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].files, vec!["aaa101.jpg"]);
    assert_eq!(
        std::fs::read(dataset.join("aaa101.jpg")).unwrap(),
        vec![7u8; 3000]
    );
    assert_eq!(
        std::fs::read_to_string(dataset.join("aaa101.txt")).unwrap(),
        "cat smile"
    );

    let media_request = transport
        .requests()
        .into_iter()
        .find(|request| request.kind == RequestKind::Media)
        .unwrap();
    assert_eq!(media_request.header("Host"), Some("i.nozomi.la"));
    assert_eq!(media_request.header("Referer"), Some("https://nozomi.la/"));
    assert!(media_request
        .header("User-Agent")
        .is_some_and(|agent| agent.contains("Firefox/69.0")));
}

#[tokio::test]
async fn test_download_from_manifest_per_post() {
    let transport = cat_board();
    transport.serve(media_url("aaa101"), b"jpeg".to_vec());
    let dir = TempDir::new().unwrap();
    let client = client(&transport, 1);

    let (dataset, _) = DatasetBuilder::new(client.clone(), ProgressReporter::disabled())
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();
    let downloads = MediaDownloader::new(client, ProgressReporter::disabled())
        .with_layout(DatasetLayout::PerPost)
        .download_from_manifest(&dataset)
        .await
        .unwrap();

    let post_dir = dataset.join("aaa101");
    assert_eq!(downloads[0].directory, post_dir);
    assert_eq!(std::fs::read(post_dir.join("aaa101.jpg")).unwrap(), b"jpeg");
    assert!(post_dir.join("aaa101.txt").exists());
}

#[tokio::test]
async fn test_failed_media_aborts_download() {
    let transport = cat_board();
    transport.fail(media_url("aaa101"));
    let dir = TempDir::new().unwrap();
    let client = client(&transport, 1);

    let (dataset, posts) = DatasetBuilder::new(client.clone(), ProgressReporter::disabled())
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();
    let result = MediaDownloader::new(client, ProgressReporter::disabled())
        .download_dataset(&posts, &dataset)
        .await;

    assert!(matches!(result, Err(AppError::Fetch(_))));
    assert!(!dataset.join("aaa101.txt").exists());
}

#[tokio::test]
async fn test_progress_events() {
    let transport = cat_board();
    transport.serve(media_url("aaa101"), vec![1u8; 2500]);
    let dir = TempDir::new().unwrap();
    let (progress, mut events) = ProgressReporter::channel();
    let client = client(&transport, 2);

    let (dataset, posts) = DatasetBuilder::new(client.clone(), progress.clone())
        .init_dataset(dir.path(), &["cat"], NO_TAGS, None, None)
        .await
        .unwrap();
    MediaDownloader::new(client, progress.clone())
        .with_chunk_size(1024)
        .download_dataset(&posts, &dataset)
        .await
        .unwrap();
    drop(progress);

    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    assert!(received.contains(&ProgressEvent::PhaseStarted {
        phase: Phase::Fetch,
        total: 2
    }));
    assert!(received.contains(&ProgressEvent::PostFetched { completed: 2 }));
    assert!(received.contains(&ProgressEvent::MediaProgress {
        file: "aaa101.jpg".to_string(),
        written: 2500,
        total: Some(2500),
    }));
    assert!(received.contains(&ProgressEvent::PostDownloaded {
        dataid: "aaa101".to_string(),
        files: 1,
        completed: 1,
    }));
    assert_eq!(
        received.last(),
        Some(&ProgressEvent::PhaseFinished {
            phase: Phase::Download
        })
    );
}
