//! Application constants for Nozomi Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Board endpoints and URL conventions
pub mod nozomi {
    /// Host serving tag indexes and post metadata
    pub const DATA_BASE_URL: &str = "https://j.nozomi.la";

    /// Path prefix of tag index files
    pub const INDEX_PATH: &str = "nozomi";

    /// Extension of tag index files
    pub const INDEX_EXTENSION: &str = "nozomi";

    /// Path prefix of post metadata files
    pub const POST_PATH: &str = "post";

    /// Host serving still images
    pub const IMAGE_HOST: &str = "i.nozomi.la";

    /// Host serving videos
    pub const VIDEO_HOST: &str = "v.nozomi.la";

    /// Referer expected by the media hosts
    pub const REFERER: &str = "https://nozomi.la/";
}

/// Request header sets
pub mod headers {
    /// Headers sent with tag index requests
    pub const INDEX: &[(&str, &str)] = &[
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Content-Type", "arraybuffer"),
    ];

    /// Browser-mimicking headers sent with media requests.
    /// `Host` is filled in from the media URL.
    pub const MEDIA: &[(&str, &str)] = &[
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:69.0) Gecko/20100101 Firefox/69.0",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,/;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("DNT", "1"),
        ("Connection", "keep-alive"),
        ("Referer", super::nozomi::REFERER),
        ("Upgrade-Insecure-Requests", "1"),
        ("TE", "Trailers"),
        ("Pragma", "no-cache"),
        ("Cache-Control", "no-cache"),
    ];
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for index and metadata requests
    pub const USER_AGENT: &str = concat!("nozomi-fetcher/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 25;
}

/// Concurrency and streaming limits
pub mod limits {
    /// Default number of concurrent requests
    pub const DEFAULT_CONCURRENCY: usize = 1;

    /// Size of the slices media bodies are written in
    pub const MEDIA_CHUNK_SIZE: usize = 1024;

    /// Width of one index entry in bytes
    pub const INDEX_ENTRY_WIDTH: usize = 4;

    /// Upper bound on the buffer reserved from a declared content length
    pub const MAX_BODY_PREALLOCATION: usize = 1 << 20;
}

/// Dataset layout on disk
pub mod dataset {
    /// Separator joining positive tags into the dataset directory name
    pub const NAME_DELIMITER: &str = "__";

    /// Manifest file name
    pub const MANIFEST_FILE: &str = "metadata.json";

    /// Extension of tag sidecar files
    pub const TAG_FILE_EXTENSION: &str = "txt";

    /// Manifest indentation
    pub const MANIFEST_INDENT: &[u8] = b"   ";

    /// Format of user supplied date bounds
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Format of post timestamps after the offset token is dropped
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file
    pub const LOCAL_FILE: &str = "nozomi-fetcher.toml";

    /// Directory under the user config dir
    pub const APP_DIR: &str = "nozomi-fetcher";

    /// File name under the user config dir
    pub const USER_FILE: &str = "config.toml";
}
