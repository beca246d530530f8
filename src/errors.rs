//! Error types for Nozomi Fetcher
//!
//! This module defines the error taxonomy for every stage of the pipeline:
//! input validation (tags, urls, dates), index decoding, transport failures,
//! metadata decoding and dataset persistence. Validation errors abort an
//! operation before any network or disk work happens.

use std::path::PathBuf;

use thiserror::Error;

/// Transport-level errors raised while talking to the board
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Proxy URL rejected by the HTTP client
    #[error("Invalid proxy: {proxy} - {error}")]
    InvalidProxy { proxy: String, error: String },

    /// I/O error while streaming a body to disk
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading or writing the dataset manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// JSON encoding or parsing error
    #[error("JSON error in manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading or writing the manifest
    #[error("I/O error on manifest: {0}")]
    Io(#[from] std::io::Error),

    /// Stored post count disagrees with the stored posts
    #[error("Manifest post_count is {declared} but {actual} posts are stored")]
    CountMismatch { declared: usize, actual: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading the configuration file
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Tag string empty or containing disallowed characters
    #[error("Invalid tag format: {tag:?} ({reason})")]
    InvalidTagFormat { tag: String, reason: String },

    /// Post id could not be extracted from a URL
    #[error("Invalid post URL format: {url}")]
    InvalidUrlFormat { url: String },

    /// Date or timestamp string could not be parsed
    #[error("Invalid date format: {value:?}, expected {expected}")]
    InvalidDateFormat { value: String, expected: String },

    /// Index byte length is not a multiple of four
    #[error("Malformed index: {len} bytes is not a multiple of 4")]
    MalformedIndex { len: usize },

    /// Transport failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Response body is not valid JSON or does not match the post schema
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create an invalid tag error
    pub fn invalid_tag(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTagFormat {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid date error
    pub fn invalid_date(value: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidDateFormat {
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// True for errors raised by input validation, before any I/O
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidTagFormat { .. }
                | AppError::InvalidUrlFormat { .. }
                | AppError::InvalidDateFormat { .. }
                | AppError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::InvalidTagFormat { .. } => "tag",
            AppError::InvalidUrlFormat { .. } => "url",
            AppError::InvalidDateFormat { .. } => "date",
            AppError::MalformedIndex { .. } => "index",
            AppError::Fetch(_) => "fetch",
            AppError::Decode { .. } => "decode",
            AppError::Manifest(_) => "manifest",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;
