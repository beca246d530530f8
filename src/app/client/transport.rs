//! Transport abstraction
//!
//! The pipeline never talks to reqwest directly. It builds a [`Request`]
//! (URL plus header set) and hands it to a [`Transport`], which returns the
//! declared content length and a stream of body chunks.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};

use crate::app::urls;
use crate::constants::headers;
use crate::constants::limits::MAX_BODY_PREALLOCATION;
use crate::errors::FetchResult;

/// Stream of body chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = FetchResult<Vec<u8>>> + Send>>;

/// What a request is for; selects the header set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Binary tag index
    Index,
    /// Post metadata JSON
    Post,
    /// Image or video file
    Media,
}

/// A GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub kind: RequestKind,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Request for a tag index file
    pub fn index(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Index,
            headers: owned_headers(headers::INDEX),
        }
    }

    /// Request for post metadata
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RequestKind::Post,
            headers: Vec::new(),
        }
    }

    /// Request for a media file, with the browser header set
    pub fn media(url: impl Into<String>) -> Self {
        let url = url.into();
        let mut headers = Vec::with_capacity(headers::MEDIA.len() + 1);
        if let Some(host) = urls::host_of(&url) {
            headers.push(("Host".to_string(), host));
        }
        headers.extend(owned_headers(headers::MEDIA));
        Self {
            url,
            kind: RequestKind::Media,
            headers,
        }
    }

    /// Value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn owned_headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// A successful response
pub struct Response {
    /// Declared content length; `None` when absent
    pub content_length: Option<u64>,
    /// Body chunks
    pub body: BodyStream,
}

impl Response {
    /// Response whose body is a single in-memory chunk
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let content_length = Some(bytes.len() as u64);
        Self {
            content_length,
            body: Box::pin(stream::once(async move { Ok(bytes) })),
        }
    }

    /// Collect the whole body
    ///
    /// The declared length only sizes the initial buffer, up to
    /// `MAX_BODY_PREALLOCATION`; the body itself decides how much is read.
    pub async fn bytes(mut self) -> FetchResult<Vec<u8>> {
        let capacity = self
            .content_length
            .unwrap_or(0)
            .min(MAX_BODY_PREALLOCATION as u64) as usize;
        let mut buffer = Vec::with_capacity(capacity);
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// GET-with-headers capability; proxies are a property of the transport
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Issue a GET request; non-success statuses are errors
    async fn get(&self, request: &Request) -> FetchResult<Response>;
}
