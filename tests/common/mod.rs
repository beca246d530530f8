//! Shared fixtures for integration tests
//!
//! [`FakeTransport`] serves canned bodies from memory, records every
//! request and tracks how many requests were in flight at once. A request
//! stays in flight until its body stream has been drained or dropped.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};

use nozomi_fetcher::app::limiter::ConcurrencyLimiter;
use nozomi_fetcher::app::tags::Tag;
use nozomi_fetcher::app::urls;
use nozomi_fetcher::app::{NozomiClient, Request, Response, Transport};
use nozomi_fetcher::errors::{FetchError, FetchResult};

/// Canned answer for one URL
#[derive(Debug, Clone)]
struct Served {
    body: Vec<u8>,
    content_length: Option<u64>,
}

/// Decrements the in-flight counter when the body is finished
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory board
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, Served>>,
    failures: Mutex<HashSet<String>>,
    requests: Mutex<Vec<Request>>,
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
    delay: Duration,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request sleeps for `delay` before answering, and again
    /// between the two halves of its body
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        let body = body.into();
        let content_length = Some(body.len() as u64);
        self.serve_with_length(url, body, content_length);
    }

    /// Serve `body` while declaring `content_length` instead of its size
    pub fn serve_with_length(
        &self,
        url: impl Into<String>,
        body: impl Into<Vec<u8>>,
        content_length: Option<u64>,
    ) {
        self.responses.lock().unwrap().insert(
            url.into(),
            Served {
                body: body.into(),
                content_length,
            },
        );
    }

    /// Serve a tag index holding `ids` as big-endian u32s
    pub fn serve_index(&self, tag: &str, ids: &[u32]) {
        let body: Vec<u8> = ids.iter().flat_map(|id| id.to_be_bytes()).collect();
        self.serve(index_url(tag), body);
    }

    pub fn serve_post(&self, id: u32, body: &Value) {
        self.serve(urls::post_url(id), body.to_string());
    }

    /// Answer `url` with HTTP 500
    pub fn fail(&self, url: impl Into<String>) {
        self.failures.lock().unwrap().insert(url.into());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, request: &Request) -> FetchResult<Response> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(self.in_flight.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let status = if self.failures.lock().unwrap().contains(&request.url) {
            500
        } else {
            404
        };
        let served = self.responses.lock().unwrap().get(&request.url).cloned();
        let served = match served {
            Some(served) if status != 500 => served,
            _ => {
                return Err(FetchError::ServerError {
                    status,
                    url: request.url.clone(),
                })
            }
        };

        let half = served.body.len().div_ceil(2).max(1);
        let chunks: Vec<Vec<u8>> = served.body.chunks(half).map(<[u8]>::to_vec).collect();
        let delay = self.delay;
        let body = stream::unfold(
            (chunks.into_iter(), guard, false),
            move |(mut chunks, guard, started)| async move {
                let chunk = chunks.next()?;
                if started && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Some((Ok(chunk), (chunks, guard, true)))
            },
        );

        Ok(Response {
            content_length: served.content_length,
            body: Box::pin(body),
        })
    }
}

/// Client over `transport` with `concurrency` request slots
pub fn client(transport: &Arc<FakeTransport>, concurrency: usize) -> NozomiClient {
    NozomiClient::with_transport(
        transport.clone(),
        ConcurrencyLimiter::new(concurrency).unwrap(),
    )
}

pub fn index_url(tag: &str) -> String {
    urls::tag_index_url(&Tag::parse(tag).unwrap())
}

/// URL the fake serves a post's single image from
pub fn media_url(dataid: &str) -> String {
    format!("https://i.nozomi.la/{}.jpg", dataid)
}

/// Post metadata with one protocol-relative image
pub fn post_json(id: u32, dataid: &str, date: &str, tags: &[&str]) -> Value {
    let general: Vec<Value> = tags.iter().map(|tag| json!({ "tag": tag })).collect();
    json!({
        "postid": id,
        "dataid": dataid,
        "date": date,
        "general": general,
        "imageurls": [
            { "imageurl": format!("//i.nozomi.la/{}.jpg", dataid), "type": "jpg" }
        ]
    })
}

pub fn tombstone_json(id: u32) -> Value {
    json!({ "postid": id, "date": null })
}
