//! reqwest-backed transport
//!
//! Sends requests through one shared `reqwest::Client` and exposes the
//! response body as a chunk stream, so media can be written to disk as it
//! arrives.

use async_trait::async_trait;
use futures::stream;
use reqwest::Client;

use super::transport::{Request, Response, Transport};
use crate::errors::{FetchError, FetchResult};

/// HTTP transport over reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> FetchResult<Response> {
        let mut builder = self.client.get(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("GET {} returned HTTP {}", request.url, status.as_u16());
            return Err(FetchError::ServerError {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        tracing::debug!("Successfully fetched response: {}", request.url);

        let content_length = response.content_length();
        let body = stream::unfold(Some(response), |state| async move {
            let mut response = state?;
            match response.chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk.to_vec()), Some(response))),
                Ok(None) => None,
                Err(e) => Some((Err(FetchError::Http(e)), None)),
            }
        });

        Ok(Response {
            content_length,
            body: Box::pin(body),
        })
    }
}
