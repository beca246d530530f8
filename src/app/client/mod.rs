//! HTTP client for the nozomi.la board
//!
//! [`NozomiClient`] is the context object handed to every pipeline stage:
//! it bundles the transport with the shared [`ConcurrencyLimiter`], so every
//! request of a run draws from one permit pool.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `transport`: the `Transport` seam and request/response types
//! - `http`: reqwest implementation of `Transport`

use std::sync::Arc;

use crate::app::limiter::{ConcurrencyLimiter, LimiterPermit};
use crate::errors::Result;

pub mod config;
pub mod http;
pub mod transport;

pub use config::ClientConfig;
pub use http::HttpTransport;
pub use transport::{BodyStream, Request, RequestKind, Response, Transport};

/// Transport plus shared limiter
#[derive(Debug, Clone)]
pub struct NozomiClient {
    transport: Arc<dyn Transport>,
    limiter: ConcurrencyLimiter,
}

impl NozomiClient {
    /// Creates a client over HTTP with `concurrency` request slots
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy is invalid, the HTTP client cannot be
    /// built, or `concurrency` is zero.
    pub fn new(config: &ClientConfig, concurrency: usize) -> Result<Self> {
        let client = config.build_http_client()?;
        let limiter = ConcurrencyLimiter::new(concurrency)?;

        tracing::info!(
            "Created nozomi client ({} concurrent requests{})",
            concurrency,
            if config.proxy.is_some() { ", proxied" } else { "" }
        );

        Ok(Self::with_transport(
            Arc::new(HttpTransport::new(client)),
            limiter,
        ))
    }

    /// Creates a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>, limiter: ConcurrencyLimiter) -> Self {
        Self { transport, limiter }
    }

    /// The shared limiter
    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetch a whole body while holding one limiter slot
    ///
    /// # Errors
    ///
    /// Returns `AppError::Fetch` if the request or the body read fails.
    pub async fn get_bytes(&self, request: &Request) -> Result<Vec<u8>> {
        let _permit = self.limiter.acquire().await?;
        let result = match self.transport.get(request).await {
            Ok(response) => response.bytes().await,
            Err(e) => Err(e),
        };
        result.map_err(|e| {
            tracing::warn!("GET {} failed: {}", request.url, e);
            e.into()
        })
    }

    /// Open a streaming response; the returned permit must be held until
    /// the body has been consumed
    ///
    /// # Errors
    ///
    /// Returns `AppError::Fetch` if the request fails.
    pub async fn get_stream(&self, request: &Request) -> Result<(LimiterPermit, Response)> {
        let permit = self.limiter.acquire().await?;
        let response = self.transport.get(request).await.map_err(|e| {
            tracing::warn!("GET {} failed: {}", request.url, e);
            e
        })?;
        Ok((permit, response))
    }
}
