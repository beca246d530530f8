//! Shared concurrency limiter
//!
//! One limiter is created per client and cloned into every task that
//! touches the network: tag index fetches, post metadata fetches and media
//! downloads all draw from the same permit pool.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::{AppError, ConfigError, Result};

/// Counting limiter bounding simultaneous in-flight requests
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Permit held for the duration of one request; released on drop
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `capacity` concurrent requests
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: capacity.to_string(),
                reason: "At least one concurrent request is required".to_string(),
            }
            .into());
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::generic("Concurrency limiter closed"))?;
        Ok(LimiterPermit { _permit: permit })
    }

    /// Configured number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
