//! Nozomi Fetcher Library
//!
//! A Rust library for building tagged image datasets from the nozomi.la
//! board. Tag queries are resolved through the board's binary tag indexes,
//! post metadata is fetched concurrently under one shared request limit,
//! and media are streamed to disk with a tag sidecar file per post.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
