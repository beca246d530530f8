//! Tag model and sanitization
//!
//! Tags are lowercased, whitespace is contracted to `_`, and the characters
//! that cannot appear in an index path (`/`, `#`, `%`) are dropped. The
//! result must be non-empty and free of control characters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::dataset::NAME_DELIMITER;
use crate::errors::{AppError, Result};

/// Characters removed from tags during sanitization
const REMOVED_CHARACTERS: &[char] = &['/', '#', '%'];

/// A sanitized tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Sanitize a raw tag string
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTagFormat` if the sanitized tag is empty
    /// or contains a control character.
    pub fn parse(raw: &str) -> Result<Self> {
        sanitize_tag(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitize a raw tag string into its index form
///
/// # Errors
///
/// Returns `AppError::InvalidTagFormat` if the result is empty or contains
/// a control character.
pub fn sanitize_tag(raw: &str) -> Result<Tag> {
    tracing::debug!("Sanitizing tag {:?}", raw);

    let lowered = raw.trim().to_lowercase();
    let contracted = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    let sanitized: String = contracted
        .chars()
        .filter(|c| !REMOVED_CHARACTERS.contains(c))
        .collect();

    if sanitized.is_empty() {
        return Err(AppError::invalid_tag(raw, "tag is empty after sanitization"));
    }
    if sanitized.chars().any(char::is_control) {
        return Err(AppError::invalid_tag(raw, "tag contains a control character"));
    }

    Ok(Tag(sanitized))
}

/// Sanitize a list of raw tags, failing on the first invalid one
pub fn sanitize_tags<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Tag>> {
    raw.iter().map(|tag| sanitize_tag(tag.as_ref())).collect()
}

/// Positive and negative tags of one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Tags every post must carry
    pub positive: Vec<Tag>,
    /// Tags no post may carry
    pub negative: Vec<Tag>,
}

impl TagQuery {
    /// Build a query from raw tag strings
    pub fn new<S: AsRef<str>>(positive: &[S], negative: &[S]) -> Result<Self> {
        Ok(Self {
            positive: sanitize_tags(positive)?,
            negative: sanitize_tags(negative)?,
        })
    }

    /// Name of the dataset directory for this query
    pub fn dataset_name(&self) -> String {
        self.positive
            .iter()
            .map(Tag::as_str)
            .collect::<Vec<_>>()
            .join(NAME_DELIMITER)
    }
}
