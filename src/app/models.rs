//! Data models for board posts
//!
//! Post metadata is decoded in two steps: the raw JSON is first checked for
//! a null or missing `date` (a tombstone for deleted or unavailable posts),
//! then deserialized into the strict [`Post`] schema.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::app::urls;
use crate::constants::dataset::TIMESTAMP_FORMAT;
use crate::errors::{AppError, Result};

/// A tag attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    /// Tag name in index form
    pub tag: String,
    /// Human readable tag name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagname_display: Option<String>,
    /// Board URL of the tag page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagurl: Option<String>,
    /// Tag category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagtype: Option<String>,
}

/// A media file attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetaData {
    /// Media URL as served by the board, possibly protocol-relative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageurl: Option<String>,
    /// Content hash naming the file on the media host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataid: Option<String>,
    /// File extension
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Non-empty for videos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl MediaMetaData {
    /// Absolute URL of the media file
    ///
    /// Uses `imageurl` when present, otherwise derives the URL from the
    /// data id and file type.
    pub fn url(&self) -> Option<String> {
        if let Some(url) = &self.imageurl {
            return Some(urls::normalize_media_url(url));
        }
        match (&self.dataid, &self.file_type) {
            (Some(dataid), Some(file_type)) => {
                let is_video = self.is_video.as_deref().is_some_and(|v| !v.is_empty());
                Some(urls::media_url(dataid, file_type, is_video))
            }
            _ => None,
        }
    }
}

/// A board post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Content hash identifying the post's primary media
    pub dataid: String,
    /// Upload timestamp, e.g. `2022-02-20 12:34:56-05`
    pub date: String,
    /// General tags in board order
    pub general: Vec<TagEntry>,
    /// Media attached to the post
    pub imageurls: Vec<MediaMetaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub copyright: Vec<TagEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub character: Vec<TagEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artist: Vec<TagEntry>,
}

impl Post {
    /// Decode a post from a metadata response body
    ///
    /// Returns `Ok(None)` for tombstones: bodies whose `date` is null or
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Decode` if the body is not JSON or does not match
    /// the post schema.
    pub fn decode(url: &str, body: &[u8]) -> Result<Option<Self>> {
        let decode_error = |source: serde_json::Error| AppError::Decode {
            url: url.to_string(),
            source,
        };

        let value: serde_json::Value = serde_json::from_slice(body).map_err(decode_error)?;
        if value.is_object() && value.get("date").map_or(true, serde_json::Value::is_null) {
            return Ok(None);
        }

        let post: Post = serde_json::from_value(value).map_err(decode_error)?;
        if post.imageurls.iter().any(|media| media.url().is_none()) {
            return Err(decode_error(<serde_json::Error as serde::de::Error>::custom(format!(
                "post {} has a media entry without imageurl or dataid/type",
                post.dataid
            ))));
        }
        Ok(Some(post))
    }

    /// Upload time with the trailing timezone-offset token dropped
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidDateFormat` if the timestamp does not parse.
    pub fn timestamp(&self) -> Result<NaiveDateTime> {
        let offset_start = self
            .date
            .char_indices()
            .skip(10)
            .filter(|(_, c)| *c == '-' || *c == '+')
            .last()
            .map(|(i, _)| i);
        let trimmed = match offset_start {
            Some(i) => &self.date[..i],
            None => self.date.as_str(),
        };
        NaiveDateTime::parse_from_str(trimmed.trim(), TIMESTAMP_FORMAT)
            .map_err(|_| AppError::invalid_date(&self.date, "YYYY-MM-DD HH:MM:SS-TZ"))
    }

    /// Absolute URLs of all media on the post
    pub fn media_urls(&self) -> Vec<String> {
        self.imageurls.iter().filter_map(MediaMetaData::url).collect()
    }

    /// General tags joined by spaces, in board order
    pub fn general_tag_line(&self) -> String {
        self.general
            .iter()
            .map(|entry| entry.tag.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Numeric post id, when the metadata carries one
    pub fn post_id(&self) -> Option<u32> {
        self.postid
    }
}
