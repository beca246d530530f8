//! URL conventions of the board
//!
//! Tag indexes live at `https://j.nozomi.la/nozomi/<tag>.nozomi`, post
//! metadata at `https://j.nozomi.la/post/<shard>/<id>.json` where the shard
//! is built from the trailing digits of the id.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::app::tags::Tag;
use crate::constants::nozomi;
use crate::errors::{AppError, Result};

/// Characters percent-encoded in index paths, on top of controls
const INDEX_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b';')
    .add(b'?')
    .add(b':')
    .add(b'@')
    .add(b'=')
    .add(b'&')
    .add(b'+')
    .add(b'$')
    .add(b',');

/// Percent-encode the reserved characters of a sanitized tag
pub fn encode_tag(tag: &Tag) -> String {
    utf8_percent_encode(tag.as_str(), INDEX_ENCODE_SET).to_string()
}

/// URL of a tag's index file
pub fn tag_index_url(tag: &Tag) -> String {
    format!(
        "{}/{}/{}.{}",
        nozomi::DATA_BASE_URL,
        nozomi::INDEX_PATH,
        encode_tag(tag),
        nozomi::INDEX_EXTENSION
    )
}

/// Sharded path of a post id: `7`, `42`, `1/23/123`, `5/34/12345`
fn post_shard_path(post_id: u32) -> String {
    let id = post_id.to_string();
    if id.len() < 3 {
        return id;
    }
    let len = id.len();
    format!("{}/{}/{}", &id[len - 1..], &id[len - 3..len - 1], id)
}

/// URL of a post's metadata file
pub fn post_url(post_id: u32) -> String {
    format!(
        "{}/{}/{}.json",
        nozomi::DATA_BASE_URL,
        nozomi::POST_PATH,
        post_shard_path(post_id)
    )
}

/// Extract the post id from a post page or metadata URL
///
/// Accepts `https://nozomi.la/post/<id>.html` and
/// `https://j.nozomi.la/post/.../<id>.json`.
///
/// # Errors
///
/// Returns `AppError::InvalidUrlFormat` if the last path segment does not
/// carry a numeric id.
pub fn parse_post_id(url: &str) -> Result<u32> {
    let invalid = || AppError::InvalidUrlFormat {
        url: url.to_string(),
    };

    let parsed = url::Url::parse(url).map_err(|_| invalid())?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .ok_or_else(invalid)?;
    let stem = segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".json"))
        .ok_or_else(invalid)?;

    if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    stem.parse().map_err(|_| invalid())
}

/// Normalize a media URL, adding `https:` to protocol-relative URLs
pub fn normalize_media_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

/// Derive a media URL from its data id and file type
pub fn media_url(dataid: &str, file_type: &str, is_video: bool) -> String {
    let host = if is_video {
        nozomi::VIDEO_HOST
    } else {
        nozomi::IMAGE_HOST
    };
    let chars: Vec<char> = dataid.chars().collect();
    let len = chars.len();
    if len < 3 {
        return format!("https://{}/{}.{}", host, dataid, file_type);
    }
    let last: String = chars[len - 1..].iter().collect();
    let middle: String = chars[len - 3..len - 1].iter().collect();
    format!(
        "https://{}/{}/{}/{}.{}",
        host, last, middle, dataid, file_type
    )
}

/// File name of a media URL: its final path segment
pub fn media_file_name(url: &str) -> Result<String> {
    let name = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::InvalidUrlFormat {
            url: url.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Host of a URL, used for the `Host` header of media requests
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}
