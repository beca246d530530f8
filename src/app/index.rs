//! Decoder for `.nozomi` tag index files
//!
//! An index file is a packed array of big-endian `u32` post ids with no
//! header; the byte length alone determines the element count.

use crate::constants::limits::INDEX_ENTRY_WIDTH;
use crate::errors::{AppError, Result};

/// Decode a raw index buffer into post ids, preserving file order
///
/// # Errors
///
/// Returns `AppError::MalformedIndex` if the buffer length is not a
/// multiple of four.
pub fn decode_post_ids(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % INDEX_ENTRY_WIDTH != 0 {
        return Err(AppError::MalformedIndex { len: bytes.len() });
    }

    let ids = bytes
        .chunks_exact(INDEX_ENTRY_WIDTH)
        .map(|entry| u32::from_be_bytes([entry[0], entry[1], entry[2], entry[3]]))
        .collect();

    Ok(ids)
}
