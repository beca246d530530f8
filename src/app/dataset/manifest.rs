//! Dataset manifest (`metadata.json`)
//!
//! The manifest records the query and the full post records. It is written
//! with recursively sorted keys, three-space indentation and literal UTF-8.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::app::models::Post;
use crate::constants::dataset::{MANIFEST_FILE, MANIFEST_INDENT};
use crate::errors::{ManifestError, ManifestResult};

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub positive_tags: Vec<String>,
    pub negative_tags: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub post_count: usize,
    pub posts: Vec<Post>,
}

impl DatasetManifest {
    /// Build a manifest; `post_count` is derived from `posts`
    pub fn new(
        positive_tags: Vec<String>,
        negative_tags: Vec<String>,
        start_date: Option<String>,
        end_date: Option<String>,
        posts: Vec<Post>,
    ) -> Self {
        Self {
            positive_tags,
            negative_tags,
            start_date,
            end_date,
            post_count: posts.len(),
            posts,
        }
    }

    /// Path of the manifest inside a dataset directory
    pub fn path_in(dataset_dir: &Path) -> PathBuf {
        dataset_dir.join(MANIFEST_FILE)
    }

    /// Render the manifest as canonical JSON
    pub fn to_json(&self) -> ManifestResult<String> {
        let value = sort_keys(serde_json::to_value(self)?);

        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(MANIFEST_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;

        // serde_json only emits valid UTF-8
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the manifest into `dataset_dir`, replacing any previous one
    pub async fn write(&self, dataset_dir: &Path) -> ManifestResult<PathBuf> {
        let path = Self::path_in(dataset_dir);
        let json = self.to_json()?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            tracing::error!("Failed to write manifest {}: {}", path.display(), e);
            ManifestError::Io(e)
        })?;
        tracing::info!(
            "Wrote manifest with {} posts to {}",
            self.post_count,
            path.display()
        );
        Ok(path)
    }

    /// Read the manifest of an existing dataset
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::NotFound` if there is no manifest, `Json` if
    /// it cannot be parsed and `CountMismatch` if `post_count` disagrees
    /// with the stored posts.
    pub async fn load(dataset_dir: &Path) -> ManifestResult<Self> {
        let path = Self::path_in(dataset_dir);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound { path });
            }
            Err(e) => return Err(ManifestError::Io(e)),
        };

        let manifest: Self = serde_json::from_slice(&content)?;
        if manifest.post_count != manifest.posts.len() {
            return Err(ManifestError::CountMismatch {
                declared: manifest.post_count,
                actual: manifest.posts.len(),
            });
        }
        Ok(manifest)
    }
}

/// Rebuild every object with its keys in sorted order
///
/// `serde_json::Map` only sorts while the `preserve_order` feature is off,
/// and any crate in the build can turn it on.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
