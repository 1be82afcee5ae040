//! # JSON File Document Store
//!
//! File-based implementation of `DocumentStore`. Each document is a pretty-printed
//! JSON file:
//!
//! ```text
//! data/
//! └── {collection}/
//!     ├── {doc_id}.json
//!     └── {doc_id}.json
//! ```
//!
//! Writes go to a temporary file first and are then renamed over the target, so a
//! crash mid-write never leaves a truncated document behind. Document reads and
//! writes go through `tokio::fs` and never block the runtime.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::traits::{merge_documents, DocumentStore, SetOptions};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_directory: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).with_context(|| {
                format!("Failed to create data directory {}", base_path.display())
            })?;
            info!("Created data directory {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the file backing a document
    pub fn document_path(&self, collection: &str, doc_id: &str) -> Result<PathBuf> {
        validate_segment("collection", collection)?;
        validate_segment("document id", doc_id)?;
        Ok(self
            .base_directory
            .join(collection)
            .join(format!("{}.json", doc_id)))
    }

    async fn read_document(path: &Path) -> Result<Option<Value>> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    async fn write_document(path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, serde_json::to_string_pretty(value)?)
            .await
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, path)
            .await
            .with_context(|| format!("Failed to move {} into place", temp_path.display()))?;
        Ok(())
    }
}

/// Reject names that would escape the data directory
fn validate_segment(what: &str, segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        bail!("invalid {}: '{}'", what, segment);
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let path = self.document_path(collection, doc_id)?;
        debug!("Reading document {}", path.display());
        Self::read_document(&path).await
    }

    async fn set(&self, collection: &str, doc_id: &str, value: Value, options: SetOptions) -> Result<()> {
        let path = self.document_path(collection, doc_id)?;

        let mut document = if options.merge {
            Self::read_document(&path).await?.unwrap_or_else(|| Value::Object(Default::default()))
        } else {
            Value::Object(Default::default())
        };
        merge_documents(&mut document, value);

        Self::write_document(&path, &document).await?;
        debug!("Wrote document {} (merge: {})", path.display(), options.merge);
        Ok(())
    }
}
