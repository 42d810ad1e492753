//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── products.json
//! ├── archive/products_dropped.json
//! ├── processed/products.json
//! └── discounts/{set}/              # Same layout, one per specials filter
//! ```
//!
//! Each file is written to a sibling temp file first and renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::DatasetRow;
use crate::pipeline::ProcessedRow;
use crate::storage::{DatasetFile, DatasetStorage};

const CURRENT_KEY: &str = "products.json";
const ARCHIVE_KEY: &str = "archive/products_dropped.json";
const PROCESSED_KEY: &str = "processed/products.json";
const DISCOUNTS_DIR: &str = "discounts";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Storage for one discount set, nested under `discounts/`.
    pub fn discounts(&self, set: &str) -> LocalStorage {
        LocalStorage::new(self.root_dir.join(DISCOUNTS_DIR).join(set))
    }

    pub fn current_path(&self) -> PathBuf {
        self.path(CURRENT_KEY)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.path(ARCHIVE_KEY)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.path(PROCESSED_KEY)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        let fail = |e: std::io::Error| AppError::merge(path.display(), e);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(fail)?;
        }

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await.map_err(fail)?;
        file.write_all(bytes).await.map_err(fail)?;
        file.flush().await.map_err(fail)?;
        file.sync_all().await.map_err(fail)?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await.map_err(fail)?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::merge(path.display(), e)),
        }
    }

    async fn write_rows<T: Serialize + Clone + Send + Sync>(&self, key: &str, rows: &[T]) -> Result<()> {
        let file = DatasetFile::new(rows.to_vec());
        let bytes = serde_json::to_vec_pretty(&file)?;
        self.write_bytes(key, &bytes).await?;
        log::debug!("Wrote {} rows to {}", file.count, self.path(key).display());
        Ok(())
    }

    async fn read_rows<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => {
                let file: DatasetFile<T> = serde_json::from_slice(&bytes)
                    .map_err(|e| AppError::merge(self.path(key).display(), e))?;
                Ok(file.rows)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl DatasetStorage for LocalStorage {
    async fn load_current(&self) -> Result<Vec<DatasetRow>> {
        self.read_rows(CURRENT_KEY).await
    }

    async fn save_current(&self, rows: &[DatasetRow]) -> Result<()> {
        self.write_rows(CURRENT_KEY, rows).await
    }

    async fn load_archive(&self) -> Result<Vec<DatasetRow>> {
        self.read_rows(ARCHIVE_KEY).await
    }

    async fn save_archive(&self, rows: &[DatasetRow]) -> Result<()> {
        self.write_rows(ARCHIVE_KEY, rows).await
    }

    async fn save_processed(&self, rows: &[ProcessedRow]) -> Result<()> {
        self.write_rows(PROCESSED_KEY, rows).await
    }

    async fn load_processed(&self) -> Result<Vec<ProcessedRow>> {
        self.read_rows(PROCESSED_KEY).await
    }
}
