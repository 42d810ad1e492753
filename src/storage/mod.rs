//! Storage abstractions for the product dataset.
//!
//! The dataset is split three ways:
//! - Current: the latest version of every known product
//! - Archive: superseded versions, append-only
//! - Processed: the current rows with prices parsed into numbers
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! ├── products.json                 # Current dataset
//! ├── archive/
//! │   └── products_dropped.json     # Superseded rows
//! ├── processed/
//! │   └── products.json             # Derived numeric view
//! └── discounts/
//!     └── {set}/                    # Specials, one dataset per filter
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::DatasetRow;
use crate::pipeline::ProcessedRow;

// Re-export for convenience
pub use local::LocalStorage;

/// On-disk envelope for a row collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile<T> {
    /// Time of the last write
    pub updated_at: DateTime<Utc>,
    /// Number of rows
    pub count: usize,
    /// The rows themselves
    pub rows: Vec<T>,
}

impl<T> DatasetFile<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: rows.len(),
            rows,
        }
    }
}

/// Trait for dataset storage backends.
///
/// Every write replaces the target file as a whole; a reader never observes a
/// partially written file.
#[async_trait]
pub trait DatasetStorage: Send + Sync {
    /// Load the current dataset; empty when none has been written yet.
    async fn load_current(&self) -> Result<Vec<DatasetRow>>;

    /// Replace the current dataset.
    async fn save_current(&self, rows: &[DatasetRow]) -> Result<()>;

    /// Load the archive of superseded rows.
    async fn load_archive(&self) -> Result<Vec<DatasetRow>>;

    /// Replace the archive.
    async fn save_archive(&self, rows: &[DatasetRow]) -> Result<()>;

    /// Replace the processed dataset.
    async fn save_processed(&self, rows: &[ProcessedRow]) -> Result<()>;

    /// Load the processed dataset.
    async fn load_processed(&self) -> Result<Vec<ProcessedRow>>;
}
