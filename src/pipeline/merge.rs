// src/pipeline/merge.rs

//! Dataset merging.
//!
//! Folds a freshly scraped batch into the persistent dataset. The newest row
//! per dedup key stays current; every other version moves to the archive.
//! Browse listings share the product dataset while each specials filter has
//! a dataset of its own, so a product on special never displaces its browse
//! row.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{DatasetRow, Record, Target};
use crate::pipeline::RowProcessor;
use crate::storage::{DatasetStorage, LocalStorage};

/// Query context stamped onto every merged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeContext {
    pub category: String,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl MergeContext {
    pub fn new(category: impl Into<String>, date: NaiveDate, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            date,
            timestamp,
        }
    }

    /// Context for a scrape happening right now, dated in local time.
    pub fn now(category: impl Into<String>) -> Self {
        Self::new(category, Local::now().date_naive(), Utc::now())
    }
}

/// Counts describing what a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Records in the incoming batch
    pub incoming: usize,
    /// Keys not present in the dataset before
    pub added: usize,
    /// Keys whose current record changed
    pub updated: usize,
    /// Keys re-scraped with identical content
    pub unchanged: usize,
    /// Rows in the dataset after the merge
    pub current_total: usize,
    /// Rows newly written to the archive
    pub archived: usize,
}

/// Result of splitting rows into current and superseded.
#[derive(Debug, Default, PartialEq)]
pub struct Partition {
    pub current: Vec<DatasetRow>,
    pub demoted: Vec<DatasetRow>,
}

/// Split incoming and existing rows into the current view and demoted rows.
///
/// Exact duplicates collapse to one. Ties on timestamp go to the incoming row.
pub fn partition(incoming: Vec<DatasetRow>, existing: Vec<DatasetRow>) -> Partition {
    let mut seen = HashSet::new();
    let mut combined: Vec<DatasetRow> = incoming
        .into_iter()
        .chain(existing)
        .filter(|row| seen.insert(row.clone()))
        .collect();

    // Stable, so equal timestamps keep incoming-first order.
    combined.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut keys = HashSet::new();
    let mut result = Partition::default();
    for row in combined {
        if keys.insert(row.dedup_key().to_string()) {
            result.current.push(row);
        } else {
            result.demoted.push(row);
        }
    }
    result
}

/// Sole writer of the dataset and archive.
///
/// Shared across query pipelines behind an [`Arc`]; concurrent merges are
/// serialized internally.
pub struct DatasetMerger {
    storage: Arc<dyn DatasetStorage>,
    processor: RowProcessor,
    lock: Mutex<()>,
}

impl DatasetMerger {
    pub fn new(storage: Arc<dyn DatasetStorage>) -> Result<Self> {
        Ok(Self {
            storage,
            processor: RowProcessor::new()?,
            lock: Mutex::new(()),
        })
    }

    pub fn storage(&self) -> &Arc<dyn DatasetStorage> {
        &self.storage
    }

    /// Merge a batch of records scraped under `context`.
    ///
    /// An empty batch touches nothing. Re-merging an identical batch with the
    /// same context leaves the dataset and archive as they were.
    pub async fn merge(&self, records: Vec<Record>, context: &MergeContext) -> Result<MergeStats> {
        if records.is_empty() {
            log::debug!("Nothing to merge for '{}'", context.category);
            return Ok(MergeStats::default());
        }

        let _guard = self.lock.lock().await;

        let incoming: Vec<DatasetRow> = records
            .into_iter()
            .map(|r| r.stamp(context.category.clone(), context.date, context.timestamp))
            .collect();
        let previous = self.storage.load_current().await?;

        let mut stats = diff_stats(&incoming, &previous);
        let Partition { current, demoted } = partition(incoming, previous);

        let mut archive = self.storage.load_archive().await?;
        let archived: HashSet<DatasetRow> = archive.iter().cloned().collect();
        let fresh: Vec<DatasetRow> = demoted
            .into_iter()
            .filter(|row| !archived.contains(row))
            .collect();

        // Archive first: a failure between the writes leaves a row in both
        // stores rather than in neither.
        if !fresh.is_empty() {
            stats.archived = fresh.len();
            archive.extend(fresh);
            self.storage.save_archive(&archive).await?;
        }
        self.storage.save_current(&current).await?;
        self.storage
            .save_processed(&self.processor.process(&current))
            .await?;

        stats.current_total = current.len();
        log::info!(
            "Merged '{}': {} incoming, {} added, {} updated, {} unchanged, {} archived ({} current)",
            context.category,
            stats.incoming,
            stats.added,
            stats.updated,
            stats.unchanged,
            stats.archived,
            stats.current_total
        );
        Ok(stats)
    }
}

/// The mergers a run writes through, one per dataset.
pub struct Datasets {
    products: DatasetMerger,
    discounts: HashMap<String, DatasetMerger>,
}

impl Datasets {
    /// Datasets with only the product dataset configured.
    pub fn new(products: Arc<dyn DatasetStorage>) -> Result<Self> {
        Ok(Self {
            products: DatasetMerger::new(products)?,
            discounts: HashMap::new(),
        })
    }

    /// Add (or replace) the storage behind a discount set.
    pub fn with_discount_set(
        mut self,
        set: impl Into<String>,
        storage: Arc<dyn DatasetStorage>,
    ) -> Result<Self> {
        self.discounts.insert(set.into(), DatasetMerger::new(storage)?);
        Ok(self)
    }

    /// Local layout: products at the root and every discount set the
    /// targets name under `discounts/`.
    pub fn local(storage: &LocalStorage, targets: &[Target]) -> Result<Self> {
        let mut datasets = Self::new(Arc::new(storage.clone()))?;
        for set in targets.iter().filter_map(Target::discount_set) {
            if !datasets.discounts.contains_key(set) {
                datasets = datasets.with_discount_set(set, Arc::new(storage.discounts(set)))?;
            }
        }
        Ok(datasets)
    }

    pub fn products(&self) -> &DatasetMerger {
        &self.products
    }

    pub fn discount_set(&self, set: &str) -> Option<&DatasetMerger> {
        self.discounts.get(set)
    }

    /// Merger for the dataset `target` writes to.
    pub fn for_target(&self, target: &Target) -> Result<&DatasetMerger> {
        match target.discount_set() {
            None => Ok(&self.products),
            Some(set) => self
                .discount_set(set)
                .ok_or_else(|| AppError::config(format!("no dataset for discount set '{set}'"))),
        }
    }
}

/// Compare the incoming batch with the previous current rows, per key.
fn diff_stats(incoming: &[DatasetRow], previous: &[DatasetRow]) -> MergeStats {
    let prev_map: HashMap<&str, &Record> = previous
        .iter()
        .map(|row| (row.dedup_key(), &row.record))
        .collect();

    let mut stats = MergeStats {
        incoming: incoming.len(),
        ..MergeStats::default()
    };
    let mut counted = HashSet::new();
    for row in incoming {
        let key = row.dedup_key();
        if !counted.insert(key) {
            continue;
        }
        match prev_map.get(key) {
            None => stats.added += 1,
            Some(prev) if **prev != row.record => stats.updated += 1,
            Some(_) => stats.unchanged += 1,
        }
    }
    stats
}
