// src/pipeline/process.rs

//! Processed dataset projection.
//!
//! Parses the display strings of the current dataset into numbers and short
//! labels suitable for analysis.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DatasetRow;
use crate::storage::DatasetStorage;

/// One product in the processed dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedRow {
    /// Product slug taken from the URL (`/product/<slug>-<digits>`)
    pub product_id: Option<String>,
    pub name: String,
    pub url: Option<String>,
    /// Pack size from the name (`Milk | 2L` gives `2L`)
    pub size: Option<String>,
    pub current_price_aud: Option<f64>,
    pub unit_price_aud: Option<f64>,
    pub unit_of_measure: Option<String>,
    pub previous_price_aud: Option<f64>,
    /// Month of the previous price (e.g. "Jan 2026")
    pub previous_price_date: Option<String>,
    pub on_special: bool,
    pub discount_percentage: Option<String>,
    pub promotion: Option<String>,
    pub category: String,
    pub scrape_date: NaiveDate,
    pub scrape_timestamp: DateTime<Utc>,
}

/// Derives [`ProcessedRow`]s from dataset rows.
#[derive(Debug, Clone)]
pub struct RowProcessor {
    product_id: Regex,
    size: Regex,
    price: Regex,
    was_price: Regex,
    was_date: Regex,
    unit_price: Regex,
    unit: Regex,
}

impl RowProcessor {
    pub fn new() -> Result<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| AppError::config(format!("{p}: {e}")));
        Ok(Self {
            product_id: compile(r"product/(.+)-\d+$")?,
            size: compile(r"\| (.+)$")?,
            price: compile(r"\$([\d,]+\.\d+)")?,
            was_price: compile(r"Was \$([\d,]+\.\d+)")?,
            was_date: compile(r"Was \$[\d,]+\.\d+ on (\w{3} \d{4})")?,
            unit_price: compile(r"\$([\d,]+\.\d+) per")?,
            unit: compile(r"\$[\d,]+\.\d+ per (\w+)")?,
        })
    }

    /// Project rows, keeping the first row for each product id.
    ///
    /// Rows whose URL yields no product id are all kept.
    pub fn process(&self, rows: &[DatasetRow]) -> Vec<ProcessedRow> {
        let mut seen = HashSet::new();
        let processed: Vec<ProcessedRow> = rows
            .iter()
            .map(|row| self.process_row(row))
            .filter(|row| match &row.product_id {
                Some(id) => seen.insert(id.clone()),
                None => true,
            })
            .collect();
        log::info!("Processed {} unique products", processed.len());
        processed
    }

    pub fn process_row(&self, row: &DatasetRow) -> ProcessedRow {
        let record = &row.record;
        let basis = record.price_basis.as_deref();

        ProcessedRow {
            product_id: record
                .url
                .as_deref()
                .and_then(|url| capture(&self.product_id, url)),
            name: record.name.clone(),
            url: record.url.clone(),
            size: capture(&self.size, &record.name),
            current_price_aud: record
                .price
                .as_deref()
                .and_then(|p| capture(&self.price, p))
                .and_then(|p| to_number(&p)),
            unit_price_aud: basis
                .map(|b| b.replace(',', ""))
                .and_then(|b| capture(&self.unit_price, &b))
                .and_then(|p| to_number(&p)),
            unit_of_measure: basis
                .map(|b| b.replace("Was", ""))
                .and_then(|b| capture(&self.unit, &b)),
            previous_price_aud: basis
                .and_then(|b| capture(&self.was_price, b))
                .and_then(|p| to_number(&p)),
            previous_price_date: basis.and_then(|b| capture(&self.was_date, b)),
            on_special: record.on_special,
            discount_percentage: record.discount_percentage.clone(),
            promotion: record.promotion.clone(),
            category: row.category.clone(),
            scrape_date: row.date,
            scrape_timestamp: row.timestamp,
        }
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn to_number(text: &str) -> Option<f64> {
    text.replace(',', "").parse().ok()
}

/// Rebuild the processed dataset from the current dataset.
pub async fn run_process(storage: &dyn DatasetStorage) -> Result<usize> {
    let current = storage.load_current().await?;
    let processed = RowProcessor::new()?.process(&current);
    storage.save_processed(&processed).await?;
    Ok(processed.len())
}
