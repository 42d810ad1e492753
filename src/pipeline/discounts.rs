// src/pipeline/discounts.rs

//! Savings summary for a discount set.

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::ProcessedRow;
use crate::storage::DatasetStorage;

/// Number of products listed in a summary.
const EXAMPLE_COUNT: usize = 5;

/// One product's saving.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountExample {
    pub name: String,
    pub current_price_aud: f64,
    pub previous_price_aud: f64,
    pub savings_aud: f64,
}

/// Savings across one discount set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountSummary {
    pub set: String,
    /// Rows in the processed view
    pub products: usize,
    /// Rows with both a current and a previous price
    pub priced: usize,
    pub average_savings_aud: Option<f64>,
    pub average_savings_pct: Option<f64>,
    pub total_savings_aud: f64,
    pub examples: Vec<DiscountExample>,
}

impl DiscountSummary {
    pub fn log(&self) {
        log::info!("=== Discounts: {} ===", self.set);
        log::info!("Products: {} ({} with both prices)", self.products, self.priced);
        if let (Some(aud), Some(pct)) = (self.average_savings_aud, self.average_savings_pct) {
            log::info!("Average savings: ${aud:.2} ({pct:.1}%)");
            log::info!("Total potential savings: ${:.2}", self.total_savings_aud);
        }
        for (i, example) in self.examples.iter().enumerate() {
            log::info!(
                "  {}. {} - ${:.2} (was ${:.2}, save ${:.2})",
                i + 1,
                example.name,
                example.current_price_aud,
                example.previous_price_aud,
                example.savings_aud
            );
        }
    }
}

/// Summarize savings over processed rows.
pub fn summarize_discounts(set: &str, rows: &[ProcessedRow]) -> DiscountSummary {
    let priced: Vec<DiscountExample> = rows
        .iter()
        .filter_map(|row| {
            let current = row.current_price_aud?;
            let previous = row.previous_price_aud?;
            Some(DiscountExample {
                name: row.name.clone(),
                current_price_aud: current,
                previous_price_aud: previous,
                savings_aud: previous - current,
            })
        })
        .collect();

    let total_savings_aud: f64 = priced.iter().map(|e| e.savings_aud).sum();
    let percentages: Vec<f64> = priced
        .iter()
        .filter(|e| e.previous_price_aud > 0.0)
        .map(|e| e.savings_aud / e.previous_price_aud * 100.0)
        .collect();

    DiscountSummary {
        set: set.to_string(),
        products: rows.len(),
        priced: priced.len(),
        average_savings_aud: mean(priced.iter().map(|e| e.savings_aud)),
        average_savings_pct: mean(percentages.into_iter()),
        total_savings_aud,
        examples: priced.into_iter().take(EXAMPLE_COUNT).collect(),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Summarize the processed view of one discount set.
pub async fn run_discount_summary(set: &str, storage: &dyn DatasetStorage) -> Result<DiscountSummary> {
    let rows = storage.load_processed().await?;
    if rows.is_empty() {
        log::warn!("No discount data for '{set}'");
    }
    let summary = summarize_discounts(set, &rows);
    summary.log();
    Ok(summary)
}
