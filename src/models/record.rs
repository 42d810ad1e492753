// src/models/record.rs

//! Product records and the rows they become once persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::parse_money;

/// Name given to a product tile whose title could not be read.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

fn default_name() -> String {
    UNKNOWN_PRODUCT.to_string()
}

/// One product tile extracted from a listing page.
///
/// Every field except `name` is independently optional. The extractor has no
/// knowledge of which query produced the page; category and timestamps are
/// attached later by [`Record::stamp`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Record {
    /// Product name, or [`UNKNOWN_PRODUCT`]
    #[serde(default = "default_name")]
    pub name: String,

    /// Canonical product URL; doubles as the dedup key
    #[serde(default)]
    pub url: Option<String>,

    /// Displayed price (e.g. "$4.50")
    #[serde(default)]
    pub price: Option<String>,

    /// Price basis line (e.g. "$1.13 per 100g")
    #[serde(default)]
    pub price_basis: Option<String>,

    /// Secondary price description
    #[serde(default)]
    pub price_basis_detail: Option<String>,

    /// Product image reference
    #[serde(default)]
    pub image_url: Option<String>,

    /// Previous price when the product is discounted
    #[serde(default)]
    pub was_price: Option<String>,

    /// Discount percentage (e.g. "25%")
    #[serde(default)]
    pub discount_percentage: Option<String>,

    /// Promotion label (e.g. "Half Price")
    #[serde(default)]
    pub promotion: Option<String>,

    /// Whether any discount signal was found on the tile
    #[serde(default)]
    pub on_special: bool,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            name: default_name(),
            url: None,
            price: None,
            price_basis: None,
            price_basis_detail: None,
            image_url: None,
            was_price: None,
            discount_percentage: None,
            promotion: None,
            on_special: false,
        }
    }
}

impl Record {
    /// Key used to decide which scraped versions describe the same product.
    ///
    /// Falls back to the name for tiles without a link.
    pub fn dedup_key(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.name)
    }

    /// Whether the displayed price is below a known previous price.
    ///
    /// Badges and promotion text alone do not count.
    pub fn is_discounted(&self) -> bool {
        let current = self.price.as_deref().and_then(parse_money);
        let was = self.was_price.as_deref().and_then(parse_money);
        matches!((current, was), (Some(current), Some(was)) if current < was)
    }

    /// Attach query context, producing a persistable row.
    pub fn stamp(
        self,
        category: impl Into<String>,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> DatasetRow {
        DatasetRow {
            record: self,
            category: category.into(),
            date,
            timestamp,
        }
    }
}

/// A record as stored in the dataset or archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DatasetRow {
    #[serde(flatten)]
    pub record: Record,

    /// Category (or "discount") of the query that produced the record
    pub category: String,

    /// Local calendar date of the scrape
    pub date: NaiveDate,

    /// Instant of the scrape
    pub timestamp: DateTime<Utc>,
}

impl DatasetRow {
    pub fn dedup_key(&self) -> &str {
        self.record.dedup_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let record: Record = serde_json::from_str("{}").unwrap();
        assert_eq!(record, Record::default());
        assert_eq!(record.name, UNKNOWN_PRODUCT);
    }

    #[test]
    fn test_dedup_key_prefers_url() {
        let mut record = Record {
            name: "Milk | 2L".to_string(),
            ..Record::default()
        };
        assert_eq!(record.dedup_key(), "Milk | 2L");

        record.url = Some("https://example.com/product/milk-2l-123".to_string());
        assert_eq!(record.dedup_key(), "https://example.com/product/milk-2l-123");
    }

    #[test]
    fn test_is_discounted_needs_lower_current_price() {
        let mut record = Record {
            price: Some("$3.00".to_string()),
            promotion: Some("New".to_string()),
            on_special: true,
            ..Record::default()
        };
        assert!(!record.is_discounted());

        record.was_price = Some("$4.00".to_string());
        assert!(record.is_discounted());

        record.was_price = Some("$3.00".to_string());
        assert!(!record.is_discounted());

        record.price = None;
        record.was_price = Some("$4.00".to_string());
        assert!(!record.is_discounted());
    }

    #[test]
    fn test_row_flattens_record() {
        let row = Record {
            name: "Bread".to_string(),
            price: Some("$3.00".to_string()),
            ..Record::default()
        }
        .stamp(
            "bakery",
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            "2026-01-02T03:04:05Z".parse().unwrap(),
        );

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["name"], "Bread");
        assert_eq!(value["category"], "bakery");
        assert_eq!(value["date"], "2026-01-02");

        let back: DatasetRow = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }
}
