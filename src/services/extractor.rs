// src/services/extractor.rs

//! Product tile extraction.
//!
//! Turns a listing page into [`Record`]s using a configured [`SelectorSet`].
//! Extraction is tolerant: missing fields become `None`, and a tile that
//! cannot be turned into a record is logged and skipped without affecting its
//! siblings.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Record, SelectorSet, UNKNOWN_PRODUCT};
use crate::utils::{normalize_whitespace, parse_money, resolve_url};

/// Converts page content into product records.
pub trait RecordExtractor: Send + Sync {
    /// Extract every recognizable record, in page order.
    fn extract(&self, content: &str) -> Vec<Record>;
}

/// Text patterns that signal a discount somewhere in a tile.
#[derive(Debug, Clone)]
struct DiscountPatterns {
    was_price: Regex,
    half_price: Regex,
    percentages: Vec<Regex>,
}

impl DiscountPatterns {
    fn new() -> Result<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| AppError::config(format!("{p}: {e}")));
        Ok(Self {
            was_price: compile(r"(?i)was \$([\d,]+\.\d+)")?,
            half_price: compile(r"half price")?,
            percentages: vec![
                compile(r"(\d+)%\s*off")?,
                compile(r"save\s*(\d+)%")?,
                compile(r"(\d+)%\s*discount")?,
            ],
        })
    }
}

/// [`RecordExtractor`] for HTML listing pages.
#[derive(Debug, Clone)]
pub struct HtmlRecordExtractor {
    tile: Selector,
    name: Selector,
    price: Selector,
    price_basis: Selector,
    price_basis_detail: Selector,
    link: Selector,
    link_attr: String,
    image: Selector,
    image_attr: String,
    promotions: Vec<Selector>,
    patterns: DiscountPatterns,
    base_url: Option<Url>,
}

impl HtmlRecordExtractor {
    /// Compile a selector set.
    ///
    /// Relative links are resolved against `base_url` when one is given and
    /// kept verbatim otherwise.
    pub fn new(selectors: &SelectorSet, base_url: Option<&str>) -> Result<Self> {
        Ok(Self {
            tile: Self::parse_selector(&selectors.tile_selector)?,
            name: Self::parse_selector(&selectors.name_selector)?,
            price: Self::parse_selector(&selectors.price_selector)?,
            price_basis: Self::parse_selector(&selectors.price_basis_selector)?,
            price_basis_detail: Self::parse_selector(&selectors.price_basis_detail_selector)?,
            link: Self::parse_selector(&selectors.link_selector)?,
            link_attr: selectors.link_attr.clone(),
            image: Self::parse_selector(&selectors.image_selector)?,
            image_attr: selectors.image_attr.clone(),
            promotions: selectors
                .promotion_selectors
                .iter()
                .map(|s| Self::parse_selector(s))
                .collect::<Result<_>>()?,
            patterns: DiscountPatterns::new()?,
            base_url: base_url.map(Url::parse).transpose()?,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn extract_fragment(&self, index: usize, tile: ElementRef<'_>) -> Result<Record> {
        let price_basis = text_of(tile, &self.price_basis);

        let url = match attr_of(tile, &self.link, &self.link_attr) {
            Some(href) => Some(self.resolve(&href).map_err(|e| {
                AppError::extraction(index, format!("unresolvable link '{href}': {e}"))
            })?),
            None => None,
        };
        let image_url = attr_of(tile, &self.image, &self.image_attr)
            .map(|src| self.resolve(&src).unwrap_or(src));

        let mut record = Record {
            name: text_of(tile, &self.name).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            url,
            price: text_of(tile, &self.price),
            price_basis,
            price_basis_detail: text_of(tile, &self.price_basis_detail),
            image_url,
            ..Record::default()
        };
        self.derive_discount(tile, &mut record);
        Ok(record)
    }

    fn resolve(&self, href: &str) -> Result<String> {
        match &self.base_url {
            Some(base) => resolve_url(base, href),
            None => Ok(href.to_string()),
        }
    }

    /// Fill the discount fields from the price basis, badges, and free text.
    fn derive_discount(&self, tile: ElementRef<'_>, record: &mut Record) {
        if let Some(basis) = &record.price_basis {
            if basis.to_lowercase().contains("was") {
                record.on_special = true;
                if let Some(caps) = self.patterns.was_price.captures(basis) {
                    record.was_price = Some(format!("${}", &caps[1]));
                }
            }
        }

        if let Some(badge) = self.promotions.iter().find_map(|sel| text_of(tile, sel)) {
            record.promotion = Some(badge);
            record.on_special = true;
        }

        let tile_text = tile.text().collect::<Vec<_>>().join(" ").to_lowercase();
        if self.patterns.half_price.is_match(&tile_text) {
            record.on_special = true;
            record.discount_percentage = Some("50%".to_string());
            record.promotion = Some("Half Price".to_string());
        } else if let Some(caps) = self
            .patterns
            .percentages
            .iter()
            .find_map(|re| re.captures(&tile_text))
        {
            record.on_special = true;
            record.discount_percentage = Some(format!("{}%", &caps[1]));
        }

        if record.discount_percentage.is_none() {
            let current = record.price.as_deref().and_then(parse_money);
            let was = record.was_price.as_deref().and_then(parse_money);
            if let (Some(current), Some(was)) = (current, was) {
                if was > 0.0 {
                    let percentage = (was - current) / was * 100.0;
                    record.discount_percentage = Some(format!("{percentage:.0}%"));
                    if (49.0..=51.0).contains(&percentage) {
                        record.promotion = Some("Half Price".to_string());
                    }
                }
            }
        }
    }
}

impl RecordExtractor for HtmlRecordExtractor {
    fn extract(&self, content: &str) -> Vec<Record> {
        let document = Html::parse_document(content);
        let mut records = Vec::new();

        for (index, tile) in document.select(&self.tile).enumerate() {
            match self.extract_fragment(index, tile) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping product tile: {e}"),
            }
        }
        records
    }
}

pub(super) fn text_of(tile: ElementRef<'_>, selector: &Selector) -> Option<String> {
    tile.select(selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

pub(super) fn attr_of(tile: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    tile.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.coles.com.au";

    fn extractor() -> HtmlRecordExtractor {
        HtmlRecordExtractor::new(&SelectorSet::default(), Some(BASE)).unwrap()
    }

    fn tile(inner: &str) -> String {
        format!(r#"<section data-testid="product-tile">{inner}</section>"#)
    }

    #[test]
    fn test_full_tile() {
        let html = tile(
            r#"<a class="product__link" href="/product/milk-2l-123">
                 <h2 class="product__title"> Full Cream Milk | 2L </h2></a>
               <span class="price__value">$3.10</span>
               <div class="price__calculation_method">$1.55 per 1L</div>
               <img src="/img/milk.jpg">"#,
        );
        let records = extractor().extract(&html);
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.name, "Full Cream Milk | 2L");
        assert_eq!(r.url.as_deref(), Some("https://www.coles.com.au/product/milk-2l-123"));
        assert_eq!(r.price.as_deref(), Some("$3.10"));
        assert_eq!(r.price_basis.as_deref(), Some("$1.55 per 1L"));
        assert_eq!(r.image_url.as_deref(), Some("https://www.coles.com.au/img/milk.jpg"));
        assert!(!r.on_special);
        assert_eq!(r.discount_percentage, None);
    }

    #[test]
    fn test_missing_fields_are_none() {
        let records = extractor().extract(&tile("<p>nothing here</p>"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, UNKNOWN_PRODUCT);
        assert_eq!(records[0].url, None);
        assert_eq!(records[0].price, None);
        assert_eq!(records[0].image_url, None);
    }

    #[test]
    fn test_bad_tile_skipped_siblings_kept() {
        let html = format!(
            "{}{}{}",
            tile(r#"<h2 class="product__title">A</h2><a class="product__link" href="/product/a"></a>"#),
            tile(r#"<h2 class="product__title">B</h2><a class="product__link" href="http://[bad"></a>"#),
            tile(r#"<h2 class="product__title">C</h2><a class="product__link" href="/product/c"></a>"#),
        );
        let names: Vec<_> = extractor().extract(&html).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_no_tiles_is_empty() {
        assert!(extractor().extract("<html><body>No results</body></html>").is_empty());
    }

    #[test]
    fn test_without_base_url_links_are_verbatim() {
        let extractor = HtmlRecordExtractor::new(&SelectorSet::default(), None).unwrap();
        let html = tile(r#"<a class="product__link" href="/product/a"></a>"#);
        assert_eq!(extractor.extract(&html)[0].url.as_deref(), Some("/product/a"));
    }

    #[test]
    fn test_was_price_derives_percentage() {
        let html = tile(
            r#"<span class="price__value">$3.00</span>
               <div class="price__calculation_method">$0.75 per 100g | Was $4.00</div>"#,
        );
        let r = &extractor().extract(&html)[0];
        assert!(r.on_special);
        assert_eq!(r.was_price.as_deref(), Some("$4.00"));
        assert_eq!(r.discount_percentage.as_deref(), Some("25%"));
        assert_eq!(r.promotion, None);
    }

    #[test]
    fn test_half_price_from_was_price() {
        let html = tile(
            r#"<span class="price__value">$2.00</span>
               <div class="price__calculation_method">Was $4.00</div>"#,
        );
        let r = &extractor().extract(&html)[0];
        assert_eq!(r.discount_percentage.as_deref(), Some("50%"));
        assert_eq!(r.promotion.as_deref(), Some("Half Price"));
    }

    #[test]
    fn test_half_price_text() {
        let html = tile(r#"<span class="badge">1/2 Price</span><p>HALF PRICE this week</p>"#);
        let r = &extractor().extract(&html)[0];
        assert!(r.on_special);
        assert_eq!(r.discount_percentage.as_deref(), Some("50%"));
        assert_eq!(r.promotion.as_deref(), Some("Half Price"));
    }

    #[test]
    fn test_badge_and_percent_off() {
        let html = tile(r#"<div class="promotion-badge">Special</div><p>Save 30% today</p>"#);
        let r = &extractor().extract(&html)[0];
        assert!(r.on_special);
        assert_eq!(r.promotion.as_deref(), Some("Special"));
        assert_eq!(r.discount_percentage.as_deref(), Some("30%"));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = SelectorSet {
            tile_selector: "[[invalid".to_string(),
            ..SelectorSet::default()
        };
        let err = HtmlRecordExtractor::new(&selectors, None).unwrap_err();
        assert!(matches!(err, AppError::Selector { .. }));
    }
}
