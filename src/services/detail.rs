// src/services/detail.rs

//! Product detail page extraction.

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DetailSelectorSet, ProductDetail};
use crate::services::extractor::{attr_of, text_of};
use crate::utils::{normalize_whitespace, resolve_url};

/// Converts a product page into a [`ProductDetail`].
pub trait DetailExtractor: Send + Sync {
    /// Fails with [`AppError::Extraction`] when the page carries none of the
    /// detail fields.
    fn extract_detail(&self, url: &str, content: &str) -> Result<ProductDetail>;
}

/// [`DetailExtractor`] for HTML product pages.
#[derive(Debug, Clone)]
pub struct HtmlDetailExtractor {
    name: Selector,
    brand: Selector,
    breadcrumb: Selector,
    retail_limit: Selector,
    promotional_limit: Selector,
    product_code: Selector,
    base_url: Option<Url>,
}

impl HtmlDetailExtractor {
    pub fn new(selectors: &DetailSelectorSet, base_url: Option<&str>) -> Result<Self> {
        let parse =
            |s: &str| Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")));
        Ok(Self {
            name: parse(&selectors.name_selector)?,
            brand: parse(&selectors.brand_selector)?,
            breadcrumb: parse(&selectors.breadcrumb_selector)?,
            retail_limit: parse(&selectors.retail_limit_selector)?,
            promotional_limit: parse(&selectors.promotional_limit_selector)?,
            product_code: parse(&selectors.product_code_selector)?,
            base_url: base_url.map(Url::parse).transpose()?,
        })
    }
}

impl DetailExtractor for HtmlDetailExtractor {
    fn extract_detail(&self, url: &str, content: &str) -> Result<ProductDetail> {
        let document = Html::parse_document(content);
        let root = document.root_element();

        let brand_url = attr_of(root, &self.brand, "href").map(|href| match &self.base_url {
            Some(base) => resolve_url(base, &href).unwrap_or(href),
            None => href,
        });

        let detail = ProductDetail {
            url: url.to_string(),
            name: text_of(root, &self.name),
            brand_name: text_of(root, &self.brand),
            brand_url,
            categories: root
                .select(&self.breadcrumb)
                .map(|el| normalize_whitespace(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .collect(),
            retail_limit: text_of(root, &self.retail_limit),
            promotional_limit: text_of(root, &self.promotional_limit),
            product_code: text_of(root, &self.product_code),
        };

        if detail.is_empty() {
            return Err(AppError::extraction(0, format!("no product details on {url}")));
        }
        Ok(detail)
    }
}
