// src/models/detail.rs

//! Product detail pages.

use serde::{Deserialize, Serialize};

/// Facts read from a single product's own page.
///
/// Limits and the product code keep the page's wording (e.g.
/// "Retail limit: 20"); [`ProductDetail::code`] strips the label.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDetail {
    /// Page the detail was read from
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub brand_url: Option<String>,
    /// Breadcrumb trail, outermost first
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub retail_limit: Option<String>,
    #[serde(default)]
    pub promotional_limit: Option<String>,
    #[serde(default)]
    pub product_code: Option<String>,
}

impl ProductDetail {
    /// The product code without its "Code:" label.
    pub fn code(&self) -> Option<&str> {
        self.product_code
            .as_deref()
            .map(|code| code.rsplit(':').next().unwrap_or(code).trim())
            .filter(|code| !code.is_empty())
    }

    /// True when the page yielded none of the detail fields.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand_name.is_none()
            && self.categories.is_empty()
            && self.retail_limit.is_none()
            && self.promotional_limit.is_none()
            && self.product_code.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strips_label() {
        let detail = ProductDetail {
            product_code: Some("Code: 8060378".to_string()),
            ..ProductDetail::default()
        };
        assert_eq!(detail.code(), Some("8060378"));

        let bare = ProductDetail {
            product_code: Some("8060378".to_string()),
            ..ProductDetail::default()
        };
        assert_eq!(bare.code(), Some("8060378"));
        assert_eq!(ProductDetail::default().code(), None);
    }

    #[test]
    fn test_is_empty() {
        let mut detail = ProductDetail {
            url: "https://x/product/a-1".to_string(),
            ..ProductDetail::default()
        };
        assert!(detail.is_empty());
        detail.categories.push("Pantry".to_string());
        assert!(!detail.is_empty());
    }
}
