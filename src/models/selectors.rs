// src/models/selectors.rs

//! CSS selectors describing one revision of the listing and product page
//! markup.

use serde::{Deserialize, Serialize};

/// CSS selectors for pulling product tiles out of a listing page.
///
/// The retailer's markup changes over time; swapping this value in the
/// configuration is how a new page format is supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectorSet {
    /// Selector for each product tile on the page
    #[serde(default = "defaults::tile")]
    pub tile_selector: String,

    /// Selector for the product name within a tile
    #[serde(default = "defaults::name")]
    pub name_selector: String,

    /// Selector for the displayed price
    #[serde(default = "defaults::price")]
    pub price_selector: String,

    /// Selector for the unit price / "was" price line
    #[serde(default = "defaults::price_basis")]
    pub price_basis_selector: String,

    /// Selector for the secondary price description
    #[serde(default = "defaults::price_basis_detail")]
    pub price_basis_detail_selector: String,

    /// Selector for the product link element
    #[serde(default = "defaults::link")]
    pub link_selector: String,

    /// HTML attribute holding the product link (usually "href")
    #[serde(default = "defaults::href")]
    pub link_attr: String,

    /// Selector for the product image element
    #[serde(default = "defaults::image")]
    pub image_selector: String,

    /// HTML attribute holding the image reference (usually "src")
    #[serde(default = "defaults::src")]
    pub image_attr: String,

    /// Promotion badge selectors, tried in order; the first non-empty text wins
    #[serde(default = "defaults::promotion_badges")]
    pub promotion_selectors: Vec<String>,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            tile_selector: defaults::tile(),
            name_selector: defaults::name(),
            price_selector: defaults::price(),
            price_basis_selector: defaults::price_basis(),
            price_basis_detail_selector: defaults::price_basis_detail(),
            link_selector: defaults::link(),
            link_attr: defaults::href(),
            image_selector: defaults::image(),
            image_attr: defaults::src(),
            promotion_selectors: defaults::promotion_badges(),
        }
    }
}

impl SelectorSet {
    /// All selector strings in the set, for validation.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        [
            &self.tile_selector,
            &self.name_selector,
            &self.price_selector,
            &self.price_basis_selector,
            &self.price_basis_detail_selector,
            &self.link_selector,
            &self.image_selector,
        ]
        .into_iter()
        .chain(self.promotion_selectors.iter())
        .map(String::as_str)
    }
}

/// CSS selectors for a single product's detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetailSelectorSet {
    #[serde(default = "defaults::detail_name")]
    pub name_selector: String,

    /// Brand link; its text is the brand name
    #[serde(default = "defaults::brand")]
    pub brand_selector: String,

    /// Breadcrumb entries, in page order
    #[serde(default = "defaults::breadcrumb")]
    pub breadcrumb_selector: String,

    #[serde(default = "defaults::retail_limit")]
    pub retail_limit_selector: String,

    #[serde(default = "defaults::promotional_limit")]
    pub promotional_limit_selector: String,

    #[serde(default = "defaults::product_code")]
    pub product_code_selector: String,
}

impl Default for DetailSelectorSet {
    fn default() -> Self {
        Self {
            name_selector: defaults::detail_name(),
            brand_selector: defaults::brand(),
            breadcrumb_selector: defaults::breadcrumb(),
            retail_limit_selector: defaults::retail_limit(),
            promotional_limit_selector: defaults::promotional_limit(),
            product_code_selector: defaults::product_code(),
        }
    }
}

impl DetailSelectorSet {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        [
            &self.name_selector,
            &self.brand_selector,
            &self.breadcrumb_selector,
            &self.retail_limit_selector,
            &self.promotional_limit_selector,
            &self.product_code_selector,
        ]
        .into_iter()
        .map(String::as_str)
    }
}

mod defaults {
    pub fn tile() -> String {
        r#"section[data-testid="product-tile"]"#.into()
    }
    pub fn name() -> String {
        "h2.product__title".into()
    }
    pub fn price() -> String {
        "span.price__value".into()
    }
    pub fn price_basis() -> String {
        "div.price__calculation_method".into()
    }
    pub fn price_basis_detail() -> String {
        "div.price__calculation_method__description".into()
    }
    pub fn link() -> String {
        "a.product__link".into()
    }
    pub fn href() -> String {
        "href".into()
    }
    pub fn image() -> String {
        "img".into()
    }
    pub fn src() -> String {
        "src".into()
    }
    pub fn promotion_badges() -> Vec<String> {
        vec![
            "span.special-badge".into(),
            "div.special-label".into(),
            "span.badge".into(),
            "div.promotion-badge".into(),
            r#"span[data-testid="special-badge"]"#.into(),
        ]
    }

    // Product page
    pub fn detail_name() -> String {
        "h1.product__title".into()
    }
    pub fn brand() -> String {
        r#"a[data-testid="brand-link"]"#.into()
    }
    pub fn breadcrumb() -> String {
        r#"span[itemprop="name"]"#.into()
    }
    pub fn retail_limit() -> String {
        r#"p[data-testid="retail-limit"]"#.into()
    }
    pub fn promotional_limit() -> String {
        r#"p[data-testid="promotional-limit"]"#.into()
    }
    pub fn product_code() -> String {
        r#"p[data-testid="product-code"]"#.into()
    }
}
