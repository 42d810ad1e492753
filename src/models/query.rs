// src/models/query.rs

//! Listing targets and the page-by-page queries built from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `pid` parameter used by the specials listing.
const SPECIALS_PID: &str = "offers_modular3_special";

/// Category stamped onto records collected from the specials listing.
pub const DISCOUNT_CATEGORY: &str = "discount";

/// Discount set name for the unfiltered specials listing.
pub const ALL_SPECIALS: &str = "all";

/// A logical listing to page through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A category browse listing (e.g. "pantry")
    Browse { category: String },

    /// The on-special listing, optionally narrowed by a special type
    Specials {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },
}

impl Target {
    pub fn browse(category: impl Into<String>) -> Self {
        Self::Browse {
            category: category.into(),
        }
    }

    pub fn specials(filter: Option<&str>) -> Self {
        Self::Specials {
            filter: filter.map(str::to_string),
        }
    }

    /// Category recorded on every row this target produces.
    pub fn category(&self) -> &str {
        match self {
            Self::Browse { category } => category,
            Self::Specials { .. } => DISCOUNT_CATEGORY,
        }
    }

    /// Whether only discounted records should be kept.
    pub fn specials_only(&self) -> bool {
        matches!(self, Self::Specials { .. })
    }

    /// Name of the discount dataset a specials target is merged into.
    ///
    /// `None` for browse targets, which share the product dataset.
    pub fn discount_set(&self) -> Option<&str> {
        match self {
            Self::Browse { .. } => None,
            Self::Specials { filter } => Some(filter.as_deref().unwrap_or(ALL_SPECIALS)),
        }
    }

    /// Listing URL for the given page. Pure function of (target, page).
    pub fn url(&self, base_url: &str, page: u32) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::Browse { category } if page <= 1 => format!("{base}/browse/{category}"),
            Self::Browse { category } => format!("{base}/browse/{category}?page={page}"),
            Self::Specials { filter } => {
                let mut url = format!("{base}/on-special?pid={SPECIALS_PID}");
                if let Some(filter) = filter {
                    url.push_str(&format!("&filter_Special={filter}"));
                }
                url.push_str(&format!("&page={page}"));
                url
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browse { category } => write!(f, "browse:{category}"),
            Self::Specials { filter: Some(filter) } => write!(f, "specials:{filter}"),
            Self::Specials { filter: None } => write!(f, "specials:all"),
        }
    }
}

/// A target plus a page counter that only moves forward.
#[derive(Debug, Clone)]
pub struct Query {
    target: Target,
    base_url: String,
    page: u32,
}

impl Query {
    /// Start a query at page 1.
    pub fn new(base_url: impl Into<String>, target: Target) -> Self {
        Self {
            target,
            base_url: base_url.into(),
            page: 1,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// URL of the current page.
    pub fn url(&self) -> String {
        self.target.url(&self.base_url, self.page)
    }

    /// Move to the next page.
    pub fn advance(&mut self) {
        self.page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://shop.example.com";

    #[test]
    fn test_browse_urls() {
        let target = Target::browse("pantry");
        assert_eq!(target.url(BASE, 1), "https://shop.example.com/browse/pantry");
        assert_eq!(
            target.url("https://shop.example.com/", 3),
            "https://shop.example.com/browse/pantry?page=3"
        );
    }

    #[test]
    fn test_specials_urls() {
        assert_eq!(
            Target::specials(None).url(BASE, 1),
            "https://shop.example.com/on-special?pid=offers_modular3_special&page=1"
        );
        assert_eq!(
            Target::specials(Some("halfprice")).url(BASE, 2),
            "https://shop.example.com/on-special?pid=offers_modular3_special&filter_Special=halfprice&page=2"
        );
    }

    #[test]
    fn test_discount_set_per_filter() {
        assert_eq!(Target::browse("pantry").discount_set(), None);
        assert_eq!(Target::specials(None).discount_set(), Some(ALL_SPECIALS));
        assert_eq!(
            Target::specials(Some("halfprice")).discount_set(),
            Some("halfprice")
        );
    }

    #[test]
    fn test_query_advances() {
        let mut query = Query::new(BASE, Target::browse("frozen"));
        assert_eq!(query.page(), 1);
        query.advance();
        assert_eq!(query.page(), 2);
        assert_eq!(query.url(), "https://shop.example.com/browse/frozen?page=2");
    }

    #[test]
    fn test_target_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            targets: Vec<Target>,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[targets]]
            kind = "browse"
            category = "bakery"

            [[targets]]
            kind = "specials"
            filter = "halfprice"

            [[targets]]
            kind = "specials"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.targets[0], Target::browse("bakery"));
        assert_eq!(parsed.targets[1], Target::specials(Some("halfprice")));
        assert_eq!(parsed.targets[2].category(), DISCOUNT_CATEGORY);
        assert_eq!(parsed.targets[2].to_string(), "specials:all");
    }
}
