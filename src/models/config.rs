//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{DetailSelectorSet, SelectorSet, Target};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Sleep intervals between requests
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Page limits and retry budget
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Browser-backed cookie refresh
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Block page markers
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Listing page markup
    #[serde(default)]
    pub selectors: SelectorSet,

    /// Product detail page markup
    #[serde(default)]
    pub detail_selectors: DetailSelectorSet,

    /// Dataset location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Listings to scrape
    #[serde(default = "defaults::targets")]
    pub targets: Vec<Target>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        url::Url::parse(&self.crawler.base_url)
            .map_err(|e| AppError::validation(format!("crawler.base_url: {e}")))?;
        if self.pagination.max_pages == 0 {
            return Err(AppError::validation("pagination.max_pages must be > 0"));
        }
        if self.credential.seed_urls.is_empty() {
            return Err(AppError::validation("credential.seed_urls is empty"));
        }
        for seed in &self.credential.seed_urls {
            url::Url::parse(seed)
                .map_err(|e| AppError::validation(format!("seed url '{seed}': {e}")))?;
        }
        if self.detection.block_markers.iter().all(|m| m.is_empty()) {
            return Err(AppError::validation("detection.block_markers is empty"));
        }
        for selector in self.selectors.all().chain(self.detail_selectors.all()) {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            pacing: PacingConfig::default(),
            pagination: PaginationConfig::default(),
            credential: CredentialConfig::default(),
            detection: DetectionConfig::default(),
            selectors: SelectorSet::default(),
            detail_selectors: DetailSelectorSet::default(),
            storage: StorageConfig::default(),
            targets: defaults::targets(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Number of query pipelines allowed to run at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Site root used to build listing URLs and resolve relative links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            base_url: defaults::base_url(),
        }
    }
}

/// Sleep intervals used to stay under the defenses' radar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Pause between successful pages
    #[serde(default = "defaults::short_ms")]
    pub short_ms: u64,

    /// Pause after a credential refresh or a skipped page
    #[serde(default = "defaults::medium_ms")]
    pub medium_ms: u64,

    /// Back-off after a block page
    #[serde(default = "defaults::long_ms")]
    pub long_ms: u64,

    /// Pause between queries in one pipeline
    #[serde(default = "defaults::between_queries_ms")]
    pub between_queries_ms: u64,
}

impl PacingConfig {
    pub fn short(&self) -> Duration {
        Duration::from_millis(self.short_ms)
    }

    pub fn medium(&self) -> Duration {
        Duration::from_millis(self.medium_ms)
    }

    pub fn long(&self) -> Duration {
        Duration::from_millis(self.long_ms)
    }

    pub fn between_queries(&self) -> Duration {
        Duration::from_millis(self.between_queries_ms)
    }

    /// No pauses at all.
    pub fn none() -> Self {
        Self {
            short_ms: 0,
            medium_ms: 0,
            long_ms: 0,
            between_queries_ms: 0,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            short_ms: defaults::short_ms(),
            medium_ms: defaults::medium_ms(),
            long_ms: defaults::long_ms(),
            between_queries_ms: defaults::between_queries_ms(),
        }
    }
}

/// Page limits and block recovery budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Safety ceiling on pages per query
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Same-page retries allowed after block pages before the query aborts
    #[serde(default = "defaults::block_retry_budget")]
    pub block_retry_budget: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            block_retry_budget: defaults::block_retry_budget(),
        }
    }
}

/// Browser session settings for obtaining a fresh cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Known-good warm-up pages; one is picked per fetcher
    #[serde(default = "defaults::seed_urls")]
    pub seed_urls: Vec<String>,

    /// Delay between the two warm-up loads
    #[serde(default = "defaults::settle_secs")]
    pub settle_secs: u64,

    /// Upper bound on one whole refresh
    #[serde(default = "defaults::wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    /// Element that signals the warm-up page has rendered
    #[serde(default = "defaults::ready_selector")]
    pub ready_selector: String,

    /// Run the browser without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Pre-captured cookie used before the first refresh
    #[serde(default)]
    pub cookie: Option<String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            seed_urls: defaults::seed_urls(),
            settle_secs: defaults::settle_secs(),
            wait_timeout_secs: defaults::wait_timeout_secs(),
            ready_selector: defaults::ready_selector(),
            headless: defaults::headless(),
            chrome_path: None,
            cookie: None,
        }
    }
}

/// Block page signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "defaults::block_markers")]
    pub block_markers: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            block_markers: defaults::block_markers(),
        }
    }
}

/// Dataset location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::storage_root(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::Target;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/129.0.0.0 Safari/537.36 Edg/129.0.0.0"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        1
    }
    pub fn base_url() -> String {
        "https://www.coles.com.au".into()
    }

    // Pacing defaults
    pub fn short_ms() -> u64 {
        3_500
    }
    pub fn medium_ms() -> u64 {
        10_000
    }
    pub fn long_ms() -> u64 {
        30_000
    }
    pub fn between_queries_ms() -> u64 {
        300_000
    }

    // Pagination defaults
    pub fn max_pages() -> u32 {
        300
    }
    pub fn block_retry_budget() -> u32 {
        2
    }

    // Credential defaults
    pub fn seed_urls() -> Vec<String> {
        vec![
            "https://www.coles.com.au/browse/fruit-vegetables".into(),
            "https://www.coles.com.au/browse/frozen".into(),
            "https://www.coles.com.au/browse/dairy-eggs-fridge".into(),
            "https://www.coles.com.au/browse/household".into(),
        ]
    }
    pub fn settle_secs() -> u64 {
        5
    }
    pub fn wait_timeout_secs() -> u64 {
        30
    }
    pub fn ready_selector() -> String {
        "#coles-targeting-header-container".into()
    }
    pub fn headless() -> bool {
        true
    }

    // Detection defaults
    pub fn block_markers() -> Vec<String> {
        vec!["Incapsula".into(), "Pardon Our Interruption".into()]
    }

    // Storage defaults
    pub fn storage_root() -> PathBuf {
        PathBuf::from("data")
    }

    // Target defaults
    pub fn targets() -> Vec<Target> {
        [
            "fruit-vegetables",
            "dairy-eggs-fridge",
            "pantry",
            "meat-seafood",
            "bakery",
            "frozen",
            "household",
            "health-beauty",
            "deli",
            "pet",
            "baby",
            "liquor",
        ]
        .into_iter()
        .map(Target::browse)
        .collect()
    }
}
