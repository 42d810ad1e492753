//! Fakes shared by the integration tests: an in-memory site, a counting
//! cookie provider, and listing markup builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shelfwatch::error::Result;
use shelfwatch::models::{Credential, PacingConfig};
use shelfwatch::services::{
    AuthenticatedFetcher, BlockDetector, CredentialProvider, PageTransport, RawPage,
};

pub const BASE: &str = "https://shop.test";
pub const BLOCK_PAGE: &str = "<html><body><h1>Pardon Our Interruption</h1></body></html>";

type Handler = dyn Fn(&str) -> Result<RawPage> + Send + Sync;

/// In-memory site answering every GET through `handler`.
#[derive(Clone)]
pub struct FakeSite {
    handler: Arc<Handler>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeSite {
    pub fn new(handler: impl Fn(&str) -> Result<RawPage> + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|u| page_of(u)).collect()
    }
}

#[async_trait]
impl PageTransport for FakeSite {
    async fn get(&self, url: &str, _credential: &Credential) -> Result<RawPage> {
        self.requests.lock().unwrap().push(url.to_string());
        (self.handler)(url)
    }
}

/// Hands out `session=N` cookies and counts refreshes.
#[derive(Clone, Default)]
pub struct CountingProvider {
    pub calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CountingProvider {
    async fn refresh(&self, _seed_url: &str) -> Result<Credential> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(format!("session={n}")))
    }
}

pub fn fetcher(site: FakeSite, provider: CountingProvider) -> AuthenticatedFetcher<FakeSite> {
    AuthenticatedFetcher::new(
        site,
        Arc::new(provider),
        BlockDetector::default(),
        format!("{BASE}/"),
    )
    .with_credential(Credential::new("session=0"))
}

/// Page number of a listing URL (page 1 carries no parameter).
pub fn page_of(url: &str) -> u32 {
    url.rsplit_once("page=")
        .and_then(|(_, n)| n.split('&').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

/// A listing page with `count` ordinary product tiles.
pub fn listing(page: u32, count: usize) -> String {
    let tiles: String = (0..count)
        .map(|i| {
            format!(
                r#"<section data-testid="product-tile">
                     <a class="product__link" href="/product/item-p{page}-n{i}-{id}">
                       <h2 class="product__title">Item {page}-{i} | 500g</h2>
                     </a>
                     <span class="price__value">$2.50</span>
                     <div class="price__calculation_method">$0.50 per 100g</div>
                   </section>"#,
                id = 1000 + i
            )
        })
        .collect();
    format!("<html><body>{tiles}</body></html>")
}

/// A tile advertising a reduced price.
pub fn special_tile(slug: &str) -> String {
    format!(
        r#"<section data-testid="product-tile">
             <a class="product__link" href="/product/{slug}-42"></a>
             <h2 class="product__title">{slug} | 1kg</h2>
             <span class="price__value">$3.00</span>
             <div class="price__calculation_method">$0.30 per 100g | Was $4.00 on Jan 2026</div>
           </section>"#
    )
}

pub fn pacing() -> PacingConfig {
    PacingConfig::default()
}

/// A tile with a promotion badge but no previous price.
pub fn badge_tile(slug: &str) -> String {
    format!(
        r#"<section data-testid="product-tile">
             <a class="product__link" href="/product/{slug}-77"></a>
             <h2 class="product__title">{slug} | 200g</h2>
             <span class="badge">New</span>
             <span class="price__value">$5.00</span>
             <div class="price__calculation_method">$2.50 per 100g</div>
           </section>"#
    )
}

/// A product page in the default detail markup.
pub fn product_page(name: &str, code: u32) -> String {
    format!(
        r#"<html><body>
             <span itemprop="name">Home</span>
             <span itemprop="name">Pantry</span>
             <h1 class="product__title">{name}</h1>
             <a data-testid="brand-link" href="/brands/acme-1">Acme</a>
             <p data-testid="product-code">Code: {code}</p>
           </body></html>"#
    )
}
