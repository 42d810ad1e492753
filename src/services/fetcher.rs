// src/services/fetcher.rs

//! Authenticated page fetching.
//!
//! [`AuthenticatedFetcher`] owns the current cookie and hides every refresh
//! from its caller: a request is made with the held cookie, and on a transport
//! failure or a block page the cookie is refreshed and the request retried
//! exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::COOKIE;

use crate::error::{AppError, Result};
use crate::models::{Config, Credential, CrawlerConfig};
use crate::services::{BlockDetector, CredentialProvider, PageClass};
use crate::utils::http::create_async_client;

/// A response as seen by the fetcher, before block classification.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub status: u16,
    pub body: String,
}

impl RawPage {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET with the cookie attached.
///
/// Connection-level failures are errors; any HTTP response, including error
/// statuses, is returned as a [`RawPage`] so challenge pages served with 403
/// are still classified by their content.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get(&self, url: &str, credential: &Credential) -> Result<RawPage>;
}

/// [`PageTransport`] over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn get(&self, url: &str, credential: &Credential) -> Result<RawPage> {
        let response = self
            .client
            .get(url)
            .header(COOKIE, credential.as_str())
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AppError::fetch(url, e))?;
        log::debug!("GET {url} -> {status} ({} bytes)", body.len());
        Ok(RawPage { status, body })
    }
}

enum Attempt {
    Content(String),
    Blocked,
}

/// Fetches pages with a cookie, refreshing it on demand.
///
/// Not shareable: each query pipeline owns one, and `fetch` takes `&mut self`
/// so a refresh can never race a request on the same cookie.
pub struct AuthenticatedFetcher<T = HttpTransport> {
    transport: T,
    provider: Arc<dyn CredentialProvider>,
    detector: BlockDetector,
    seed_url: String,
    credential: Option<Credential>,
}

impl AuthenticatedFetcher<HttpTransport> {
    /// Build a live fetcher, picking one seed URL at random from the pool.
    pub fn from_config(config: &Config, provider: Arc<dyn CredentialProvider>) -> Result<Self> {
        let transport = HttpTransport::new(&config.crawler)?;
        let seed_url = choose_seed_url(&config.credential.seed_urls)?;
        let fetcher = Self::new(
            transport,
            provider,
            BlockDetector::from_config(&config.detection),
            seed_url,
        );

        match config.credential.cookie.as_deref().map(Credential::new) {
            Some(cookie) if !cookie.is_empty() => Ok(fetcher.with_credential(cookie)),
            _ => Ok(fetcher),
        }
    }
}

impl<T: PageTransport> AuthenticatedFetcher<T> {
    pub fn new(
        transport: T,
        provider: Arc<dyn CredentialProvider>,
        detector: BlockDetector,
        seed_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            provider,
            detector,
            seed_url: seed_url.into(),
            credential: None,
        }
    }

    /// Start with a pre-captured cookie instead of refreshing on first use.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn seed_url(&self) -> &str {
        &self.seed_url
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Replace the held cookie with a fresh one from the provider.
    ///
    /// On failure the previous cookie, if any, is kept.
    pub async fn refresh_credential(&mut self) -> Result<()> {
        let credential = self.provider.refresh(&self.seed_url).await?;
        if credential.is_empty() {
            return Err(AppError::credential("provider returned an empty cookie"));
        }
        self.credential = Some(credential);
        Ok(())
    }

    /// Fetch a page's content.
    ///
    /// Returns [`AppError::Blocked`] when the page is still blocked after a
    /// refresh, [`AppError::Fetch`] when the retried request fails, and
    /// [`AppError::CredentialRefresh`] when no cookie could be obtained.
    pub async fn fetch(&mut self, url: &str) -> Result<String> {
        if self.credential.is_none() {
            log::info!("No cookie held; refreshing before first request");
            self.refresh_credential().await?;
        }

        match self.attempt(url).await {
            Ok(Attempt::Content(body)) => return Ok(body),
            Ok(Attempt::Blocked) => {
                log::warn!("Blocked on {url}; refreshing cookie and retrying");
            }
            Err(e) => {
                log::warn!("Request to {url} failed: {e}; refreshing cookie and retrying");
            }
        }

        self.refresh_credential().await?;

        match self.attempt(url).await? {
            Attempt::Content(body) => Ok(body),
            Attempt::Blocked => Err(AppError::blocked(url)),
        }
    }

    async fn attempt(&self, url: &str) -> Result<Attempt> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| AppError::credential("no cookie held"))?;

        let page = self
            .transport
            .get(url, credential)
            .await
            .map_err(|e| match e {
                AppError::Http(err) => AppError::fetch(url, err),
                other => other,
            })?;

        if self.detector.classify(&page.body) == PageClass::Blocked {
            return Ok(Attempt::Blocked);
        }
        if !page.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {}", page.status)));
        }
        Ok(Attempt::Content(page.body))
    }
}

/// Pick a seed URL uniformly at random.
pub fn choose_seed_url(pool: &[String]) -> Result<String> {
    if pool.is_empty() {
        return Err(AppError::config("credential.seed_urls is empty"));
    }
    let index = rand::rng().random_range(0..pool.len());
    Ok(pool[index].clone())
}
