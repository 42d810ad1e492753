// src/services/credential.rs

//! Credential providers.
//!
//! A provider turns a seed URL into a fresh cookie. The real implementation
//! drives a browser session ([`BrowserCredentialProvider`]); the static one
//! hands back a pre-captured cookie and is what tests and browser-less builds
//! use.
//!
//! [`BrowserCredentialProvider`]: crate::services::BrowserCredentialProvider

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Config, Credential};

/// Produces a fresh access credential for a seed URL.
///
/// Implementations may take several seconds and must release every resource
/// they allocate before returning, whether they succeed or fail.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn refresh(&self, seed_url: &str) -> Result<Credential>;
}

/// Returns the same cookie on every refresh.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credential: Option<Credential>,
}

impl StaticCredentialProvider {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn refresh(&self, seed_url: &str) -> Result<Credential> {
        self.credential.clone().ok_or_else(|| {
            AppError::credential(format!(
                "no static cookie configured and no browser available for {seed_url}"
            ))
        })
    }
}

/// Pick the provider matching the build and configuration.
pub fn provider_from_config(config: &Config) -> Arc<dyn CredentialProvider> {
    #[cfg(feature = "browser")]
    {
        Arc::new(crate::services::BrowserCredentialProvider::new(
            config.credential.clone(),
            config.crawler.user_agent.clone(),
        ))
    }

    #[cfg(not(feature = "browser"))]
    {
        log::warn!("Browser support not compiled; cookie refresh falls back to the configured cookie");
        Arc::new(StaticCredentialProvider::new(
            config.credential.cookie.as_deref().map(Credential::new),
        ))
    }
}
