// src/services/browser.rs

//! Browser-backed cookie refresh.
//!
//! Loads the seed page twice in a real Chromium session: the first load makes
//! the server issue its bot-defense cookies, the second (after a settle delay)
//! confirms they are attached to requests for the seed origin. The cookies the
//! browser would send to the seed URL become the new credential.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::GetCookiesParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Credential, CredentialConfig};
use crate::services::CredentialProvider;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Captures cookies from a short-lived Chromium session.
pub struct BrowserCredentialProvider {
    config: CredentialConfig,
    user_agent: String,
    // One browser at a time, even when several pipelines share this provider.
    launch: Mutex<()>,
}

impl BrowserCredentialProvider {
    pub fn new(config: CredentialConfig, user_agent: String) -> Self {
        Self {
            config,
            user_agent,
            launch: Mutex::new(()),
        }
    }

    async fn launch_browser(&self) -> Result<(Browser, JoinHandle<()>)> {
        log::info!("Launching browser (headless={})", self.config.headless);

        let mut builder = BrowserConfig::builder();
        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        let config = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .arg("--ignore-certificate-errors")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .build()
            .map_err(AppError::credential)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::credential(format!("failed to launch browser: {e}")))?;

        let task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok((browser, task))
    }

    async fn capture(&self, browser: &Browser, seed_url: &str) -> Result<Credential> {
        let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(cdp_error)?;

        let settle = Duration::from_secs(self.config.settle_secs);
        for load in 1..=2 {
            log::debug!("Warm-up load {load}/2: {seed_url}");
            page.goto(seed_url).await.map_err(cdp_error)?;
            self.wait_until_ready(&page).await;
            tokio::time::sleep(settle).await;
        }

        let params = GetCookiesParams::builder()
            .urls(vec![seed_url.to_string()])
            .build();
        let cookies = page.execute(params).await.map_err(cdp_error)?.result.cookies;
        let _ = page.close().await;

        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return Err(AppError::credential(format!(
                "no cookies were issued for {seed_url}"
            )));
        }
        Ok(Credential::new(header))
    }

    /// Poll for the ready selector; the outer timeout bounds the wait.
    async fn wait_until_ready(&self, page: &Page) {
        loop {
            if page
                .find_element(self.config.ready_selector.as_str())
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl CredentialProvider for BrowserCredentialProvider {
    async fn refresh(&self, seed_url: &str) -> Result<Credential> {
        let _guard = self.launch.lock().await;
        log::info!("Refreshing cookie using seed url: {seed_url}");

        let (mut browser, handler) = self.launch_browser().await?;
        let limit = Duration::from_secs(self.config.wait_timeout_secs);
        let outcome = tokio::time::timeout(limit, self.capture(&browser, seed_url)).await;

        if let Err(e) = browser.close().await {
            log::debug!("Browser close failed: {e}");
        }
        let _ = browser.wait().await;
        handler.abort();

        match outcome {
            Ok(Ok(credential)) => {
                log::info!("Captured cookie ({} chars)", credential.as_str().len());
                Ok(credential)
            }
            Ok(Err(e)) => {
                log::warn!("Cookie refresh failed: {e}");
                Err(e)
            }
            Err(_) => Err(AppError::credential(format!(
                "no cookie captured within {}s",
                self.config.wait_timeout_secs
            ))),
        }
    }
}

fn cdp_error(e: chromiumoxide::error::CdpError) -> AppError {
    AppError::credential(e)
}
