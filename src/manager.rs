//! Browser instance manager
//!
//! Owns the one browser a harvesting run uses.
//!
//! # Async Lock Requirements
//!
//! Must use `tokio::sync::Mutex`: browser operations are async and the guard
//! is held across `.await` points.

use anyhow::Result;
use chromiumoxide::page::Page;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::browser::{BrowserWrapper, launch_browser, open_page};
use crate::config::BrowserConfig;

/// Manager for the harvester's browser with health checking and crash recovery
///
/// Every `get_or_launch()` checks the browser with a `version()` CDP call and
/// relaunches it if it has died.
pub struct BrowserManager {
    config: BrowserConfig,
    browser: Arc<Mutex<Option<BrowserWrapper>>>,
}

impl BrowserManager {
    /// Browser is launched lazily on first use
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    /// Get or launch the shared browser instance
    ///
    /// Returns the browser Mutex; callers lock it to reach the wrapper.
    pub async fn get_or_launch(&self) -> Result<Arc<Mutex<Option<BrowserWrapper>>>> {
        let mut guard = self.browser.lock().await;

        if let Some(wrapper) = guard.as_ref() {
            match wrapper.browser().version().await {
                Ok(_) => {
                    tracing::debug!("Browser health check passed, reusing existing browser");
                    drop(guard);
                    return Ok(self.browser.clone());
                }
                Err(e) => {
                    tracing::warn!("Browser health check failed: {}. Triggering recovery...", e);

                    if let Some(mut crashed_wrapper) = guard.take() {
                        // Best-effort cleanup (may fail if process already dead)
                        let _ = crashed_wrapper.browser_mut().close().await;
                        let _ = crashed_wrapper.browser_mut().wait().await;
                        crashed_wrapper.cleanup_temp_dir();
                    }
                }
            }
        }

        tracing::info!("Launching browser (first time or after recovery)");
        let wrapper = launch_browser(&self.config).await?;
        *guard = Some(wrapper);
        drop(guard);

        Ok(self.browser.clone())
    }

    /// Open the admin panel in a fresh tab
    pub async fn open(&self, url: &str) -> Result<Page> {
        let browser_arc = self.get_or_launch().await?;
        let guard = browser_arc.lock().await;
        let wrapper = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Browser not available after launch"))?;
        Ok(open_page(wrapper, url).await?)
    }

    /// Shutdown the browser if running
    ///
    /// Safe to call multiple times. Both `close()` and `wait()` are needed:
    /// dropping the wrapper only aborts the handler task and would leave a
    /// zombie Chrome process behind.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;

        if let Some(mut wrapper) = guard.take() {
            info!("Shutting down browser");

            if let Err(e) = wrapper.browser_mut().close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }

            if let Err(e) = wrapper.browser_mut().wait().await {
                tracing::warn!("Failed to wait for browser exit: {}", e);
            }

            wrapper.cleanup_temp_dir();
        }

        Ok(())
    }

    pub async fn is_browser_running(&self) -> bool {
        self.browser.lock().await.is_some()
    }
}
