//! Browser lifecycle for the harvester
//!
//! Launches a chromiumoxide browser with its own profile directory and opens
//! the admin panel tab.

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;

use super::{BrowserError, BrowserResult};
use crate::config::BrowserConfig;

/// Wrapper for Browser and its event handler task
///
/// The handler MUST be aborted when the browser goes away, otherwise it
/// keeps polling a dead connection.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(browser: Browser, handler: JoinHandle<()>, user_data_dir: PathBuf) -> Self {
        Self {
            browser,
            handler,
            user_data_dir: Some(user_data_dir),
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub(crate) fn browser_mut(&mut self) -> &mut Browser {
        &mut self.browser
    }

    /// Remove the profile directory.
    ///
    /// MUST be called AFTER `browser.wait()` completes so Chrome has released
    /// its file handles. Blocking, because it also runs from Drop paths.
    pub fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            info!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::warn!(
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        info!("Dropping BrowserWrapper - aborting handler task");
        self.handler.abort();

        if let Some(path) = &self.user_data_dir {
            tracing::warn!(
                "BrowserWrapper dropped without explicit cleanup. \
                Temp directory will be orphaned: {}. \
                Call BrowserManager::shutdown() before dropping.",
                path.display()
            );
        }
    }
}

/// Launch a browser for one harvesting run
///
/// Each process gets its own profile directory so a second harvester does
/// not trip over Chrome's profile lock.
pub async fn launch_browser(config: &BrowserConfig) -> BrowserResult<BrowserWrapper> {
    info!("Launching harvester browser");

    let user_data_dir =
        std::env::temp_dir().join(format!("order_harvester_{}", std::process::id()));

    let (browser, handler) = crate::browser_setup::launch_browser(
        config.headless,
        Some(user_data_dir.clone()),
        config.disable_security,
        (config.window.width, config.window.height),
    )
    .await
    .map_err(|e| BrowserError::LaunchFailed(format!("{:#}", e)))?;

    Ok(BrowserWrapper::new(browser, handler, user_data_dir))
}

/// Open `url` in a new tab and wait for the navigation to finish
pub async fn open_page(wrapper: &BrowserWrapper, url: &str) -> BrowserResult<Page> {
    let page = wrapper
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

    page.goto(url)
        .await
        .map_err(|e| BrowserError::NavigationFailed(format!("{}: {}", url, e)))?;

    info!("Opened {}", url);
    Ok(page)
}
