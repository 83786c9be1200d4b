//! Element polling utility
//!
//! Provides wait_for_element() which polls for DOM elements with exponential backoff.
//! The admin panel renders its bill list via JavaScript after the load event fires,
//! and the operator may still be logging in when the harvester starts.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::element::Element;

use crate::utils::HarvestError;

/// Wait for an element to appear in the DOM using exponential backoff polling
///
/// # Polling Strategy
/// - Starts at 100ms intervals
/// - Doubles each retry (exponential backoff)
/// - Caps at 1 second maximum interval
/// - Total duration limited by timeout parameter
pub async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<Element, HarvestError> {
    let start = tokio::time::Instant::now();
    let mut poll_interval = Duration::from_millis(100);
    let max_interval = Duration::from_secs(1);

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        if start.elapsed() >= timeout {
            return Err(HarvestError::Page(format!(
                "Element not found (timeout after {}ms): '{}'. \
                 Check that the list page is open and the session is logged in.",
                timeout.as_millis(),
                selector
            )));
        }

        tokio::time::sleep(poll_interval).await;

        poll_interval = (poll_interval * 2).min(max_interval);
    }
}
