//! One lazy-load trigger cycle
//!
//! Pokes every mechanism the bill list's lazy loader is known to react to:
//! a window scroll event, the page's lazy-load instance, the list's custom
//! events, and optionally a real scroll-and-restore for viewport loaders.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::config::TriggerConfig;
use super::tracker::{ScrollBusy, ScrollSignalTracker};
use crate::page::{HostPage, LazyInstanceUpdate};
use crate::utils::constants::{SCRIPT_SCROLL_SETTLE_MS, SEMANTIC_EVENTS};

/// What a trigger cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Real scrolling is disabled; only events were dispatched
    EventsOnly,
    /// Scrolled forward; the restore runs in the background
    Scrolled,
    /// The user was scrolling, so the real scroll was skipped
    SkippedUserActive,
    /// An earlier cycle's scroll was still awaiting its restore
    SkippedScrollInFlight,
}

pub struct SyntheticActivityTrigger {
    page: Arc<dyn HostPage>,
    tracker: Arc<ScrollSignalTracker>,
    config: TriggerConfig,
    root_container: String,
}

macro_rules! chatter {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            debug!($($arg)+);
        } else {
            trace!($($arg)+);
        }
    };
}

impl SyntheticActivityTrigger {
    pub fn new(
        page: Arc<dyn HostPage>,
        tracker: Arc<ScrollSignalTracker>,
        config: TriggerConfig,
        root_container: impl Into<String>,
    ) -> Self {
        Self {
            page,
            tracker,
            config,
            root_container: root_container.into(),
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Run one cycle. Never fails: every page error is logged and absorbed.
    pub async fn fire(&self) -> FireOutcome {
        let debug = self.config.debug();
        chatter!(debug, "Triggering lazy load");

        if let Err(e) = self.page.dispatch_window_event("scroll").await {
            warn!("Dispatching window scroll event failed: {}", e);
        }

        match self.page.update_lazy_instance().await {
            Ok(LazyInstanceUpdate::Updated) => chatter!(debug, "LazyLoad instance updated"),
            Ok(LazyInstanceUpdate::Absent) => {}
            Err(e) => chatter!(debug, "LazyLoad update failed: {}", e),
        }

        self.dispatch_semantic_events().await;

        if !self.config.use_real_scroll() {
            return FireOutcome::EventsOnly;
        }

        match self
            .tracker
            .try_begin_script_scroll(self.config.user_scroll_pause())
        {
            Ok(()) => {}
            Err(ScrollBusy::UserActive) => {
                chatter!(debug, "User is scrolling, skipping real scroll");
                return FireOutcome::SkippedUserActive;
            }
            Err(ScrollBusy::ScriptInFlight) => {
                chatter!(debug, "Previous scroll not restored yet, skipping real scroll");
                return FireOutcome::SkippedScrollInFlight;
            }
        }

        // Read while holding the flag, never mid-way through another cycle's scroll
        let original_offset = match self.page.scroll_offset().await {
            Ok(offset) => offset,
            Err(e) => {
                self.tracker.end_script_scroll();
                warn!("Could not read scroll offset, skipping real scroll: {}", e);
                return FireOutcome::EventsOnly;
            }
        };

        if let Err(e) = self.page.scroll_by(self.config.scroll_amount_px()).await {
            self.tracker.end_script_scroll();
            warn!("Scroll failed: {}", e);
            return FireOutcome::EventsOnly;
        }

        // Detached so that stopping the trigger loop cannot strand the page
        // at the script-induced offset.
        let page = self.page.clone();
        let tracker = self.tracker.clone();
        let restore_delay = self.config.restore_delay();
        tokio::spawn(async move {
            tokio::time::sleep(restore_delay).await;
            if let Err(e) = page.scroll_to(original_offset).await {
                warn!("Restoring scroll offset {} failed: {}", original_offset, e);
            }
            tokio::time::sleep(Duration::from_millis(SCRIPT_SCROLL_SETTLE_MS)).await;
            tracker.end_script_scroll();
        });

        FireOutcome::Scrolled
    }

    async fn dispatch_semantic_events(&self) {
        match self.page.element_exists(&self.root_container).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                warn!("Looking up {} failed: {}", self.root_container, e);
                return;
            }
        }

        for event in SEMANTIC_EVENTS {
            if let Err(e) = self
                .page
                .dispatch_element_event(&self.root_container, event)
                .await
            {
                chatter!(self.config.debug(), "Dispatching {} failed: {}", event, e);
            }
        }
    }
}
