//! User scroll detection
//!
//! Classifies the page as "user is scrolling" or quiet so synthetic scrolling
//! never competes with a human. Script-driven scrolls are excluded via the
//! `is_script_scrolling` flag, which the trigger sets and clears.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::page::{HostPage, ScrollSignal};
use crate::utils::HarvestResult;
use crate::utils::constants::USER_SCROLL_QUIET_MS;

/// Scroll classification shared between the tracker and the trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub is_user_scrolling: bool,
    pub last_user_scroll: Option<Instant>,
    pub is_script_scrolling: bool,
}

impl ScrollState {
    /// Record a real input event. Returns false when the event was caused
    /// by the script's own scrolling and was ignored.
    fn note_user_input(&mut self, now: Instant) -> bool {
        if self.is_script_scrolling {
            return false;
        }
        self.is_user_scrolling = true;
        self.last_user_scroll = Some(now);
        true
    }

    fn is_quiet(&self, pause: Duration, now: Instant) -> bool {
        if self.is_user_scrolling {
            return false;
        }
        match self.last_user_scroll {
            Some(last) => now.saturating_duration_since(last) >= pause,
            None => true,
        }
    }
}

/// Why a real scroll could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBusy {
    /// The user is scrolling or stopped less than the pause ago
    UserActive,
    /// An earlier cycle's scroll has not been restored yet
    ScriptInFlight,
}

struct Observer {
    token: CancellationToken,
    task: JoinHandle<()>,
    page: Arc<dyn HostPage>,
}

impl Observer {
    fn stop(&self) {
        self.token.cancel();
        self.task.abort();
    }
}

pub struct ScrollSignalTracker {
    state: Arc<Mutex<ScrollState>>,
    detect: bool,
    quiet_period: Duration,
    observer: Mutex<Option<Observer>>,
}

impl ScrollSignalTracker {
    /// `detect: false` makes the page permanently quiet; no listeners are installed.
    pub fn new(detect: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScrollState::default())),
            detect,
            quiet_period: Duration::from_millis(USER_SCROLL_QUIET_MS),
            observer: Mutex::new(None),
        }
    }

    /// Install the scroll/touch listeners on `page`. A second call while
    /// observing is a no-op.
    pub async fn observe(&self, page: Arc<dyn HostPage>) -> HarvestResult<()> {
        if !self.detect || self.is_observing() {
            return Ok(());
        }

        let signals = page.subscribe_scroll_signals().await?;
        let token = CancellationToken::new();
        let task = tokio::spawn(watch_signals(
            signals,
            self.state.clone(),
            self.quiet_period,
            token.clone(),
        ));

        let mut observer = self.observer.lock();
        if let Some(previous) = observer.replace(Observer { token, task, page }) {
            previous.stop();
        }
        debug!("User scroll detection enabled");
        Ok(())
    }

    pub fn is_observing(&self) -> bool {
        self.observer.lock().is_some()
    }

    /// True when no user scroll is in progress and the last one ended at
    /// least `pause` ago
    pub fn is_quiet(&self, pause: Duration) -> bool {
        if !self.detect {
            return true;
        }
        self.state.lock().is_quiet(pause, Instant::now())
    }

    /// Quiet check and script-scroll flag set as one critical section.
    /// The flag is left untouched when the user is active or another
    /// cycle's scroll is still waiting for its restore.
    pub fn try_begin_script_scroll(&self, pause: Duration) -> Result<(), ScrollBusy> {
        let mut state = self.state.lock();
        if state.is_script_scrolling {
            return Err(ScrollBusy::ScriptInFlight);
        }
        if self.detect && !state.is_quiet(pause, Instant::now()) {
            return Err(ScrollBusy::UserActive);
        }
        state.is_script_scrolling = true;
        Ok(())
    }

    pub fn end_script_scroll(&self) {
        self.state.lock().is_script_scrolling = false;
    }

    pub fn snapshot(&self) -> ScrollState {
        *self.state.lock()
    }

    /// Remove the page listeners, cancel the quiet timer and reset the
    /// state. Safe to call repeatedly, and before `observe`.
    pub async fn teardown(&self) {
        let observer = self.observer.lock().take();
        *self.state.lock() = ScrollState::default();

        if let Some(observer) = observer {
            observer.stop();
            if let Err(e) = observer.page.unsubscribe_scroll_signals().await {
                warn!("Removing scroll listeners failed: {}", e);
            }
            debug!("User scroll detection removed");
        }
    }

    /// `teardown` for synchronous callers. The page-side removal runs on
    /// the current tokio runtime, or is skipped outside one.
    pub fn teardown_detached(&self) {
        let observer = self.observer.lock().take();
        *self.state.lock() = ScrollState::default();

        if let Some(observer) = observer {
            detach_observer(observer);
        }
    }
}

impl Drop for ScrollSignalTracker {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.get_mut().take() {
            detach_observer(observer);
        }
    }
}

fn detach_observer(observer: Observer) {
    observer.stop();
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = observer.page.unsubscribe_scroll_signals().await {
            warn!("Removing scroll listeners failed: {}", e);
        }
    });
}

async fn watch_signals(
    mut signals: mpsc::UnboundedReceiver<ScrollSignal>,
    state: Arc<Mutex<ScrollState>>,
    quiet_period: Duration,
    token: CancellationToken,
) {
    let mut quiet_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            signal = signals.recv() => {
                let Some(signal) = signal else { break };
                let now = Instant::now();
                if state.lock().note_user_input(now) {
                    trace!("User input: {:?}", signal);
                    quiet_deadline = Some(now + quiet_period);
                }
            }
            _ = sleep_until(quiet_deadline.unwrap_or_else(Instant::now)), if quiet_deadline.is_some() => {
                quiet_deadline = None;
                state.lock().is_user_scrolling = false;
                debug!("User stopped scrolling");
            }
        }
    }
}
