//! Page context: the owner of everything lazy-load related on one tab

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::config::{LazyLoadSettings, TriggerConfig};
use super::controller::TriggerLoopController;
use super::tracker::ScrollSignalTracker;
use super::trigger::{FireOutcome, SyntheticActivityTrigger};
use crate::page::HostPage;
use crate::utils::{HarvestError, HarvestResult};

/// Commands a controlling process sends to a page context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LazyLoadCommand {
    InitLazyLoad { config: LazyLoadSettings },
    StopLazyLoad,
}

impl LazyLoadCommand {
    pub fn from_json(raw: &str) -> HarvestResult<Self> {
        serde_json::from_str(raw).map_err(|e| HarvestError::InvalidCommand(e.to_string()))
    }
}

/// Control surface for page-level code and the batch driver
#[derive(Clone)]
pub struct LazyLoadHandle {
    controller: Arc<TriggerLoopController>,
    direct: Option<Arc<SyntheticActivityTrigger>>,
}

impl LazyLoadHandle {
    pub fn start(&self) {
        self.controller.start();
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Whether `trigger_lazy_load` is available
    pub fn has_direct_trigger(&self) -> bool {
        self.direct.is_some()
    }

    /// Run one cycle now without waiting for the timer. `None` when the
    /// handle does not expose a direct trigger.
    pub async fn trigger_lazy_load(&self) -> Option<FireOutcome> {
        match &self.direct {
            Some(trigger) => Some(trigger.fire().await),
            None => None,
        }
    }

    pub fn controller(&self) -> &Arc<TriggerLoopController> {
        &self.controller
    }
}

struct Installed {
    tracker: Arc<ScrollSignalTracker>,
    handle: LazyLoadHandle,
}

/// Owns the page, its scroll tracker and at most one trigger controller
pub struct PageContext {
    page: Arc<dyn HostPage>,
    root_container: String,
    installed: Mutex<Option<Installed>>,
}

impl PageContext {
    pub fn new(page: Arc<dyn HostPage>, root_container: impl Into<String>) -> Self {
        Self {
            page,
            root_container: root_container.into(),
            installed: Mutex::new(None),
        }
    }

    pub fn page(&self) -> &Arc<dyn HostPage> {
        &self.page
    }

    pub async fn handle_command(&self, command: LazyLoadCommand) -> HarvestResult<()> {
        match command {
            LazyLoadCommand::InitLazyLoad { config } => self.init_lazy_load(&config).await,
            LazyLoadCommand::StopLazyLoad => {
                self.stop_lazy_load();
                Ok(())
            }
        }
    }

    /// Replace any prior controller with a new one built from `settings`,
    /// and start it
    pub async fn init_lazy_load(&self, settings: &LazyLoadSettings) -> HarvestResult<()> {
        let config = TriggerConfig::try_from(settings).inspect_err(|e| {
            warn!("Invalid config received: {}", e);
        })?;

        self.uninstall().await;

        match self.page.count_lazy_elements().await {
            Ok(count) => info!("Found {} possible lazy-load elements", count),
            Err(e) => warn!("Counting lazy-load elements failed: {}", e),
        }

        let tracker = Arc::new(ScrollSignalTracker::new(config.detect_user_scroll()));
        if let Err(e) = tracker.observe(self.page.clone()).await {
            warn!("User scroll detection unavailable: {}", e);
        }

        let trigger = Arc::new(SyntheticActivityTrigger::new(
            self.page.clone(),
            tracker.clone(),
            config,
            self.root_container.clone(),
        ));
        let controller = Arc::new(TriggerLoopController::new(trigger.clone()));
        let handle = LazyLoadHandle {
            controller,
            direct: settings.expose_direct_trigger.then_some(trigger),
        };
        handle.start();

        *self.installed.lock() = Some(Installed { tracker, handle });
        Ok(())
    }

    pub fn stop_lazy_load(&self) {
        if let Some(installed) = self.installed.lock().as_ref() {
            installed.handle.stop();
        }
    }

    /// The current lazy-load handle, if INIT_LAZY_LOAD has been handled
    pub fn handle(&self) -> Option<LazyLoadHandle> {
        self.installed
            .lock()
            .as_ref()
            .map(|installed| installed.handle.clone())
    }

    /// Stop the controller and remove the scroll listeners. Idempotent.
    pub async fn teardown(&self) {
        self.uninstall().await;
        match self.page.count_lazy_elements().await {
            Ok(count) => info!("{} lazy-load elements still unresolved", count),
            Err(e) => warn!("Counting lazy-load elements failed: {}", e),
        }
    }

    async fn uninstall(&self) {
        let installed = self.installed.lock().take();
        if let Some(installed) = installed {
            installed.handle.stop();
            installed.tracker.teardown().await;
        }
    }
}

impl Drop for PageContext {
    fn drop(&mut self) {
        if let Some(installed) = self.installed.get_mut().take() {
            installed.handle.stop();
            installed.tracker.teardown_detached();
        }
    }
}
