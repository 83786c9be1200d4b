//! Batch search: one input record at a time, scan → trigger → rescan until
//! found or out of attempts, then extract and advance.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::extractor::DetailExtractor;
use super::locator::{RecordLocator, find_match};
use super::types::{
    BatchProgress, BatchReport, BatchStatus, CandidateRow, ExtractedRecord, ItemOutcome,
    SearchInput,
};
use crate::config::{BatchConfig, PageLayout};
use crate::lazy_load::{LazyLoadHandle, PageContext};
use crate::page::HostPage;
use crate::submission::ResultSink;
use crate::utils::constants::CONTROLLER_TICK_MARGIN_MS;

/// How a miss asks the page for more rows. Chosen once per driver.
#[derive(Clone)]
pub enum TriggerBackend {
    /// Run a trigger cycle directly
    DirectHook(LazyLoadHandle),
    /// (Re)start the trigger loop and wait for it
    ControllerStart(LazyLoadHandle),
    /// No lazy-load support installed; jump to the bottom of the page
    RawScrollFallback,
}

impl TriggerBackend {
    pub fn select(handle: Option<LazyLoadHandle>) -> Self {
        match handle {
            Some(handle) if handle.has_direct_trigger() => TriggerBackend::DirectHook(handle),
            Some(handle) => TriggerBackend::ControllerStart(handle),
            None => TriggerBackend::RawScrollFallback,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TriggerBackend::DirectHook(_) => "direct",
            TriggerBackend::ControllerStart(_) => "controller",
            TriggerBackend::RawScrollFallback => "raw-scroll",
        }
    }

    fn handle(&self) -> Option<&LazyLoadHandle> {
        match self {
            TriggerBackend::DirectHook(handle) | TriggerBackend::ControllerStart(handle) => {
                Some(handle)
            }
            TriggerBackend::RawScrollFallback => None,
        }
    }
}

pub struct BatchSearchDriver {
    page: Arc<dyn HostPage>,
    locator: RecordLocator,
    extractor: DetailExtractor,
    backend: TriggerBackend,
    sink: Arc<dyn ResultSink>,
    config: BatchConfig,
    inputs: Vec<SearchInput>,
    progress: BatchProgress,
    pending: Option<CandidateRow>,
    finished: bool,
}

impl BatchSearchDriver {
    pub fn new(
        context: &PageContext,
        layout: &PageLayout,
        config: BatchConfig,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let page = context.page().clone();
        let backend = TriggerBackend::select(context.handle());
        info!("Batch search using {} trigger backend", backend.name());

        Self {
            locator: RecordLocator::new(page.clone(), layout.list.clone()),
            extractor: DetailExtractor::new(
                page.clone(),
                layout.detail.clone(),
                Duration::from_millis(config.detail_open_ms),
                Duration::from_millis(config.detail_close_ms),
            ),
            page,
            backend,
            sink,
            config,
            inputs: Vec::new(),
            progress: BatchProgress::default(),
            pending: None,
            finished: false,
        }
    }

    pub fn backend(&self) -> &TriggerBackend {
        &self.backend
    }

    /// Replace the input set and reset all progress
    pub fn load_inputs(&mut self, inputs: Vec<SearchInput>) {
        self.inputs = inputs;
        self.progress = BatchProgress::default();
        self.pending = None;
        self.finished = false;
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    /// Process every loaded input, stop the trigger loop and submit
    pub async fn run(&mut self) -> BatchReport {
        info!("Batch search over {} records", self.inputs.len());
        while self.progress.status != BatchStatus::Done {
            self.step().await;
        }
        self.finish().await
    }

    /// Advance the state machine by one transition
    pub async fn step(&mut self) {
        match self.progress.status {
            BatchStatus::Idle => {
                self.progress.status = if self.inputs.is_empty() {
                    BatchStatus::Done
                } else {
                    BatchStatus::Searching
                };
            }
            BatchStatus::Searching => self.search_once().await,
            BatchStatus::ExtractingDetail => self.extract_pending().await,
            BatchStatus::Advancing => {
                self.progress.current_index += 1;
                self.progress.attempts_for_current = 0;
                self.progress.status = if self.progress.current_index >= self.inputs.len() {
                    BatchStatus::Done
                } else {
                    BatchStatus::Searching
                };
            }
            BatchStatus::Done => {}
        }
    }

    async fn search_once(&mut self) {
        let Some(input) = self.inputs.get(self.progress.current_index) else {
            self.progress.status = BatchStatus::Done;
            return;
        };
        let target_id = input.target_id.clone();

        let candidates = self.locator.scan().await;
        if let Some(found) = find_match(&candidates, &target_id) {
            debug!(
                "Found {} after {} misses",
                target_id, self.progress.attempts_for_current
            );
            self.pending = Some(found.clone());
            self.progress.status = BatchStatus::ExtractingDetail;
            return;
        }

        self.progress.attempts_for_current += 1;
        let attempts = self.progress.attempts_for_current;
        if attempts >= self.config.max_attempts {
            warn!(
                "{} ({}) not found after {} attempts",
                target_id, input.account_label, attempts
            );
            self.progress.outcomes.push(ItemOutcome::Unfound { attempts });
            self.progress.status = BatchStatus::Advancing;
            return;
        }

        debug!(
            "{} not among {} rows (attempt {}/{}), loading more",
            target_id,
            candidates.len(),
            attempts,
            self.config.max_attempts
        );
        let settle = self.load_more().await;
        tokio::time::sleep(settle).await;
    }

    async fn load_more(&self) -> Duration {
        match &self.backend {
            TriggerBackend::DirectHook(handle) => {
                handle.trigger_lazy_load().await;
                Duration::from_millis(self.config.direct_settle_ms)
            }
            TriggerBackend::ControllerStart(handle) => {
                handle.start();
                let first_tick = handle.controller().trigger().config().interval()
                    + Duration::from_millis(CONTROLLER_TICK_MARGIN_MS);
                Duration::from_millis(self.config.controller_settle_ms).max(first_tick)
            }
            TriggerBackend::RawScrollFallback => {
                if let Err(e) = self.page.scroll_to_bottom().await {
                    warn!("Scrolling to bottom failed: {}", e);
                }
                Duration::from_millis(self.config.raw_scroll_settle_ms)
            }
        }
    }

    async fn extract_pending(&mut self) {
        let Some(row) = self.pending.take() else {
            self.progress.status = BatchStatus::Searching;
            return;
        };

        match self.extractor.extract(&row.detail_control).await {
            Ok(line_items) => {
                info!(
                    "Extracted {} line items for {}",
                    line_items.len(),
                    row.display_name
                );
                let record = ExtractedRecord {
                    display_name: row.display_name,
                    line_items,
                };
                self.progress.results.push(record.clone());
                self.progress.outcomes.push(ItemOutcome::Found(record));
            }
            Err(e) => {
                warn!("Opening detail for {} failed: {}", row.key, e);
                self.progress.outcomes.push(ItemOutcome::ExtractionFailed {
                    reason: e.to_string(),
                });
            }
        }
        self.progress.status = BatchStatus::Advancing;
    }

    /// Runs once per loaded input set
    async fn finish(&mut self) -> BatchReport {
        let status = if self.finished {
            "Results already submitted".to_string()
        } else {
            self.finished = true;
            if let Some(handle) = self.backend.handle() {
                handle.stop();
            }

            match self.sink.submit(&self.progress.results).await {
                Ok(receipt) => receipt.status_line(),
                Err(e) => {
                    warn!("Submitting results failed: {}", e);
                    e.to_string()
                }
            }
        };
        info!("{}", status);

        BatchReport {
            results: self.progress.results.clone(),
            outcomes: self.progress.outcomes.clone(),
            status,
        }
    }
}
