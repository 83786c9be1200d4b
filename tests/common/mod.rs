#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use order_harvester::{
    DetailLayout, ElementRef, ExtractedRecord, HarvestError, HarvestResult, HostPage,
    LazyInstanceUpdate, ListLayout, ResultSink, RowColumns, ScrollSignal, SubmissionReceipt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyInstance {
    Absent,
    Present,
    Failing,
}

#[derive(Debug, Clone)]
struct FakeRow {
    key: String,
    name: String,
}

struct FakeState {
    list_present: bool,
    root_present: bool,
    rows: Vec<FakeRow>,
    hidden: VecDeque<Vec<FakeRow>>,
    misaligned: bool,
    scroll_y: f64,
    scroll_moves: Vec<f64>,
    bottom_scrolls: usize,
    window_events: Vec<String>,
    element_events: Vec<(String, String)>,
    failing_element_event: Option<String>,
    lazy: LazyInstance,
    lazy_updates: usize,
    lazy_elements: usize,
    details: HashMap<String, Vec<Vec<String>>>,
    table_present: bool,
    close_button: bool,
    dialog_open: Option<String>,
    activations: Vec<String>,
    failing_activation: bool,
    read_rows_calls: usize,
    subscriptions: usize,
    unsubscriptions: usize,
    signals: Option<mpsc::UnboundedSender<ScrollSignal>>,
}

/// In-memory bill list page. Each window scroll event or jump to the
/// bottom reveals the next hidden batch of rows, like the real lazy list.
pub struct FakePage {
    state: Mutex<FakeState>,
}

pub fn control_for(key: &str) -> ElementRef {
    ElementRef::new(format!("#detail-{}", key))
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                list_present: true,
                root_present: true,
                rows: Vec::new(),
                hidden: VecDeque::new(),
                misaligned: false,
                scroll_y: 0.0,
                scroll_moves: Vec::new(),
                bottom_scrolls: 0,
                window_events: Vec::new(),
                element_events: Vec::new(),
                failing_element_event: None,
                lazy: LazyInstance::Absent,
                lazy_updates: 0,
                lazy_elements: 0,
                details: HashMap::new(),
                table_present: true,
                close_button: true,
                dialog_open: None,
                activations: Vec::new(),
                failing_activation: false,
                read_rows_calls: 0,
                subscriptions: 0,
                unsubscriptions: 0,
                signals: None,
            }),
        })
    }

    /// Rows rendered right away, with a one-line detail table each
    pub fn with_rows(self: Arc<Self>, keys: &[&str]) -> Arc<Self> {
        {
            let mut state = self.state.lock();
            for key in keys {
                state.rows.push(row(key));
                state
                    .details
                    .insert(control_for(key).selector().to_string(), default_detail(key));
            }
        }
        self
    }

    /// Rows rendered only after the next load-more stimulus
    pub fn with_hidden_batch(self: Arc<Self>, keys: &[&str]) -> Arc<Self> {
        {
            let mut state = self.state.lock();
            state.hidden.push_back(keys.iter().map(|key| row(key)).collect());
            for key in keys {
                state
                    .details
                    .insert(control_for(key).selector().to_string(), default_detail(key));
            }
        }
        self
    }

    pub fn set_detail(&self, key: &str, rows: Vec<Vec<&str>>) {
        let rows = rows
            .into_iter()
            .map(|cells| cells.into_iter().map(str::to_string).collect())
            .collect();
        self.state
            .lock()
            .details
            .insert(control_for(key).selector().to_string(), rows);
    }

    pub fn set_list_present(&self, present: bool) {
        self.state.lock().list_present = present;
    }

    pub fn set_root_present(&self, present: bool) {
        self.state.lock().root_present = present;
    }

    pub fn set_misaligned(&self, misaligned: bool) {
        self.state.lock().misaligned = misaligned;
    }

    pub fn set_scroll_y(&self, y: f64) {
        self.state.lock().scroll_y = y;
    }

    pub fn set_lazy_instance(&self, lazy: LazyInstance) {
        self.state.lock().lazy = lazy;
    }

    pub fn set_lazy_elements(&self, count: usize) {
        self.state.lock().lazy_elements = count;
    }

    pub fn fail_element_event(&self, name: &str) {
        self.state.lock().failing_element_event = Some(name.to_string());
    }

    pub fn set_table_present(&self, present: bool) {
        self.state.lock().table_present = present;
    }

    pub fn set_close_button(&self, present: bool) {
        self.state.lock().close_button = present;
    }

    pub fn set_failing_activation(&self, failing: bool) {
        self.state.lock().failing_activation = failing;
    }

    /// A real user scroll arriving from the browser
    pub fn emit_user_scroll(&self) {
        self.emit(ScrollSignal::Scroll);
    }

    pub fn emit_touch_move(&self) {
        self.emit(ScrollSignal::TouchMove);
    }

    fn emit(&self, signal: ScrollSignal) {
        if let Some(tx) = &self.state.lock().signals {
            let _ = tx.send(signal);
        }
    }

    pub fn scroll_y(&self) -> f64 {
        self.state.lock().scroll_y
    }

    pub fn scroll_moves(&self) -> Vec<f64> {
        self.state.lock().scroll_moves.clone()
    }

    pub fn bottom_scrolls(&self) -> usize {
        self.state.lock().bottom_scrolls
    }

    /// Number of synthetic window scroll events, i.e. trigger cycles
    pub fn window_scroll_events(&self) -> usize {
        self.state
            .lock()
            .window_events
            .iter()
            .filter(|name| name.as_str() == "scroll")
            .count()
    }

    pub fn element_events(&self) -> Vec<(String, String)> {
        self.state.lock().element_events.clone()
    }

    pub fn lazy_updates(&self) -> usize {
        self.state.lock().lazy_updates
    }

    pub fn dialog_open(&self) -> Option<String> {
        self.state.lock().dialog_open.clone()
    }

    pub fn activations(&self) -> Vec<String> {
        self.state.lock().activations.clone()
    }

    pub fn read_rows_calls(&self) -> usize {
        self.state.lock().read_rows_calls
    }

    pub fn subscriptions(&self) -> usize {
        self.state.lock().subscriptions
    }

    /// Times a live subscription was removed from the page
    pub fn unsubscriptions(&self) -> usize {
        self.state.lock().unsubscriptions
    }

    /// Whether the tracker side of the signal channel has gone away
    pub fn signal_listener_closed(&self) -> bool {
        match &self.state.lock().signals {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }

    fn reveal_next(state: &mut FakeState) {
        if let Some(batch) = state.hidden.pop_front() {
            state.rows.extend(batch);
        }
    }

    fn move_to(state: &mut FakeState, y: f64) {
        state.scroll_y = y.max(0.0);
        state.scroll_moves.push(state.scroll_y);
        // Programmatic scrolls produce trusted scroll events too
        if let Some(tx) = &state.signals {
            let _ = tx.send(ScrollSignal::Scroll);
        }
    }
}

fn row(key: &str) -> FakeRow {
    FakeRow {
        key: key.to_string(),
        name: format!("buyer-{}", key),
    }
}

fn default_detail(key: &str) -> Vec<Vec<String>> {
    vec![vec![
        "1".to_string(),
        format!("product-{}", key),
        "NT$100".to_string(),
        "2".to_string(),
    ]]
}

#[async_trait]
impl HostPage for FakePage {
    async fn scroll_offset(&self) -> HarvestResult<f64> {
        Ok(self.state.lock().scroll_y)
    }

    async fn scroll_by(&self, dy: f64) -> HarvestResult<()> {
        let mut state = self.state.lock();
        let target = state.scroll_y + dy;
        Self::move_to(&mut state, target);
        Ok(())
    }

    async fn scroll_to(&self, y: f64) -> HarvestResult<()> {
        let mut state = self.state.lock();
        Self::move_to(&mut state, y);
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> HarvestResult<()> {
        let mut state = self.state.lock();
        state.bottom_scrolls += 1;
        Self::reveal_next(&mut state);
        Ok(())
    }

    async fn dispatch_window_event(&self, name: &str) -> HarvestResult<()> {
        let mut state = self.state.lock();
        state.window_events.push(name.to_string());
        if name == "scroll" {
            Self::reveal_next(&mut state);
        }
        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> HarvestResult<bool> {
        Ok(selector == "#main" && self.state.lock().root_present)
    }

    async fn dispatch_element_event(&self, selector: &str, name: &str) -> HarvestResult<()> {
        let mut state = self.state.lock();
        if state.failing_element_event.as_deref() == Some(name) {
            return Err(HarvestError::Page(format!("listener for {} threw", name)));
        }
        state
            .element_events
            .push((selector.to_string(), name.to_string()));
        Ok(())
    }

    async fn update_lazy_instance(&self) -> HarvestResult<LazyInstanceUpdate> {
        let mut state = self.state.lock();
        match state.lazy {
            LazyInstance::Absent => Ok(LazyInstanceUpdate::Absent),
            LazyInstance::Present => {
                state.lazy_updates += 1;
                Ok(LazyInstanceUpdate::Updated)
            }
            LazyInstance::Failing => Err(HarvestError::Page("update is not a function".into())),
        }
    }

    async fn count_lazy_elements(&self) -> HarvestResult<usize> {
        Ok(self.state.lock().lazy_elements)
    }

    async fn read_rows(&self, _layout: &ListLayout) -> HarvestResult<Option<RowColumns>> {
        let mut state = self.state.lock();
        state.read_rows_calls += 1;
        if !state.list_present {
            return Ok(None);
        }
        let mut columns = RowColumns::default();
        for row in &state.rows {
            columns.keys.push(row.key.clone());
            columns.controls.push(control_for(&row.key));
            columns.names.push(row.name.clone());
        }
        if state.misaligned {
            columns.controls.pop();
        }
        Ok(Some(columns))
    }

    async fn activate(&self, control: &ElementRef) -> HarvestResult<()> {
        let mut state = self.state.lock();
        if state.failing_activation {
            return Err(HarvestError::Page(format!(
                "Control '{}' not found",
                control.selector()
            )));
        }
        state.activations.push(control.selector().to_string());
        state.dialog_open = Some(control.selector().to_string());
        Ok(())
    }

    async fn read_detail_table(
        &self,
        _layout: &DetailLayout,
    ) -> HarvestResult<Option<Vec<Vec<String>>>> {
        let state = self.state.lock();
        if !state.table_present {
            return Ok(None);
        }
        Ok(state
            .dialog_open
            .as_ref()
            .and_then(|control| state.details.get(control).cloned()))
    }

    async fn close_detail(&self, _layout: &DetailLayout) -> HarvestResult<bool> {
        let mut state = self.state.lock();
        if !state.close_button || state.dialog_open.is_none() {
            return Ok(false);
        }
        state.dialog_open = None;
        Ok(true)
    }

    async fn subscribe_scroll_signals(&self) -> HarvestResult<mpsc::UnboundedReceiver<ScrollSignal>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.subscriptions += 1;
        state.signals = Some(tx);
        Ok(rx)
    }

    async fn unsubscribe_scroll_signals(&self) -> HarvestResult<()> {
        let mut state = self.state.lock();
        if state.signals.take().is_some() {
            state.unsubscriptions += 1;
        }
        Ok(())
    }
}

/// Sink that keeps every submission in memory
#[derive(Default)]
pub struct RecordingSink {
    submissions: Mutex<Vec<Vec<ExtractedRecord>>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            submissions: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn submissions(&self) -> Vec<Vec<ExtractedRecord>> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn submit(&self, records: &[ExtractedRecord]) -> HarvestResult<SubmissionReceipt> {
        self.submissions.lock().push(records.to_vec());
        if self.fail {
            return Err(HarvestError::Submission(
                "formatter responded with HTTP 502 Bad Gateway".to_string(),
            ));
        }
        Ok(SubmissionReceipt {
            record_count: records.len(),
            spreadsheet: PathBuf::from("memory.xlsx"),
            pdf: None,
        })
    }
}

/// Let spawned tasks drain their queues
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
