//! Host page seam
//!
//! Everything the lazy-load and search code does to the admin panel goes
//! through [`HostPage`]. Production uses [`CdpPage`] over a chromiumoxide tab;
//! tests substitute an in-memory page.

mod cdp;

pub use cdp::CdpPage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{DetailLayout, ListLayout};
use crate::utils::HarvestResult;

/// Opaque handle to a control on the host page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// CSS selector that addresses the control
    pub fn selector(&self) -> &str {
        &self.0
    }
}

/// Column lists read from the bill list in one pass
///
/// Index `i` of every list refers to the same row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowColumns {
    pub keys: Vec<String>,
    pub controls: Vec<ElementRef>,
    pub names: Vec<String>,
}

/// Real input observed on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSignal {
    Scroll,
    TouchMove,
}

/// Result of poking the page's lazy-load library instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyInstanceUpdate {
    Updated,
    Absent,
}

/// DOM operations the harvester needs from the admin panel
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Current vertical scroll offset in pixels
    async fn scroll_offset(&self) -> HarvestResult<f64>;

    async fn scroll_by(&self, dy: f64) -> HarvestResult<()>;

    async fn scroll_to(&self, y: f64) -> HarvestResult<()>;

    async fn scroll_to_bottom(&self) -> HarvestResult<()>;

    /// Dispatch a plain (untrusted) event on `window`
    async fn dispatch_window_event(&self, name: &str) -> HarvestResult<()>;

    async fn element_exists(&self, selector: &str) -> HarvestResult<bool>;

    /// Dispatch a plain event on the first element matching `selector`
    async fn dispatch_element_event(&self, selector: &str, name: &str) -> HarvestResult<()>;

    /// Call `update()` on the page's lazy-load instance if it has one
    async fn update_lazy_instance(&self) -> HarvestResult<LazyInstanceUpdate>;

    /// Count images still waiting on a lazy loader
    async fn count_lazy_elements(&self) -> HarvestResult<usize>;

    /// Read key, detail control and display name of every rendered row.
    /// `None` when the list container is not in the DOM.
    async fn read_rows(&self, layout: &ListLayout) -> HarvestResult<Option<RowColumns>>;

    /// Click a control
    async fn activate(&self, control: &ElementRef) -> HarvestResult<()>;

    /// Cell texts of the detail table, row by row. `None` when the dialog or
    /// its table is not in the DOM.
    async fn read_detail_table(&self, layout: &DetailLayout)
    -> HarvestResult<Option<Vec<Vec<String>>>>;

    /// Click the last button of the dialog's button group. `false` when there
    /// is no such button.
    async fn close_detail(&self, layout: &DetailLayout) -> HarvestResult<bool>;

    /// Start forwarding trusted scroll and touch-move input
    async fn subscribe_scroll_signals(&self) -> HarvestResult<mpsc::UnboundedReceiver<ScrollSignal>>;

    /// Remove everything `subscribe_scroll_signals` installed on the page.
    /// A no-op when nothing is subscribed.
    async fn unsubscribe_scroll_signals(&self) -> HarvestResult<()>;
}
