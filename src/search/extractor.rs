//! Detail dialog extraction
//!
//! Opens a bill's detail dialog, reads the line-item table by fixed column
//! offsets and closes the dialog again. Both waits are fixed delays; the
//! dialog is not polled for readiness.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::LineItem;
use crate::config::DetailLayout;
use crate::page::{ElementRef, HostPage};
use crate::utils::HarvestResult;

pub struct DetailExtractor {
    page: Arc<dyn HostPage>,
    layout: DetailLayout,
    open_settle: Duration,
    close_settle: Duration,
}

impl DetailExtractor {
    pub fn new(
        page: Arc<dyn HostPage>,
        layout: DetailLayout,
        open_settle: Duration,
        close_settle: Duration,
    ) -> Self {
        Self {
            page,
            layout,
            open_settle,
            close_settle,
        }
    }

    /// Line items of the bill behind `control`.
    ///
    /// Only a failed click is an error. A missing table yields no items, and
    /// a missing close button leaves the dialog open.
    pub async fn extract(&self, control: &ElementRef) -> HarvestResult<Vec<LineItem>> {
        self.page.activate(control).await?;
        tokio::time::sleep(self.open_settle).await;

        let items = match self.page.read_detail_table(&self.layout).await {
            Ok(Some(rows)) => self.parse_rows(rows),
            Ok(None) => {
                warn!("Detail table {} not found", self.layout.table);
                Vec::new()
            }
            Err(e) => {
                warn!("Reading detail table failed: {}", e);
                Vec::new()
            }
        };
        debug!("Read {} line items", items.len());

        match self.page.close_detail(&self.layout).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "No close button in {}, detail dialog left open",
                self.layout.button_group
            ),
            Err(e) => warn!("Closing detail dialog failed: {}", e),
        }
        tokio::time::sleep(self.close_settle).await;

        Ok(items)
    }

    /// Rows too short to hold both columns are skipped.
    fn parse_rows(&self, rows: Vec<Vec<String>>) -> Vec<LineItem> {
        rows.into_iter()
            .filter_map(|cells| {
                let product_name = cells.get(self.layout.name_column)?.trim().to_string();
                let quantity = cells.get(self.layout.quantity_column)?.trim().to_string();
                Some(LineItem {
                    product_name,
                    quantity,
                })
            })
            .collect()
    }
}
