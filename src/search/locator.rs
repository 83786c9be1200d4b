//! Bill list scanning

use std::sync::Arc;
use tracing::{debug, warn};

use super::types::CandidateRow;
use crate::config::ListLayout;
use crate::page::{HostPage, RowColumns};

pub struct RecordLocator {
    page: Arc<dyn HostPage>,
    layout: ListLayout,
}

impl RecordLocator {
    pub fn new(page: Arc<dyn HostPage>, layout: ListLayout) -> Self {
        Self { page, layout }
    }

    /// Every row currently rendered. Read fresh on each call; an absent
    /// container or an unreadable page yields an empty list.
    pub async fn scan(&self) -> Vec<CandidateRow> {
        match self.page.read_rows(&self.layout).await {
            Ok(Some(columns)) => align(columns),
            Ok(None) => {
                debug!("List container {} not present", self.layout.container);
                Vec::new()
            }
            Err(e) => {
                warn!("Scanning bill list failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Pair the column lists row by row. Lists of differing length cannot be
/// paired safely, so the snapshot is discarded.
fn align(columns: RowColumns) -> Vec<CandidateRow> {
    let RowColumns {
        keys,
        controls,
        names,
    } = columns;

    if keys.len() != controls.len() || keys.len() != names.len() {
        warn!(
            "Bill list columns out of step (keys={}, controls={}, names={}), ignoring scan",
            keys.len(),
            controls.len(),
            names.len()
        );
        return Vec::new();
    }

    keys.into_iter()
        .zip(controls)
        .zip(names)
        .map(|((key, detail_control), display_name)| CandidateRow {
            key: key.trim().to_string(),
            detail_control,
            display_name: display_name.trim().to_string(),
        })
        .collect()
}

/// First candidate whose key is `target_id`. A blank id matches nothing.
pub fn find_match<'a>(candidates: &'a [CandidateRow], target_id: &str) -> Option<&'a CandidateRow> {
    let target = target_id.trim();
    if target.is_empty() {
        return None;
    }
    candidates.iter().find(|candidate| candidate.key == target)
}
