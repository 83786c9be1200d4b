use serde::{Deserialize, Serialize};

use crate::page::ElementRef;

/// One row of the uploaded sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInput {
    pub account_label: String,
    /// Payment id looked up in the bill list
    pub target_id: String,
}

impl SearchInput {
    pub fn new(account_label: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            account_label: account_label.into(),
            target_id: target_id.into(),
        }
    }
}

/// A rendered bill row, valid only for the scan that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub key: String,
    pub detail_control: ElementRef,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_name: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub display_name: String,
    pub line_items: Vec<LineItem>,
}

/// Terminal result for one input record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Found(ExtractedRecord),
    Unfound { attempts: u32 },
    ExtractionFailed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Idle,
    Searching,
    ExtractingDetail,
    Advancing,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub current_index: usize,
    pub attempts_for_current: u32,
    pub results: Vec<ExtractedRecord>,
    pub outcomes: Vec<ItemOutcome>,
    pub status: BatchStatus,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            current_index: 0,
            attempts_for_current: 0,
            results: Vec::new(),
            outcomes: Vec::new(),
            status: BatchStatus::Idle,
        }
    }
}

/// Everything a finished batch produced
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub results: Vec<ExtractedRecord>,
    /// One per input, in input order
    pub outcomes: Vec<ItemOutcome>,
    /// User-facing status line from the submission step
    pub status: String,
}

impl BatchReport {
    pub fn unfound_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !matches!(outcome, ItemOutcome::Found(_)))
            .count()
    }
}
