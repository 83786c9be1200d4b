//! Record search over the lazily-loaded bill list

mod driver;
mod extractor;
mod locator;
mod types;

pub use driver::{BatchSearchDriver, TriggerBackend};
pub use extractor::DetailExtractor;
pub use locator::{RecordLocator, find_match};
pub use types::{
    BatchProgress, BatchReport, BatchStatus, CandidateRow, ExtractedRecord, ItemOutcome,
    LineItem, SearchInput,
};
