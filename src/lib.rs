//! Order record harvester for lazily-loaded admin panels
//!
//! Drives a bill list that only renders more rows when its lazy loader is
//! poked, finds each requested payment id, reads the line items from the
//! bill's detail dialog and hands the collected records to a formatting
//! service.

mod browser;
pub mod browser_setup;
pub mod config;
pub mod input;
pub mod lazy_load;
mod manager;
pub mod page;
pub mod search;
pub mod submission;
mod utils;

pub use browser::{
    BrowserError, BrowserResult, BrowserWrapper, download_managed_browser,
    find_browser_executable, launch_browser, open_page,
};
pub use config::{
    BatchConfig, BrowserConfig, DetailLayout, HarvesterConfig, ListLayout, PageLayout,
    SubmissionConfig, load_yaml_config,
};
pub use lazy_load::{
    FireOutcome, LazyLoadCommand, LazyLoadHandle, LazyLoadSettings, PageContext,
    ScrollBusy, ScrollSignalTracker, ScrollState, SyntheticActivityTrigger, TriggerConfig,
    TriggerLoopController,
};
pub use manager::BrowserManager;
pub use page::{CdpPage, ElementRef, HostPage, LazyInstanceUpdate, RowColumns, ScrollSignal};
pub use search::{
    BatchProgress, BatchReport, BatchSearchDriver, BatchStatus, CandidateRow, DetailExtractor,
    ExtractedRecord, ItemOutcome, LineItem, RecordLocator, SearchInput, TriggerBackend,
};
pub use submission::{FormatterClient, ResultSink, SubmissionReceipt};
pub use utils::{HarvestError, HarvestResult, constants, wait_for_element};
