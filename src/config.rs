//! YAML configuration for the harvester

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::lazy_load::LazyLoadSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvesterConfig {
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Sent as the INIT_LAZY_LOAD payload once the list page is open
    #[serde(default)]
    pub lazy_load: LazyLoadSettings,

    #[serde(default)]
    pub layout: PageLayout,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub submission: SubmissionConfig,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode. The operator usually has to log in, so
    /// the default is a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// How long to wait for the bill list to appear after opening the page
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// DOM contract of the admin panel
///
/// Nothing here is validated against the page. A markup change upstream
/// shows up as every record coming back unfound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    /// Root element that receives the semantic list events
    #[serde(default = "default_root_container")]
    pub root_container: String,

    #[serde(default)]
    pub list: ListLayout,

    #[serde(default)]
    pub detail: DetailLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListLayout {
    /// Lazily-loaded list container
    #[serde(default = "default_list_container")]
    pub container: String,

    /// Row selector, relative to the container
    #[serde(default = "default_row")]
    pub row: String,

    /// Payment id cell, relative to a row
    #[serde(default = "default_key_cell")]
    pub key_cell: String,

    /// Display name span, relative to a row
    #[serde(default = "default_name")]
    pub name: String,

    /// "Detail" button, relative to a row
    #[serde(default = "default_detail_button")]
    pub detail_button: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailLayout {
    #[serde(default = "default_dialog")]
    pub dialog: String,

    /// Line-item table, relative to the dialog
    #[serde(default = "default_table")]
    pub table: String,

    /// Button group whose last button closes the dialog
    #[serde(default = "default_button_group")]
    pub button_group: String,

    /// Zero-based cell offset of the product name
    #[serde(default = "default_name_column")]
    pub name_column: usize,

    /// Zero-based cell offset of the quantity
    #[serde(default = "default_quantity_column")]
    pub quantity_column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Misses allowed per record before it is given up as unfound
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_direct_settle_ms")]
    pub direct_settle_ms: u64,

    /// Raised to one trigger interval plus a margin when shorter
    #[serde(default = "default_controller_settle_ms")]
    pub controller_settle_ms: u64,

    #[serde(default = "default_raw_scroll_settle_ms")]
    pub raw_scroll_settle_ms: u64,

    /// Wait after clicking "detail" before reading the dialog
    #[serde(default = "default_detail_open_ms")]
    pub detail_open_ms: u64,

    /// Wait after closing the dialog
    #[serde(default = "default_detail_close_ms")]
    pub detail_close_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Base URL of the formatting service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_format_path")]
    pub format_path: String,

    #[serde(default = "default_pdf_path")]
    pub pdf_path: String,

    #[serde(default = "default_pdf_filename")]
    pub pdf_filename: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_headless() -> bool {
    false
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_ready_timeout_ms() -> u64 {
    300_000
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    900
}

fn default_root_container() -> String {
    "#main".to_string()
}

fn default_list_container() -> String {
    "#bills-list".to_string()
}

fn default_row() -> String {
    "tbody tr".to_string()
}

fn default_key_cell() -> String {
    "td:nth-child(3)".to_string()
}

fn default_name() -> String {
    "td:nth-child(2) span".to_string()
}

fn default_detail_button() -> String {
    "button[title='明細']".to_string()
}

fn default_dialog() -> String {
    "div[role='dialog']".to_string()
}

fn default_table() -> String {
    "#bill-detail-table".to_string()
}

fn default_button_group() -> String {
    ".modal-footer".to_string()
}

fn default_name_column() -> usize {
    1
}

fn default_quantity_column() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    3000
}

fn default_direct_settle_ms() -> u64 {
    1500
}

fn default_controller_settle_ms() -> u64 {
    3500
}

fn default_raw_scroll_settle_ms() -> u64 {
    2000
}

fn default_detail_open_ms() -> u64 {
    1000
}

fn default_detail_close_ms() -> u64 {
    1000
}

fn default_endpoint() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_format_path() -> String {
    "format".to_string()
}

fn default_pdf_path() -> String {
    "download".to_string()
}

fn default_pdf_filename() -> String {
    "orders.pdf".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            ready_timeout_ms: default_ready_timeout_ms(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            root_container: default_root_container(),
            list: ListLayout::default(),
            detail: DetailLayout::default(),
        }
    }
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            container: default_list_container(),
            row: default_row(),
            key_cell: default_key_cell(),
            name: default_name(),
            detail_button: default_detail_button(),
        }
    }
}

impl Default for DetailLayout {
    fn default() -> Self {
        Self {
            dialog: default_dialog(),
            table: default_table(),
            button_group: default_button_group(),
            name_column: default_name_column(),
            quantity_column: default_quantity_column(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            direct_settle_ms: default_direct_settle_ms(),
            controller_settle_ms: default_controller_settle_ms(),
            raw_scroll_settle_ms: default_raw_scroll_settle_ms(),
            detail_open_ms: default_detail_open_ms(),
            detail_close_ms: default_detail_close_ms(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            format_path: default_format_path(),
            pdf_path: default_pdf_path(),
            pdf_filename: default_pdf_filename(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Load config from an explicit path, or config.yaml in the package root
pub fn load_yaml_config(path: Option<&Path>) -> anyhow::Result<HarvesterConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml"),
    };

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: HarvesterConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(HarvesterConfig::default())
    }
}
