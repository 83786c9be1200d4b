//! Hand-off of extracted records to the formatting service

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SubmissionConfig;
use crate::search::ExtractedRecord;
use crate::utils::{HarvestError, HarvestResult};

/// Files produced by a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub record_count: usize,
    pub spreadsheet: PathBuf,
    pub pdf: Option<PathBuf>,
}

impl SubmissionReceipt {
    /// User-facing summary
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "Submitted {} records, spreadsheet saved to {}",
            self.record_count,
            self.spreadsheet.display()
        );
        if let Some(pdf) = &self.pdf {
            line.push_str(&format!(", PDF saved to {}", pdf.display()));
        }
        line
    }
}

/// Receiver of a finished batch
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn submit(&self, records: &[ExtractedRecord]) -> HarvestResult<SubmissionReceipt>;
}

/// HTTP client for the formatting service
pub struct FormatterClient {
    client: reqwest::Client,
    base: Url,
    config: SubmissionConfig,
    output_dir: PathBuf,
}

impl FormatterClient {
    pub fn new(config: SubmissionConfig, output_dir: impl Into<PathBuf>) -> HarvestResult<Self> {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let base = Url::parse(&endpoint).map_err(|e| {
            HarvestError::InvalidConfig(format!(
                "Invalid formatter endpoint '{}': {}",
                config.endpoint, e
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            config,
            output_dir: output_dir.into(),
        })
    }

    fn url(&self, path: &str) -> HarvestResult<Url> {
        self.base.join(path).map_err(|e| {
            HarvestError::InvalidConfig(format!("Invalid formatter path '{}': {}", path, e))
        })
    }

    /// Fetch the PDF the service generated alongside the spreadsheet.
    /// Any failure just means there is no PDF.
    async fn fetch_pdf(&self) -> Option<PathBuf> {
        let path = format!(
            "{}/{}",
            self.config.pdf_path.trim_matches('/'),
            urlencoding::encode(&self.config.pdf_filename)
        );
        let url = match self.url(&path) {
            Ok(url) => url,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("No PDF at {}: HTTP {}", url, response.status());
                return None;
            }
            Err(e) => {
                warn!("Fetching PDF from {} failed: {}", url, e);
                return None;
            }
        };

        let target = self.output_dir.join(&self.config.pdf_filename);
        match response.bytes().await {
            Ok(bytes) => match write_file(&target, &bytes).await {
                Ok(()) => Some(target),
                Err(e) => {
                    warn!("Saving PDF failed: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Reading PDF body failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ResultSink for FormatterClient {
    async fn submit(&self, records: &[ExtractedRecord]) -> HarvestResult<SubmissionReceipt> {
        let url = self.url(&self.config.format_path)?;
        info!("Submitting {} records to {}", records.len(), url);

        let response = self.client.post(url).json(records).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Submission(format!(
                "formatter responded with HTTP {}",
                status
            )));
        }
        let body = response.bytes().await?;

        let filename = format!(
            "orders_{}.xlsx",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let spreadsheet = self.output_dir.join(filename);
        write_file(&spreadsheet, &body).await?;
        info!("Saved spreadsheet to {}", spreadsheet.display());

        let pdf = self.fetch_pdf().await;

        Ok(SubmissionReceipt {
            record_count: records.len(),
            spreadsheet,
            pdf,
        })
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> HarvestResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
