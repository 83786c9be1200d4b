// Harvester CLI
//
// Opens the admin panel's bill list in a browser, waits for the operator to
// log in, then searches every payment id from the uploaded sheet and submits
// the extracted line items for formatting.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use order_harvester::{
    BatchSearchDriver, BrowserManager, CdpPage, FormatterClient, ItemOutcome, LazyLoadCommand,
    PageContext, input, load_yaml_config, wait_for_element,
};

#[derive(Debug, Parser)]
#[command(name = "order-harvester", version, about)]
struct Cli {
    /// CSV export of the sheet with FB帳號 / 付款單號 columns
    #[arg(long)]
    input: PathBuf,

    /// URL of the admin panel's bill list
    #[arg(long)]
    url: String,

    /// YAML config file (defaults to config.yaml in the package root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the formatted spreadsheet and PDF are saved
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Force a visible browser window
    #[arg(long)]
    headed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_yaml_config(cli.config.as_deref()).context("Failed to load config")?;
    if cli.headed {
        config.browser.headless = false;
    }

    let inputs = input::load_search_inputs(&cli.input)?;
    let sink = Arc::new(FormatterClient::new(
        config.submission.clone(),
        cli.output_dir.clone(),
    )?);

    let manager = BrowserManager::new(config.browser.clone());
    let result = harvest(&manager, &cli, &config, inputs, sink).await;

    if let Err(e) = manager.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }
    result
}

async fn harvest(
    manager: &BrowserManager,
    cli: &Cli,
    config: &order_harvester::HarvesterConfig,
    inputs: Vec<order_harvester::SearchInput>,
    sink: Arc<FormatterClient>,
) -> Result<()> {
    let page = manager.open(&cli.url).await?;

    info!(
        "Waiting for {} (log in if prompted)",
        config.layout.list.container
    );
    wait_for_element(
        &page,
        &config.layout.list.container,
        Duration::from_millis(config.browser.ready_timeout_ms),
    )
    .await?;

    let context = PageContext::new(
        Arc::new(CdpPage::new(page)),
        config.layout.root_container.clone(),
    );
    context
        .handle_command(LazyLoadCommand::InitLazyLoad {
            config: config.lazy_load.clone(),
        })
        .await?;

    let mut driver =
        BatchSearchDriver::new(&context, &config.layout, config.batch.clone(), sink);
    driver.load_inputs(inputs.clone());
    let report = driver.run().await;

    context.teardown().await;

    for (input, outcome) in inputs.iter().zip(&report.outcomes) {
        match outcome {
            ItemOutcome::Found(record) => println!(
                "{}\t{}\tfound\t{} items",
                input.account_label,
                input.target_id,
                record.line_items.len()
            ),
            ItemOutcome::Unfound { attempts } => println!(
                "{}\t{}\tnot found after {} attempts",
                input.account_label, input.target_id, attempts
            ),
            ItemOutcome::ExtractionFailed { reason } => println!(
                "{}\t{}\tdetail failed: {}",
                input.account_label, input.target_id, reason
            ),
        }
    }
    println!(
        "{} of {} records found. {}",
        report.results.len(),
        inputs.len(),
        report.status
    );

    Ok(())
}
