mod common;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use common::{FakePage, RecordingSink, control_for};
use order_harvester::search::find_match;
use order_harvester::{
    BatchConfig, BatchSearchDriver, BatchStatus, DetailExtractor, DetailLayout, ItemOutcome,
    LazyLoadSettings, LineItem, ListLayout, PageContext, PageLayout, RecordLocator, SearchInput,
    TriggerBackend,
};

fn extractor(page: &Arc<FakePage>) -> DetailExtractor {
    DetailExtractor::new(
        page.clone(),
        DetailLayout::default(),
        Duration::from_millis(1000),
        Duration::from_millis(1000),
    )
}

fn inputs(ids: &[&str]) -> Vec<SearchInput> {
    ids.iter()
        .map(|id| SearchInput::new(format!("fb-{}", id), *id))
        .collect()
}

fn batch(max_attempts: u32) -> BatchConfig {
    BatchConfig {
        max_attempts,
        ..BatchConfig::default()
    }
}

/// INIT settings whose own timer never fires during a test
fn quiet_settings() -> LazyLoadSettings {
    LazyLoadSettings {
        interval: Some(600_000),
        use_actual_scroll: false,
        ..LazyLoadSettings::default()
    }
}

// ---------------------------------------------------------------------------
// RecordLocator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_pairs_columns_by_row() {
    let page = FakePage::new().with_rows(&["P-1", "P-2", "P-3", "P-4", "P-5"]);
    let locator = RecordLocator::new(page.clone(), ListLayout::default());

    let rows = locator.scan().await;

    assert_eq!(rows.len(), 5);
    for (i, row) in rows.iter().enumerate() {
        let key = format!("P-{}", i + 1);
        assert_eq!(row.key, key);
        assert_eq!(row.detail_control, control_for(&key));
        assert_eq!(row.display_name, format!("buyer-{}", key));
    }
    assert_eq!(find_match(&rows, "P-4").unwrap().display_name, "buyer-P-4");
    assert!(find_match(&rows, "P-6").is_none());
    assert!(find_match(&rows, "  ").is_none());
}

#[tokio::test]
async fn scan_reads_the_page_every_time() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2", "P-3"]);
    let locator = RecordLocator::new(page.clone(), ListLayout::default());

    assert_eq!(locator.scan().await.len(), 1);
    order_harvester::HostPage::scroll_to_bottom(&*page)
        .await
        .unwrap();
    assert_eq!(locator.scan().await.len(), 3);
    assert_eq!(page.read_rows_calls(), 2);
}

#[tokio::test]
async fn scan_of_missing_or_inconsistent_list_is_empty() {
    let page = FakePage::new().with_rows(&["P-1", "P-2"]);
    let locator = RecordLocator::new(page.clone(), ListLayout::default());

    page.set_misaligned(true);
    assert!(locator.scan().await.is_empty());

    page.set_misaligned(false);
    page.set_list_present(false);
    assert!(locator.scan().await.is_empty());
}

// ---------------------------------------------------------------------------
// DetailExtractor
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn extract_reads_items_and_closes_dialog() {
    let page = FakePage::new().with_rows(&["P-1"]);
    page.set_detail(
        "P-1",
        vec![
            vec!["1", " Apple ", "NT$30", "3"],
            vec!["2", "Pear", "NT$20", " 5 "],
            vec!["subtotal"],
        ],
    );

    let items = extractor(&page).extract(&control_for("P-1")).await.unwrap();

    assert_eq!(
        items,
        vec![
            LineItem {
                product_name: "Apple".into(),
                quantity: "3".into()
            },
            LineItem {
                product_name: "Pear".into(),
                quantity: "5".into()
            },
        ]
    );
    assert_eq!(page.activations(), vec!["#detail-P-1".to_string()]);
    assert_eq!(page.dialog_open(), None);
}

#[tokio::test(start_paused = true)]
async fn extract_without_close_button_leaves_dialog_open() {
    let page = FakePage::new().with_rows(&["P-1"]);
    page.set_close_button(false);

    let items = extractor(&page).extract(&control_for("P-1")).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "product-P-1");
    assert_eq!(page.dialog_open(), Some("#detail-P-1".to_string()));
}

#[tokio::test(start_paused = true)]
async fn extract_without_table_yields_no_items() {
    let page = FakePage::new().with_rows(&["P-1"]);
    page.set_table_present(false);

    let items = extractor(&page).extract(&control_for("P-1")).await.unwrap();

    assert!(items.is_empty());
    assert_eq!(page.dialog_open(), None);
}

#[tokio::test(start_paused = true)]
async fn extract_fails_when_control_is_gone() {
    let page = FakePage::new().with_rows(&["P-1"]);
    page.set_failing_activation(true);

    assert!(extractor(&page).extract(&control_for("P-1")).await.is_err());
}

// ---------------------------------------------------------------------------
// BatchSearchDriver
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn all_present_records_need_no_trigger() {
    let page = FakePage::new().with_rows(&["P-1", "P-2", "P-3"]);
    let context = PageContext::new(page.clone(), "#main");
    context.init_lazy_load(&quiet_settings()).await.unwrap();
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(5), sink.clone());
    assert!(matches!(driver.backend(), TriggerBackend::DirectHook(_)));
    driver.load_inputs(inputs(&["P-1", "P-2", "P-3"]));
    let report = driver.run().await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results[1].display_name, "buyer-P-2");
    assert!(report
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome, ItemOutcome::Found(_))));
    assert_eq!(page.window_scroll_events(), 0);
    assert_eq!(sink.submissions().len(), 1);
    assert_eq!(sink.submissions()[0], report.results);
    assert_eq!(
        report.status,
        "Submitted 3 records, spreadsheet saved to memory.xlsx"
    );
    assert!(!context.handle().unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn exhausted_record_is_reported_and_batch_continues() {
    let page = FakePage::new().with_rows(&["P-1", "P-2"]);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(4), sink.clone());
    assert_eq!(driver.backend().name(), "raw-scroll");
    driver.load_inputs(inputs(&["P-1", "MISSING", "P-2"]));
    let report = driver.run().await;

    assert_eq!(page.bottom_scrolls(), 3);
    assert!(matches!(report.outcomes[0], ItemOutcome::Found(_)));
    assert_eq!(report.outcomes[1], ItemOutcome::Unfound { attempts: 4 });
    assert!(matches!(report.outcomes[2], ItemOutcome::Found(_)));
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.unfound_count(), 1);
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn direct_trigger_reveals_lazily_loaded_record() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2"])
        .with_hidden_batch(&["P-3"]);
    let context = PageContext::new(page.clone(), "#main");
    context.init_lazy_load(&quiet_settings()).await.unwrap();
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(10), sink.clone());
    driver.load_inputs(inputs(&["P-3"]));
    let report = driver.run().await;

    assert_eq!(page.window_scroll_events(), 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].display_name, "buyer-P-3");
    assert_eq!(page.activations(), vec!["#detail-P-3".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn controller_backend_waits_for_the_loop() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2"]);
    let context = PageContext::new(page.clone(), "#main");
    let settings = LazyLoadSettings {
        interval: Some(1000),
        step_count: Some(3),
        use_actual_scroll: false,
        expose_direct_trigger: false,
        ..LazyLoadSettings::default()
    };
    context.init_lazy_load(&settings).await.unwrap();
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(10), sink.clone());
    assert!(matches!(driver.backend(), TriggerBackend::ControllerStart(_)));
    driver.load_inputs(inputs(&["P-2"]));
    let report = driver.run().await;

    assert_eq!(report.results.len(), 1);
    assert!(page.window_scroll_events() >= 1);
    assert!(!context.handle().unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn controller_rescan_waits_past_the_first_tick() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2"]);
    let context = PageContext::new(page.clone(), "#main");
    let settings = LazyLoadSettings {
        interval: Some(1000),
        step_count: Some(3),
        use_actual_scroll: false,
        expose_direct_trigger: false,
        ..LazyLoadSettings::default()
    };
    context.init_lazy_load(&settings).await.unwrap();
    let config = BatchConfig {
        max_attempts: 10,
        controller_settle_ms: 100,
        ..BatchConfig::default()
    };

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), config, RecordingSink::new());
    driver.load_inputs(inputs(&["P-2"]));
    let report = driver.run().await;

    // One miss before the tick at 1000 ms, one hit after it
    assert_eq!(report.results.len(), 1);
    assert_eq!(page.read_rows_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn raw_scroll_fallback_finds_record() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2"]);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(10), sink.clone());
    driver.load_inputs(inputs(&["P-2"]));
    let report = driver.run().await;

    assert_eq!(page.bottom_scrolls(), 1);
    assert_eq!(page.window_scroll_events(), 0);
    assert_eq!(report.results.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_detail_click_is_recorded() {
    let page = FakePage::new().with_rows(&["P-1"]);
    page.set_failing_activation(true);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(3), sink.clone());
    driver.load_inputs(inputs(&["P-1"]));
    let report = driver.run().await;

    assert!(report.results.is_empty());
    assert!(matches!(
        &report.outcomes[0],
        ItemOutcome::ExtractionFailed { reason } if reason.contains("#detail-P-1")
    ));
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_becomes_status() {
    let page = FakePage::new().with_rows(&["P-1"]);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::failing();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(3), sink.clone());
    driver.load_inputs(inputs(&["P-1"]));
    let report = driver.run().await;

    assert_eq!(report.results.len(), 1);
    assert!(report.status.contains("HTTP 502"));
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_batch_submits_once_with_no_records() {
    let page = FakePage::new();
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(3), sink.clone());
    driver.load_inputs(Vec::new());
    let report = driver.run().await;

    assert!(report.results.is_empty());
    assert_eq!(sink.submissions(), vec![Vec::new()]);
    assert_eq!(page.read_rows_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn finished_batch_is_not_submitted_twice() {
    let page = FakePage::new().with_rows(&["P-1"]);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(3), sink.clone());
    driver.load_inputs(inputs(&["P-1"]));
    driver.run().await;
    let again = driver.run().await;

    assert_eq!(again.status, "Results already submitted");
    assert_eq!(again.results.len(), 1);
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn step_walks_through_every_state() {
    let page = FakePage::new()
        .with_rows(&["P-1"])
        .with_hidden_batch(&["P-2"]);
    let context = PageContext::new(page.clone(), "#main");
    let sink = RecordingSink::new();

    let mut driver =
        BatchSearchDriver::new(&context, &PageLayout::default(), batch(3), sink.clone());
    driver.load_inputs(inputs(&["P-2"]));
    assert_eq!(driver.progress().status, BatchStatus::Idle);

    driver.step().await;
    assert_eq!(driver.progress().status, BatchStatus::Searching);

    driver.step().await;
    assert_eq!(driver.progress().status, BatchStatus::Searching);
    assert_eq!(driver.progress().attempts_for_current, 1);

    driver.step().await;
    assert_eq!(driver.progress().status, BatchStatus::ExtractingDetail);

    driver.step().await;
    assert_eq!(driver.progress().status, BatchStatus::Advancing);
    assert_eq!(driver.progress().results.len(), 1);

    driver.step().await;
    assert_eq!(driver.progress().status, BatchStatus::Done);
    assert_eq!(driver.progress().current_index, 1);
    assert_eq!(driver.progress().attempts_for_current, 0);
    assert!(sink.submissions().is_empty());
}
