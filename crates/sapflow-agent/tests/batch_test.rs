//! End-to-end batch runs against the simulator session.

use sapflow::{record_text, EngineError, Record};
use sapflow_agent::artifact::write_table;
use sapflow_agent::dataset::load_table;
use sapflow_agent::{run_batch, va01, BatchJob, Settings, SimSession, Table};
use serde_json::{json, Value};
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn item_row(po: Option<&str>, material: &str, qty: f64) -> Record {
    let mut row = Record::new();
    row.insert(
        "po number".to_string(),
        po.map(|p| json!(p)).unwrap_or(Value::Null),
    );
    row.insert("material".to_string(), json!(material));
    row.insert("qty".to_string(), json!(qty));
    row
}

/// Three orders: PO-1 with two line items, PO-2 and PO-3 with one each,
/// separated by blank sentinel rows.
fn write_input(dir: &Path) -> std::path::PathBuf {
    let table = Table {
        columns: vec!["po number".to_string(), "material".to_string(), "qty".to_string()],
        rows: vec![
            item_row(Some("PO-1"), "TOWEL-100", 24.0),
            item_row(Some("PO-1"), "TOWEL-200", 12.0),
            item_row(None, "", 0.0),
            item_row(Some("PO-2"), "RUG-300", 6.0),
            item_row(None, "", 0.0),
            item_row(Some("PO-3"), "RUG-400", 8.0),
        ],
    };
    let path = dir.join("orders.xlsx");
    write_table(&table, &path).unwrap();
    path
}

fn test_job() -> BatchJob {
    let mut job = BatchJob::new("orders.xlsx");
    job.header_fields = serde_json::from_value(json!({
        "order type": "ZOR",
        "sales organization": "1000",
        "distribution channel": "10",
        "division": "00"
    }))
    .unwrap();
    job.screen_sequence = va01::default_sequence();
    job
}

fn test_settings(dir: &Path) -> Settings {
    Settings {
        erp_username: "rpa.user".to_string(),
        erp_password: "secret".to_string(),
        network_root: dir.display().to_string(),
    }
}

#[tokio::test]
async fn batch_records_successes_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();
    session.fail_transaction(2);

    let summary = run_batch(
        &session,
        &test_job(),
        va01::screen_registry(),
        &test_settings(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.total_orders, 3);
    assert_eq!(summary.orders_created, 2);
    assert_eq!(summary.orders_failed, 1);
    assert!(summary.output_path.exists());
    let error_path = summary.error_path.as_ref().unwrap();
    assert!(error_path.exists());

    let error = &summary.errors[0];
    assert_eq!(error.kind, "validation");
    assert_eq!(error.business_key.as_deref(), Some("PO-2"));
    let screenshot = error.screenshot_path.as_ref().unwrap();
    assert!(Path::new(screenshot).exists());

    // The updated file holds only the succeeded orders, each line item
    // annotated with its document number; the failed order appears in
    // the errors file alone.
    let updated = load_table(&summary.output_path).await.unwrap();
    assert_eq!(updated.columns[1], "sales order");
    let keys: Vec<Option<String>> = updated
        .rows
        .iter()
        .map(|row| record_text(row, "po number"))
        .collect();
    assert_eq!(
        keys,
        vec![
            Some("PO-1".to_string()),
            Some("PO-1".to_string()),
            None, // separator between orders
            Some("PO-3".to_string()),
        ]
    );
    for row in &updated.rows {
        if record_text(row, "po number").is_none() {
            continue;
        }
        let result = record_text(row, "sales order").unwrap();
        assert!(result.starts_with("45"), "unexpected result cell: {result}");
    }

    let failed = load_table(error_path).await.unwrap();
    assert_eq!(failed.rows.len(), 1);
    assert_eq!(
        record_text(&failed.rows[0], "po number").as_deref(),
        Some("PO-2")
    );
    assert!(record_text(&failed.rows[0], "sales order")
        .unwrap()
        .contains("customer master record"));
}

#[tokio::test]
async fn repeated_failures_are_separated_in_the_errors_file() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();
    session.fail_transaction(1);
    session.fail_transaction(3);

    let summary = run_batch(
        &session,
        &test_job(),
        va01::screen_registry(),
        &test_settings(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.orders_created, 1);
    assert_eq!(summary.orders_failed, 2);

    // PO-1 (two rows), one blank separator, PO-3; no leading or trailing
    // separator rows.
    let failed = load_table(summary.error_path.as_ref().unwrap()).await.unwrap();
    let keys: Vec<Option<String>> = failed
        .rows
        .iter()
        .map(|row| record_text(row, "po number"))
        .collect();
    assert_eq!(
        keys,
        vec![
            Some("PO-1".to_string()),
            Some("PO-1".to_string()),
            None,
            Some("PO-3".to_string()),
        ]
    );

    let updated = load_table(&summary.output_path).await.unwrap();
    assert_eq!(updated.rows.len(), 1);
    assert_eq!(
        record_text(&updated.rows[0], "po number").as_deref(),
        Some("PO-2")
    );
}

#[tokio::test]
async fn clean_batch_produces_no_error_file() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();

    let summary = run_batch(
        &session,
        &test_job(),
        va01::screen_registry(),
        &test_settings(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.orders_created, 3);
    assert!(summary.error_path.is_none());
    assert!(!dir.path().join("orders.errors.xlsx").exists());
}

#[tokio::test(start_paused = true)]
async fn login_exhaustion_aborts_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();
    session.fail_login_times(3);

    let err = run_batch(
        &session,
        &test_job(),
        va01::screen_registry(),
        &test_settings(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EngineError::TransientUi(_)));
    assert!(!dir.path().join("orders.updated.xlsx").exists());
}

#[tokio::test]
async fn cancellation_stops_before_the_first_order() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_batch(
        &session,
        &test_job(),
        va01::screen_registry(),
        &test_settings(dir.path()),
        &cancel,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EngineError::Cancelled(_)));
}

#[tokio::test]
async fn unknown_screen_in_sequence_fails_before_login() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path());
    let session = SimSession::new();
    let mut job = test_job();
    job.screen_sequence
        .push(sapflow::ScreenOrder::new("VA01_MISSING"));

    let err = run_batch(
        &session,
        &job,
        va01::screen_registry(),
        &test_settings(dir.path()),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EngineError::Configuration(_)));
    assert!(session.calls().is_empty());
}
