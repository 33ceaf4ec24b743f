//! Batch order creation: walks a spreadsheet of grouped line items and
//! drives one transaction per group, checkpointing results to disk after
//! every order so a crash never loses completed work.

use crate::artifact::{safe_filename, write_table};
use crate::config::Settings;
use crate::dataset::{insert_result_column, load_table, resolve_working_path, segment_orders, Table};
use sapflow::{
    fill_screen, record_text, run_post_actions, EngineError, GuiSession, Record, RetryPolicy,
    ScreenData, ScreenOrder, ScreenRegistry, VKey,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const UPDATED_SUFFIX: &str = "updated.xlsx";
const ERRORS_SUFFIX: &str = "errors.xlsx";

fn default_sentinel_column() -> String {
    "po number".to_string()
}

fn default_result_column() -> String {
    "sales order".to_string()
}

fn default_transaction_code() -> String {
    "va01".to_string()
}

fn default_separator_rows() -> bool {
    true
}

/// One batch run: which file to process and how to drive the screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Spreadsheet of line items, one order per group of rows.
    pub input_path: PathBuf,
    /// Values shared by every order in the batch (order type, sales
    /// organization, payment terms and the like), keyed by field name.
    #[serde(default)]
    pub header_fields: Record,
    /// Screens to fill, in order. Empty means the caller supplies a
    /// default sequence.
    #[serde(default)]
    pub screen_sequence: Vec<ScreenOrder>,
    /// Column whose empty cells delimit the groups.
    #[serde(default = "default_sentinel_column")]
    pub sentinel_column: String,
    /// Column that receives the created document number or the error text.
    #[serde(default = "default_result_column")]
    pub result_column: String,
    #[serde(default = "default_transaction_code")]
    pub transaction_code: String,
    /// Insert a blank row between groups in the output files.
    #[serde(default = "default_separator_rows")]
    pub separator_rows: bool,
}

impl BatchJob {
    /// A job with the conventional column names and transaction code;
    /// callers fill in header fields and the screen sequence.
    pub fn new(input_path: impl Into<PathBuf>) -> BatchJob {
        BatchJob {
            input_path: input_path.into(),
            header_fields: Record::new(),
            screen_sequence: Vec::new(),
            sentinel_column: default_sentinel_column(),
            result_column: default_result_column(),
            transaction_code: default_transaction_code(),
            separator_rows: default_separator_rows(),
        }
    }
}

/// A single failed order, as reported in the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderError {
    pub kind: String,
    pub message: String,
    pub business_key: Option<String>,
    pub screenshot_path: Option<String>,
}

/// Outcome of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_orders: usize,
    pub orders_created: usize,
    pub orders_failed: usize,
    pub errors: Vec<OrderError>,
    pub output_path: PathBuf,
    pub error_path: Option<PathBuf>,
    pub finished_at: String,
}

/// Runs the batch end to end. Fatal errors (unreadable input, login
/// exhaustion) abort the run; per-order errors are recorded and the
/// loop moves on. Cancellation is honored between orders only, so an
/// in-flight transaction is never abandoned halfway.
pub async fn run_batch(
    session: &dyn GuiSession,
    job: &BatchJob,
    registry: &ScreenRegistry,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<BatchSummary, EngineError> {
    registry.validate_sequence(&job.screen_sequence)?;

    let input_path =
        resolve_working_path(Path::new(&settings.network_root), &job.input_path).await?;
    let mut table = load_table(&input_path).await?;
    insert_result_column(&mut table, &job.sentinel_column, &job.result_column);
    let orders = segment_orders(&table, &job.sentinel_column);
    info!(orders = orders.len(), rows = table.rows.len(), "input segmented");

    RetryPolicy::LOGIN
        .run(|| session.login(&settings.erp_username, &settings.erp_password))
        .await?;

    let output_path = input_path.with_extension(UPDATED_SUFFIX);
    let error_path = input_path.with_extension(ERRORS_SUFFIX);
    let mut updated = table.empty_like();
    let mut failed = table.empty_like();
    let mut errors = Vec::new();
    let mut orders_created = 0usize;

    let total = orders.len();
    for (order_no, rows) in orders.iter() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled(
                "batch cancelled between orders".to_string(),
            ));
        }
        let business_key = rows
            .first()
            .and_then(|row| record_text(row, &job.sentinel_column));
        let key_label = business_key.clone().unwrap_or_else(|| order_no.to_string());
        info!(order = order_no, key = %key_label, "creating order");

        let outcome = create_order(session, job, registry, rows).await;
        let mut annotated: Vec<Record> = rows.to_vec();

        // Each order's line items land in exactly one output table.
        match outcome {
            Ok(document) => {
                info!(order = order_no, document = %document, "order created");
                for row in &mut annotated {
                    row.insert(job.result_column.clone(), document.clone().into());
                }
                append_group(&mut updated, &annotated, job.separator_rows);
                orders_created += 1;
            }
            Err(err) => {
                error!(order = order_no, key = %key_label, error = %err, "order failed");
                let screenshot = capture_failure_screenshot(
                    session,
                    &input_path,
                    *order_no,
                    &key_label,
                    &err.to_string(),
                )
                .await;
                for row in &mut annotated {
                    row.insert(job.result_column.clone(), err.to_string().into());
                }
                append_group(&mut failed, &annotated, job.separator_rows);
                errors.push(OrderError {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    business_key,
                    screenshot_path: screenshot,
                });
            }
        }

        // checkpoint after every order
        write_table(&updated, &output_path)?;
        if !failed.rows.is_empty() {
            write_table(&failed, &error_path)?;
        }
    }

    write_table(&updated, &output_path)?;
    let error_path = if failed.rows.is_empty() {
        None
    } else {
        write_table(&failed, &error_path)?;
        Some(error_path)
    };

    Ok(BatchSummary {
        total_orders: total,
        orders_created,
        orders_failed: errors.len(),
        errors,
        output_path,
        error_path,
        finished_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Appends one order's rows, preceded by a blank separator row when the
/// table already holds earlier orders. Files never start or end with a
/// separator.
fn append_group(table: &mut Table, rows: &[Record], separator: bool) {
    if separator && !table.rows.is_empty() {
        let blank = table.blank_row();
        table.rows.push(blank);
    }
    table.rows.extend(rows.iter().cloned());
}

async fn capture_failure_screenshot(
    session: &dyn GuiSession,
    input_path: &Path,
    order_no: usize,
    key: &str,
    message: &str,
) -> Option<String> {
    let name = format!(
        "screenshot_{}_{}_{}.png",
        order_no,
        safe_filename(key),
        safe_filename(message)
    );
    let path = input_path.parent().unwrap_or_else(|| Path::new(".")).join(name);
    match session.take_screenshot(&path).await {
        Ok(()) => Some(path.display().to_string()),
        Err(err) => {
            warn!(error = %err, "screenshot capture failed");
            None
        }
    }
}

/// Drives one order through the configured screens and returns the
/// document number read back from the status line after saving.
async fn create_order(
    session: &dyn GuiSession,
    job: &BatchJob,
    registry: &ScreenRegistry,
    rows: &[Record],
) -> Result<String, EngineError> {
    session.start_transaction(&job.transaction_code).await?;

    for order in &job.screen_sequence {
        let screen = registry.get(&order.name).ok_or_else(|| {
            EngineError::Configuration(format!("no screen mapping registered for '{}'", order.name))
        })?;
        let data = if screen.header {
            ScreenData::Header(&job.header_fields)
        } else {
            ScreenData::Items(rows)
        };
        fill_screen(session, screen, data).await?;
        run_post_actions(session, order).await?;
    }

    session.send_key(VKey::CtrlS).await?;
    session.dismiss_popups().await?;
    if let Some(message) = session.check_error_dialog().await? {
        return Err(EngineError::Validation(message));
    }
    session.read_document_number().await
}
