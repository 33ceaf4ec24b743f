//! Working-file loading and sales-order segmentation.
//!
//! The input spreadsheet is read with empty rows preserved: a gap in the
//! purchase-order sentinel column is the separator between orders, not
//! noise to drop.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use sapflow::{value_is_empty, EngineError, Record, RetryPolicy};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A tabular dataset with its column order kept separate from the rows,
/// since records are maps.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn empty_like(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    /// An all-null row, used as the separator between orders in outputs.
    pub fn blank_row(&self) -> Record {
        self.columns
            .iter()
            .map(|c| (c.clone(), Value::Null))
            .collect()
    }
}

/// Joins the working-file path against the configured network root.
/// Retried with a long backoff: the drive mount is the slowest
/// dependency to come back.
pub async fn resolve_working_path(root: &Path, relative: &Path) -> Result<PathBuf, EngineError> {
    RetryPolicy::PATH_RESOLVE
        .run(|| async {
            let merged = root.join(relative);
            if merged.exists() {
                Ok(merged)
            } else {
                Err(EngineError::Environment(format!(
                    "file not found at {} (the network drive may be down)",
                    merged.display()
                )))
            }
        })
        .await
}

pub async fn load_table(path: &Path) -> Result<Table, EngineError> {
    RetryPolicy::PREFLIGHT.run(|| async { read_table(path) }).await
}

fn read_table(path: &Path) -> Result<Table, EngineError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        EngineError::Environment(format!("failed to open workbook {}: {e}", path.display()))
    })?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| EngineError::Environment(format!("{} has no sheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| EngineError::Environment(format!("failed to read sheet '{sheet}': {e}")))?;

    let mut rows_iter = range.rows();
    let Some(header) = rows_iter.next() else {
        return Ok(Table::default());
    };
    let columns: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    let rows: Vec<Record> = rows_iter
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = row.get(i).map(cell_to_value).unwrap_or(Value::Null);
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    debug!(rows = rows.len(), columns = columns.len(), "loaded working file");
    Ok(Table { columns, rows })
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) if d.time().num_seconds_from_midnight() == 0 => {
                Value::String(d.format("%Y-%m-%d").to_string())
            }
            Some(d) => Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Null,
        },
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("#ERROR {e:?}")),
    }
}

/// Inserts the nullable result column immediately after the sentinel
/// column (after the first column when the sentinel is absent). No-op
/// when the column already exists, so re-processed files stay intact.
pub fn insert_result_column(table: &mut Table, sentinel: &str, result: &str) {
    if table.columns.iter().any(|c| c == result) {
        return;
    }
    let index = table
        .columns
        .iter()
        .position(|c| c == sentinel)
        .map(|i| i + 1)
        .unwrap_or_else(|| 1.min(table.columns.len()));
    table.columns.insert(index, result.to_string());
    for row in &mut table.rows {
        row.insert(result.to_string(), Value::Null);
    }
}

/// Segments rows into sales orders by the sentinel column: a non-empty
/// sentinel row joins the current bucket, an empty one advances the
/// bucket counter. Buckets are 1-based and monotonic (not necessarily
/// contiguous after consecutive gaps); empty buckets never materialize.
pub fn segment_orders(table: &Table, sentinel: &str) -> BTreeMap<usize, Vec<Record>> {
    let mut orders: BTreeMap<usize, Vec<Record>> = BTreeMap::new();
    let mut bucket = 1usize;
    for row in &table.rows {
        let present = row.get(sentinel).map(|v| !value_is_empty(v)).unwrap_or(false);
        if present {
            orders.entry(bucket).or_default().push(row.clone());
        } else {
            bucket += 1;
        }
    }
    orders
}
