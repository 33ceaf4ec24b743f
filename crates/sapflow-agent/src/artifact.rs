//! Spreadsheet artifacts and screenshot naming.

use crate::dataset::Table;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatBorder, Workbook, XlsxError,
};
use sapflow::EngineError;
use serde_json::Value;
use std::path::Path;

const MAX_FILENAME_LEN: usize = 150;

static FORBIDDEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[',;`~]").unwrap());

/// Turns an arbitrary error message into a filename fragment that is
/// safe on network shares: forbidden and control characters become
/// underscores, reserved device names are prefixed, and the result is
/// truncated to leave room for the extension.
pub fn safe_filename(s: &str) -> String {
    let s = FORBIDDEN.replace_all(s, "_");
    let s = WHITESPACE.replace_all(s.trim(), "_");
    let s = PUNCTUATION.replace_all(&s, "_");
    let mut s: String = s.chars().filter(|c| (' '..='~').contains(c)).collect();

    let stem = s.split('.').next().unwrap_or("").to_ascii_uppercase();
    if is_reserved_name(&stem) {
        s = format!("_{s}");
    }
    s.chars().take(MAX_FILENAME_LEN).collect()
}

fn is_reserved_name(stem: &str) -> bool {
    matches!(stem, "CON" | "PRN" | "AUX" | "NUL")
        || (stem.len() == 4
            && (stem.starts_with("COM") || stem.starts_with("LPT"))
            && stem[3..].chars().all(|c| c.is_ascii_digit() && c != '0'))
}

/// Serializes a table to xlsx: bold header on a fixed background, frozen
/// header row plus the first two columns, autofit, and a whole-number
/// display format for columns whose every value is integral. Document
/// properties are pinned so per-order checkpoint rewrites of identical
/// content produce identical files.
pub fn write_table(table: &Table, path: &Path) -> Result<(), EngineError> {
    let mut workbook = Workbook::new();
    let stamp = ExcelDateTime::from_ymd(2024, 1, 1).map_err(xlsx_err)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&stamp));

    let worksheet = workbook.add_worksheet();
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::Yellow)
        .set_border(FormatBorder::Thin);
    let integer_format = Format::new().set_num_format("0");

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_with_format(0, col as u16, name.as_str(), &header_format)
            .map_err(xlsx_err)?;
    }

    let integer_columns: Vec<bool> = table
        .columns
        .iter()
        .map(|name| column_is_integer(table, name))
        .collect();

    for (r, row) in table.rows.iter().enumerate() {
        for (c, name) in table.columns.iter().enumerate() {
            let (row_idx, col_idx) = ((r + 1) as u32, c as u16);
            match row.get(name).unwrap_or(&Value::Null) {
                Value::Null => {}
                Value::String(s) => {
                    worksheet
                        .write_string(row_idx, col_idx, s.as_str())
                        .map_err(xlsx_err)?;
                }
                Value::Number(n) => {
                    let number = n.as_f64().unwrap_or_default();
                    if integer_columns[c] {
                        worksheet
                            .write_number_with_format(row_idx, col_idx, number, &integer_format)
                            .map_err(xlsx_err)?;
                    } else {
                        worksheet.write_number(row_idx, col_idx, number).map_err(xlsx_err)?;
                    }
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row_idx, col_idx, *b).map_err(xlsx_err)?;
                }
                other => {
                    worksheet
                        .write_string(row_idx, col_idx, other.to_string())
                        .map_err(xlsx_err)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 2).map_err(xlsx_err)?;
    worksheet.autofit();
    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

fn xlsx_err(e: XlsxError) -> EngineError {
    EngineError::Environment(format!("spreadsheet write failed: {e}"))
}

fn column_is_integer(table: &Table, name: &str) -> bool {
    let mut saw_number = false;
    for row in &table.rows {
        match row.get(name) {
            Some(Value::Number(n)) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() != 0.0 {
                    return false;
                }
                saw_number = true;
            }
            Some(Value::Null) | None => {}
            Some(_) => return false,
        }
    }
    saw_number
}
