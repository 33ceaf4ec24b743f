//! The capability interface the fill engine drives.
//!
//! A [`GuiSession`] is one attached ERP client window. The engine never
//! holds ambient/global session state: the handle is threaded explicitly
//! through every call so tests can substitute a fake implementation.

use crate::errors::EngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One spreadsheet row / line item, keyed by logical column name.
pub type Record = serde_json::Map<String, Value>;

/// Virtual keys understood by the ERP client window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VKey {
    /// Confirm the current screen (vkey 0).
    Enter,
    /// Navigate back (vkey 3).
    F3,
    /// Save the current document (vkey 11).
    CtrlS,
}

impl VKey {
    pub fn code(&self) -> u16 {
        match self {
            VKey::Enter => 0,
            VKey::F3 => 3,
            VKey::CtrlS => 11,
        }
    }
}

/// Severity of a status-bar message, as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Error,
    Abort,
}

impl StatusLevel {
    /// The client reports single-letter codes (S/I/W/E/A). Unknown codes
    /// are treated as informational.
    pub fn from_code(code: &str) -> StatusLevel {
        match code {
            "S" => StatusLevel::Success,
            "W" => StatusLevel::Warning,
            "E" => StatusLevel::Error,
            "A" => StatusLevel::Abort,
            _ => StatusLevel::Info,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusLevel::Error | StatusLevel::Abort)
    }
}

/// The client's feedback line after an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBar {
    pub level: StatusLevel,
    pub message: String,
}

impl StatusBar {
    pub fn success() -> StatusBar {
        StatusBar {
            level: StatusLevel::Success,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> StatusBar {
        StatusBar {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }
}

/// Primitive operations exposed by an attached ERP GUI scripting session.
///
/// Implementations are owned by the hosting worker (COM bridge, remote
/// agent, simulator); the engine only consumes them. All operations block
/// the logical worker for their full duration — the underlying client
/// exposes a single interactive window.
#[async_trait]
pub trait GuiSession: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<(), EngineError>;

    /// Open a new transaction by code (e.g. `va01`).
    async fn start_transaction(&self, code: &str) -> Result<(), EngineError>;

    /// Set the text value of the element at `id`.
    async fn set_text(&self, id: &str, value: &str) -> Result<(), EngineError>;

    async fn click(&self, id: &str) -> Result<(), EngineError>;

    /// Select a menu entry by its locator.
    async fn select_menu(&self, id: &str) -> Result<(), EngineError>;

    async fn send_key(&self, key: VKey) -> Result<(), EngineError>;

    /// Bulk-populate a table control from line-item records.
    async fn fill_table(&self, id: &str, rows: &[Record]) -> Result<(), EngineError>;

    /// Close any modal popup dialogs currently blocking the window.
    async fn dismiss_popups(&self) -> Result<(), EngineError>;

    async fn read_status(&self) -> Result<StatusBar, EngineError>;

    /// Message of a modal error window that `dismiss_popups` cannot close,
    /// if one is present.
    async fn check_error_dialog(&self) -> Result<Option<String>, EngineError>;

    /// Document number announced by the client after a successful save.
    async fn read_document_number(&self) -> Result<String, EngineError>;

    async fn take_screenshot(&self, path: &Path) -> Result<(), EngineError>;

    /// Invoke a named operation on a composite control. Returns `Ok(false)`
    /// when the control does not expose the operation — callers treat that
    /// as a skippable directive, not a failure.
    async fn call_control_function(
        &self,
        id: &str,
        func: &str,
        params: &[String],
    ) -> Result<bool, EngineError>;

    /// Assign a named property on a composite control. Same soft-fail
    /// contract as [`GuiSession::call_control_function`].
    async fn set_control_attribute(
        &self,
        id: &str,
        attribute: &str,
        value: &str,
    ) -> Result<bool, EngineError>;
}

/// Renders the cell under `key` to the text to type, or `None` when the
/// record has no usable value. Whole numbers render without a trailing
/// fraction so numeric business keys round-trip cleanly.
pub fn record_text(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    return Some(format!("{}", f as i64));
                }
            }
            Some(n.to_string())
        }
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// A missing, null or blank-string cell counts as empty.
pub fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
