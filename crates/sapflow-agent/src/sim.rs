//! In-process simulator implementing [`GuiSession`] against no real
//! client. Used by the `--simulate` CLI mode for dry runs and by the
//! integration tests; failure knobs inject the error shapes a live
//! client produces.

use async_trait::async_trait;
use sapflow::{EngineError, GuiSession, Record, StatusBar, VKey};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// One recorded primitive call, rendered as `op:detail` for assertions.
pub type SimCall = String;

#[derive(Default)]
struct SimState {
    calls: Vec<SimCall>,
    transaction_count: usize,
    document_counter: u64,
    fail_orders: HashSet<usize>,
    login_failures: u32,
    set_text_failures: HashMap<String, u32>,
    click_failures: HashMap<String, u32>,
    status_errors: VecDeque<String>,
    missing_functions: HashSet<String>,
    missing_attributes: HashSet<String>,
    error_dialog: Option<String>,
}

/// A compliant, always-available ERP client stand-in.
#[derive(Default)]
pub struct SimSession {
    state: Mutex<SimState>,
}

impl SimSession {
    pub fn new() -> SimSession {
        SimSession::default()
    }

    /// The nth started transaction (1-based) raises a modal error dialog
    /// instead of saving.
    pub fn fail_transaction(&self, n: usize) {
        self.state.lock().unwrap().fail_orders.insert(n);
    }

    pub fn fail_login_times(&self, times: u32) {
        self.state.lock().unwrap().login_failures = times;
    }

    /// The next `times` writes to `id` fail as transient UI errors.
    pub fn fail_set_text(&self, id: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .set_text_failures
            .insert(id.to_string(), times);
    }

    pub fn fail_click(&self, id: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .click_failures
            .insert(id.to_string(), times);
    }

    /// Queue a status-bar rejection; each queued message is consumed by
    /// one `read_status` call.
    pub fn push_status_error(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .status_errors
            .push_back(message.to_string());
    }

    pub fn omit_function(&self, func: &str) {
        self.state
            .lock()
            .unwrap()
            .missing_functions
            .insert(func.to_string());
    }

    pub fn omit_attribute(&self, attribute: &str) {
        self.state
            .lock()
            .unwrap()
            .missing_attributes
            .insert(attribute.to_string());
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: impl Into<String>) {
        let call = call.into();
        debug!(call = %call, "sim");
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl GuiSession for SimSession {
    async fn login(&self, username: &str, _password: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("login:{username}"));
        if state.login_failures > 0 {
            state.login_failures -= 1;
            return Err(EngineError::TransientUi(
                "login window did not appear".to_string(),
            ));
        }
        Ok(())
    }

    async fn start_transaction(&self, code: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.transaction_count += 1;
        state.calls.push(format!("tcode:{code}"));
        if state.fail_orders.contains(&state.transaction_count) {
            state.error_dialog = Some("No customer master record exists for sold-to party".to_string());
        } else {
            state.error_dialog = None;
        }
        Ok(())
    }

    async fn set_text(&self, id: &str, value: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set:{id}={value}"));
        if let Some(remaining) = state.set_text_failures.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::ElementNotFound(id.to_string()));
            }
        }
        Ok(())
    }

    async fn click(&self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("click:{id}"));
        if let Some(remaining) = state.click_failures.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::ElementNotFound(id.to_string()));
            }
        }
        Ok(())
    }

    async fn select_menu(&self, id: &str) -> Result<(), EngineError> {
        self.record(format!("menu:{id}"));
        Ok(())
    }

    async fn send_key(&self, key: VKey) -> Result<(), EngineError> {
        self.record(format!("vkey:{}", key.code()));
        Ok(())
    }

    async fn fill_table(&self, id: &str, rows: &[Record]) -> Result<(), EngineError> {
        self.record(format!("table:{id}x{}", rows.len()));
        Ok(())
    }

    async fn dismiss_popups(&self) -> Result<(), EngineError> {
        self.record("dismiss");
        Ok(())
    }

    async fn read_status(&self) -> Result<StatusBar, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("status".to_string());
        match state.status_errors.pop_front() {
            Some(message) => Ok(StatusBar::error(message)),
            None => Ok(StatusBar::success()),
        }
    }

    async fn check_error_dialog(&self) -> Result<Option<String>, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state.error_dialog.clone())
    }

    async fn read_document_number(&self) -> Result<String, EngineError> {
        let mut state = self.state.lock().unwrap();
        state.document_counter += 1;
        let number = 4_500_000_000u64 + state.document_counter;
        state.calls.push(format!("document:{number}"));
        Ok(number.to_string())
    }

    async fn take_screenshot(&self, path: &Path) -> Result<(), EngineError> {
        self.record(format!("screenshot:{}", path.display()));
        // Minimal PNG header so the artifact is recognizably an image.
        std::fs::write(path, b"\x89PNG\r\n\x1a\n")
            .map_err(|e| EngineError::Environment(format!("screenshot write failed: {e}")))?;
        Ok(())
    }

    async fn call_control_function(
        &self,
        id: &str,
        func: &str,
        params: &[String],
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock().unwrap();
        if state.missing_functions.contains(func) {
            state.calls.push(format!("func-missing:{id}.{func}"));
            return Ok(false);
        }
        state
            .calls
            .push(format!("func:{id}.{func}({})", params.join(",")));
        Ok(true)
    }

    async fn set_control_attribute(
        &self,
        id: &str,
        attribute: &str,
        value: &str,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock().unwrap();
        if state.missing_attributes.contains(attribute) {
            state.calls.push(format!("attr-missing:{id}.{attribute}"));
            return Ok(false);
        }
        state.calls.push(format!("attr:{id}.{attribute}={value}"));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_failures_are_consumed_in_order() {
        let sim = SimSession::new();
        sim.fail_login_times(2);
        assert!(sim.login("rpa.user", "pw").await.is_err());
        assert!(sim.login("rpa.user", "pw").await.is_err());
        assert!(sim.login("rpa.user", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn failing_transaction_raises_an_error_dialog() {
        let sim = SimSession::new();
        sim.fail_transaction(2);
        sim.start_transaction("va01").await.unwrap();
        assert!(sim.check_error_dialog().await.unwrap().is_none());
        sim.start_transaction("va01").await.unwrap();
        assert!(sim.check_error_dialog().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn document_numbers_are_sequential() {
        let sim = SimSession::new();
        assert_eq!(sim.read_document_number().await.unwrap(), "4500000001");
        assert_eq!(sim.read_document_number().await.unwrap(), "4500000002");
    }
}
