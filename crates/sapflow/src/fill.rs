//! The screen fill engine and element dispatcher.
//!
//! Per screen the engine runs entry-point actions, dispatches every field
//! through the type-appropriate strategy, confirms, and interprets the
//! status bar. A status-bar rejection re-applies the screen's fields
//! exactly once before failing the transaction.

use crate::errors::EngineError;
use crate::retry::RetryPolicy;
use crate::screen::{Action, ActionType, AttachmentSpec, ElementType, GuiElement, Screen, ScreenOrder};
use crate::session::{record_text, GuiSession, Record, VKey};
use tracing::{debug, error, info, warn};

/// What a screen is filled from: the transaction's line items, or the
/// separately supplied header fields.
#[derive(Clone, Copy)]
pub enum ScreenData<'a> {
    Header(&'a Record),
    Items(&'a [Record]),
}

impl<'a> ScreenData<'a> {
    /// The record plain fields read from (first line item for item data).
    pub fn primary(&self) -> Option<&'a Record> {
        match self {
            ScreenData::Header(record) => Some(record),
            ScreenData::Items(rows) => rows.first(),
        }
    }

    pub fn items(&self) -> &'a [Record] {
        match self {
            ScreenData::Header(_) => &[],
            ScreenData::Items(rows) => rows,
        }
    }
}

/// Drives one screen end to end: entry actions, fields, confirmation.
pub async fn fill_screen(
    session: &dyn GuiSession,
    screen: &Screen,
    data: ScreenData<'_>,
) -> Result<(), EngineError> {
    run_entry_actions(session, screen).await?;

    // At most one re-fill pass: many validation errors resolve once
    // dependent fields are re-populated.
    for refill in 0..2u8 {
        fill_fields(session, screen, data).await?;

        if !screen.press_confirm {
            return Ok(());
        }

        debug!(screen = %screen.name, "confirming screen");
        session.send_key(VKey::Enter).await?;
        session.dismiss_popups().await?;
        let status = session.read_status().await?;
        if !status.level.is_error() {
            return Ok(());
        }
        if refill == 0 {
            warn!(
                screen = %screen.name,
                message = %status.message,
                "status bar reported an error; re-applying screen fields"
            );
        } else {
            return Err(EngineError::Validation(status.message));
        }
    }
    unreachable!("screen refill loop always returns");
}

async fn fill_fields(
    session: &dyn GuiSession,
    screen: &Screen,
    data: ScreenData<'_>,
) -> Result<(), EngineError> {
    for field in &screen.fields {
        match field.element.element_type {
            ElementType::Text => {
                fill_text_field(session, screen, &field.name, &field.element, data).await?;
            }
            ElementType::Table => {
                fill_table_element(session, &field.name, &field.element, data).await?;
            }
            ElementType::Composite => {
                fill_composite(session, &field.name, &field.element).await?;
            }
            // Buttons are navigation companions referenced by actions and
            // attachment specs, never filled.
            ElementType::Button => {}
            ElementType::Checkbox | ElementType::Radio => {
                return Err(EngineError::Configuration(format!(
                    "field '{}' in screen '{}' has unsupported element type {:?}",
                    field.name, screen.name, field.element.element_type
                )));
            }
        }
    }
    Ok(())
}

async fn fill_text_field(
    session: &dyn GuiSession,
    screen: &Screen,
    name: &str,
    element: &GuiElement,
    data: ScreenData<'_>,
) -> Result<(), EngineError> {
    let Some(record) = data.primary() else {
        return Ok(());
    };
    // Empty input must never overwrite an existing ERP default.
    let Some(value) = record_text(record, name) else {
        debug!(field = name, screen = %screen.name, "no value supplied; leaving field untouched");
        return Ok(());
    };

    let policy = RetryPolicy::FIELD_SET;
    for attempt in 1..=policy.attempts {
        match session.set_text(&element.id, &value).await {
            Ok(()) => {
                debug!(field = name, screen = %screen.name, "field set");
                return Ok(());
            }
            Err(e) => {
                warn!(field = name, attempt, error = %e, "failed to set field");
                // A pending dialog frequently blocks re-entry; a confirm
                // keystroke clears it before the next attempt.
                session.send_key(VKey::Enter).await.ok();
                if attempt < policy.attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
    // Exhausted retries skip the field rather than failing the screen.
    warn!(field = name, screen = %screen.name, "retries exhausted; skipping field");
    Ok(())
}

async fn fill_table_element(
    session: &dyn GuiSession,
    name: &str,
    element: &GuiElement,
    data: ScreenData<'_>,
) -> Result<(), EngineError> {
    let rows = data.items();
    debug!(field = name, rows = rows.len(), "bulk-filling table");
    session.fill_table(&element.id, rows).await?;

    let Some(spec) = &element.attachment else {
        return Ok(());
    };
    let Some(code) = rows.first().and_then(|row| record_text(row, &spec.column)) else {
        return Ok(());
    };
    info!(kind = %spec.kind, code = %code, "attaching reference document to all rows");
    attach_reference_document(session, spec, &code).await?;
    session.dismiss_popups().await?;
    Ok(())
}

async fn attach_reference_document(
    session: &dyn GuiSession,
    spec: &AttachmentSpec,
    code: &str,
) -> Result<(), EngineError> {
    session.click(&spec.select_all).await?;
    session.select_menu(&spec.menu_id).await?;
    session.set_text(&spec.kind_field_id, &spec.kind).await?;
    session.set_text(&spec.number_field_id, code).await?;
    session.send_key(VKey::Enter).await?;
    Ok(())
}

/// Composite directives tolerate ERP client version drift: a control that
/// no longer exposes a declared function or attribute is logged and
/// skipped, the remaining directives still run.
async fn fill_composite(
    session: &dyn GuiSession,
    name: &str,
    element: &GuiElement,
) -> Result<(), EngineError> {
    for call in &element.call_functions {
        let found = session
            .call_control_function(&element.id, &call.func, &call.params)
            .await?;
        if found {
            info!(func = %call.func, field = name, params = ?call.params, "called control function");
        } else {
            error!(func = %call.func, field = name, "control function not found; skipping directive");
        }
    }
    for set in &element.set_attributes {
        let found = session
            .set_control_attribute(&element.id, &set.attribute, &set.value)
            .await?;
        if found {
            info!(attribute = %set.attribute, field = name, value = %set.value, "set control attribute");
        } else {
            error!(attribute = %set.attribute, field = name, "control attribute not found; skipping directive");
        }
    }
    Ok(())
}

async fn run_entry_actions(session: &dyn GuiSession, screen: &Screen) -> Result<(), EngineError> {
    for action in &screen.entry_point {
        debug!(
            screen = %screen.name,
            action = ?action.action_type,
            target = action.target_id.as_deref().unwrap_or(""),
            "entry action"
        );
        match action.action_type {
            ActionType::Click => {
                let target = click_target(action, &screen.name)?;
                if let Err(e) = session.click(target).await {
                    // Screens may be revisited mid-transaction; a missing
                    // target means this navigation already happened.
                    debug!(target = %target, error = %e, "entry click target not present; continuing");
                }
            }
            ActionType::Confirm => session.send_key(VKey::Enter).await?,
            ActionType::Back => session.send_key(VKey::F3).await?,
        }
    }
    Ok(())
}

/// Post-fill actions run after a successful confirm; unlike entry actions
/// their failures propagate, and popups are dismissed after each.
pub async fn run_post_actions(
    session: &dyn GuiSession,
    order: &ScreenOrder,
) -> Result<(), EngineError> {
    for action in &order.post_actions {
        info!(
            screen = %order.name,
            action = ?action.action_type,
            target = action.target_id.as_deref().unwrap_or(""),
            description = action.description.as_deref().unwrap_or(""),
            "post action"
        );
        match action.action_type {
            ActionType::Click => session.click(click_target(action, &order.name)?).await?,
            ActionType::Confirm => session.send_key(VKey::Enter).await?,
            ActionType::Back => session.send_key(VKey::F3).await?,
        }
        session.dismiss_popups().await?;
    }
    Ok(())
}

fn click_target<'a>(action: &'a Action, screen: &str) -> Result<&'a str, EngineError> {
    action.target_id.as_deref().ok_or_else(|| {
        EngineError::Configuration(format!(
            "CLICK action for screen '{screen}' has no target_id"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{CallFunction, SetAttribute};
    use crate::session::{StatusBar, StatusLevel};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::path::Path;
    use std::sync::Mutex;

    /// Recording fake: logs every call, with scriptable failures.
    #[derive(Default)]
    struct FakeSession {
        calls: Mutex<Vec<String>>,
        set_text_failures: Mutex<HashMap<String, u32>>,
        failing_clicks: Mutex<HashSet<String>>,
        statuses: Mutex<VecDeque<StatusBar>>,
        missing_functions: Mutex<HashSet<String>>,
        missing_attributes: Mutex<HashSet<String>>,
    }

    impl FakeSession {
        fn log(&self, entry: impl Into<String>) {
            self.calls.lock().unwrap().push(entry.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn fail_set_text(&self, id: &str, times: u32) {
            self.set_text_failures
                .lock()
                .unwrap()
                .insert(id.to_string(), times);
        }

        fn fail_click(&self, id: &str) {
            self.failing_clicks.lock().unwrap().insert(id.to_string());
        }

        fn push_status(&self, status: StatusBar) {
            self.statuses.lock().unwrap().push_back(status);
        }

        fn omit_function(&self, func: &str) {
            self.missing_functions
                .lock()
                .unwrap()
                .insert(func.to_string());
        }

        fn omit_attribute(&self, attribute: &str) {
            self.missing_attributes
                .lock()
                .unwrap()
                .insert(attribute.to_string());
        }
    }

    #[async_trait]
    impl GuiSession for FakeSession {
        async fn login(&self, username: &str, _password: &str) -> Result<(), EngineError> {
            self.log(format!("login:{username}"));
            Ok(())
        }

        async fn start_transaction(&self, code: &str) -> Result<(), EngineError> {
            self.log(format!("start_transaction:{code}"));
            Ok(())
        }

        async fn set_text(&self, id: &str, value: &str) -> Result<(), EngineError> {
            self.log(format!("set_text:{id}={value}"));
            let mut failures = self.set_text_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(EngineError::TransientUi("element busy".to_string()));
                }
            }
            Ok(())
        }

        async fn click(&self, id: &str) -> Result<(), EngineError> {
            self.log(format!("click:{id}"));
            if self.failing_clicks.lock().unwrap().contains(id) {
                return Err(EngineError::ElementNotFound(id.to_string()));
            }
            Ok(())
        }

        async fn select_menu(&self, id: &str) -> Result<(), EngineError> {
            self.log(format!("select_menu:{id}"));
            Ok(())
        }

        async fn send_key(&self, key: VKey) -> Result<(), EngineError> {
            self.log(format!("send_key:{key:?}"));
            Ok(())
        }

        async fn fill_table(&self, id: &str, rows: &[Record]) -> Result<(), EngineError> {
            self.log(format!("fill_table:{id}:{}", rows.len()));
            Ok(())
        }

        async fn dismiss_popups(&self) -> Result<(), EngineError> {
            self.log("dismiss_popups");
            Ok(())
        }

        async fn read_status(&self) -> Result<StatusBar, EngineError> {
            self.log("read_status");
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(StatusBar::success))
        }

        async fn check_error_dialog(&self) -> Result<Option<String>, EngineError> {
            self.log("check_error_dialog");
            Ok(None)
        }

        async fn read_document_number(&self) -> Result<String, EngineError> {
            self.log("read_document_number");
            Ok("40001".to_string())
        }

        async fn take_screenshot(&self, path: &Path) -> Result<(), EngineError> {
            self.log(format!("take_screenshot:{}", path.display()));
            Ok(())
        }

        async fn call_control_function(
            &self,
            id: &str,
            func: &str,
            _params: &[String],
        ) -> Result<bool, EngineError> {
            self.log(format!("call_function:{id}:{func}"));
            Ok(!self.missing_functions.lock().unwrap().contains(func))
        }

        async fn set_control_attribute(
            &self,
            id: &str,
            attribute: &str,
            _value: &str,
        ) -> Result<bool, EngineError> {
            self.log(format!("set_attribute:{id}:{attribute}"));
            Ok(!self.missing_attributes.lock().unwrap().contains(attribute))
        }
    }

    fn record(entries: &[(&str, serde_json::Value)]) -> Record {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn empty_value_leaves_field_untouched() {
        let session = FakeSession::default();
        let screen = Screen::new("S")
            .field("order type", GuiElement::text("el-order"))
            .field("division", GuiElement::text("el-div"))
            .no_confirm();
        let data = record(&[
            ("order type", json!("ZOR")),
            ("division", json!("")),
        ]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();

        let calls = session.calls();
        assert!(calls.contains(&"set_text:el-order=ZOR".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("set_text:el-div")));
    }

    #[tokio::test(start_paused = true)]
    async fn field_retries_three_times_then_is_skipped() {
        let session = FakeSession::default();
        session.fail_set_text("el-order", u32::MAX);
        let screen = Screen::new("S")
            .field("order type", GuiElement::text("el-order"))
            .field("division", GuiElement::text("el-div"))
            .no_confirm();
        let data = record(&[("order type", json!("ZOR")), ("division", json!("10"))]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();

        assert_eq!(session.count("set_text:el-order"), 3);
        // A confirm keystroke is sent after each failed attempt.
        assert_eq!(session.count("send_key:Enter"), 3);
        // The screen continues past the skipped field.
        assert_eq!(session.count("set_text:el-div"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_set_failure_recovers_within_budget() {
        let session = FakeSession::default();
        session.fail_set_text("el-order", 2);
        let screen = Screen::new("S")
            .field("order type", GuiElement::text("el-order"))
            .no_confirm();
        let data = record(&[("order type", json!("ZOR"))]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();
        assert_eq!(session.count("set_text:el-order"), 3);
    }

    #[tokio::test]
    async fn status_error_refills_once_then_fails() {
        let session = FakeSession::default();
        session.push_status(StatusBar::error("order type is invalid"));
        session.push_status(StatusBar::error("order type is invalid"));
        let screen = Screen::new("S").field("order type", GuiElement::text("el-order"));
        let data = record(&[("order type", json!("ZOR"))]);

        let err = fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(m) if m.contains("invalid")));
        // Fields applied exactly twice: the original pass and one re-fill.
        assert_eq!(session.count("set_text:el-order"), 2);
        assert_eq!(session.count("read_status"), 2);
    }

    #[tokio::test]
    async fn status_error_once_recovers_on_refill() {
        let session = FakeSession::default();
        session.push_status(StatusBar::error("incomplete"));
        session.push_status(StatusBar {
            level: StatusLevel::Success,
            message: "ok".to_string(),
        });
        let screen = Screen::new("S").field("order type", GuiElement::text("el-order"));
        let data = record(&[("order type", json!("ZOR"))]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();
        assert_eq!(session.count("set_text:el-order"), 2);
    }

    #[tokio::test]
    async fn entry_click_on_missing_target_is_ignored() {
        let session = FakeSession::default();
        session.fail_click("tab-sales");
        let screen = Screen::new("S")
            .entry(Action::click("tab-sales"))
            .field("payment terms", GuiElement::text("el-terms"))
            .no_confirm();
        let data = record(&[("payment terms", json!("N30"))]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();
        assert_eq!(session.count("set_text:el-terms"), 1);
    }

    #[tokio::test]
    async fn unsupported_element_type_is_a_configuration_error() {
        let session = FakeSession::default();
        let mut element = GuiElement::text("el-check");
        element.element_type = ElementType::Checkbox;
        let screen = Screen::new("S").field("complete delivery", element).no_confirm();
        let data = record(&[("complete delivery", json!("X"))]);

        let err = fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn table_fill_attaches_declared_document() {
        let session = FakeSession::default();
        let spec = AttachmentSpec {
            column: "attachment".to_string(),
            select_all: "btn-select-all".to_string(),
            menu_id: "menu-attach".to_string(),
            kind_field_id: "dlg-kind".to_string(),
            number_field_id: "dlg-number".to_string(),
            kind: "PIS".to_string(),
        };
        let screen = Screen::new("ITEMS")
            .field("table", GuiElement::table("tbl-items").with_attachment(spec))
            .no_confirm();
        let rows = vec![
            record(&[("material", json!("M-1")), ("attachment", json!("DOC-77"))]),
            record(&[("material", json!("M-2"))]),
        ];

        fill_screen(&session, &screen, ScreenData::Items(&rows))
            .await
            .unwrap();

        let calls = session.calls();
        assert!(calls.contains(&"fill_table:tbl-items:2".to_string()));
        assert!(calls.contains(&"click:btn-select-all".to_string()));
        assert!(calls.contains(&"select_menu:menu-attach".to_string()));
        assert!(calls.contains(&"set_text:dlg-kind=PIS".to_string()));
        assert!(calls.contains(&"set_text:dlg-number=DOC-77".to_string()));
    }

    #[tokio::test]
    async fn table_without_attachment_code_skips_the_procedure() {
        let session = FakeSession::default();
        let spec = AttachmentSpec {
            column: "attachment".to_string(),
            select_all: "btn-select-all".to_string(),
            menu_id: "menu-attach".to_string(),
            kind_field_id: "dlg-kind".to_string(),
            number_field_id: "dlg-number".to_string(),
            kind: "PIS".to_string(),
        };
        let screen = Screen::new("ITEMS")
            .field("table", GuiElement::table("tbl-items").with_attachment(spec))
            .no_confirm();
        let rows = vec![record(&[("material", json!("M-1"))])];

        fill_screen(&session, &screen, ScreenData::Items(&rows))
            .await
            .unwrap();
        assert_eq!(session.count("click:btn-select-all"), 0);
    }

    #[tokio::test]
    async fn missing_composite_directives_are_skipped_not_fatal() {
        let session = FakeSession::default();
        session.omit_function("ensureVisibleHorizontalItem");
        session.omit_attribute("firstVisibleRow");
        let element = GuiElement::composite("shell-texts")
            .calling(CallFunction::new("selectItem", &["Z041", "Column1"]))
            .calling(CallFunction::new(
                "ensureVisibleHorizontalItem",
                &["Z041", "Column1"],
            ))
            .calling(CallFunction::new("doubleClickItem", &["Z041", "Column1"]))
            .setting(SetAttribute::new("firstVisibleRow", "0"));
        let screen = Screen::new("TEXTS").field("notify", element).no_confirm();
        let data = record(&[]);

        fill_screen(&session, &screen, ScreenData::Header(&data))
            .await
            .unwrap();

        // All three functions probed, including those after the missing one.
        assert_eq!(session.count("call_function:shell-texts"), 3);
        assert_eq!(session.count("set_attribute:shell-texts"), 1);
    }

    #[tokio::test]
    async fn post_actions_click_and_dismiss() {
        let session = FakeSession::default();
        let order = ScreenOrder::new("HEADER_ADD_DATA_B")
            .then(Action::back())
            .then(Action::confirm());

        run_post_actions(&session, &order).await.unwrap();

        let calls = session.calls();
        assert_eq!(
            calls,
            vec![
                "send_key:F3".to_string(),
                "dismiss_popups".to_string(),
                "send_key:Enter".to_string(),
                "dismiss_popups".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn post_action_click_failure_propagates() {
        let session = FakeSession::default();
        session.fail_click("btn-next");
        let order = ScreenOrder::new("S").then(Action::click("btn-next"));
        let err = run_post_actions(&session, &order).await.unwrap_err();
        assert!(matches!(err, EngineError::ElementNotFound(_)));
    }
}
