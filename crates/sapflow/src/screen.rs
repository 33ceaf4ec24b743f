//! Declarative screen model.
//!
//! Screens, elements and actions are plain data: the fill engine in
//! [`crate::fill`] interprets them, nothing here carries behavior. Maps
//! are defined in code (or deserialized from job payloads) and registered
//! in a [`crate::ScreenRegistry`] at process start.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Text,
    Table,
    Button,
    Checkbox,
    Radio,
    /// A shell-style control that is driven through function calls and
    /// attribute assignments instead of plain text entry.
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Click,
    Confirm,
    Back,
}

/// A navigation step, used both as screen entry point and as post-fill
/// action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Element locator for CLICK actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Action {
    pub fn click(target_id: impl Into<String>) -> Action {
        Action {
            action_type: ActionType::Click,
            target_id: Some(target_id.into()),
            description: None,
        }
    }

    pub fn confirm() -> Action {
        Action {
            action_type: ActionType::Confirm,
            target_id: None,
            description: None,
        }
    }

    pub fn back() -> Action {
        Action {
            action_type: ActionType::Back,
            target_id: None,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Action {
        self.description = Some(description.into());
        self
    }
}

/// A named operation to invoke on a composite control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallFunction {
    pub func: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl CallFunction {
    pub fn new(func: impl Into<String>, params: &[&str]) -> CallFunction {
        CallFunction {
            func: func.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A named property to assign on a composite control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAttribute {
    pub attribute: String,
    pub value: String,
}

impl SetAttribute {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> SetAttribute {
        SetAttribute {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// The "select all rows then attach a cross-referenced document"
/// sub-procedure a table element may carry. All locators are screen-map
/// data so the same engine serves differently customized clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSpec {
    /// Line-item column holding the document number to attach; the
    /// procedure runs only when the first item has a value there.
    pub column: String,
    /// Locator of the select-all button for the table.
    pub select_all: String,
    /// Locator of the menu entry opening the attachment dialog.
    pub menu_id: String,
    /// Locator of the dialog field taking the document kind.
    pub kind_field_id: String,
    /// Locator of the dialog field taking the document number.
    pub number_field_id: String,
    /// Document kind typed into the dialog (e.g. `PIS`).
    pub kind: String,
}

/// One addressable control of a screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuiElement {
    /// Opaque locator understood by the GUI session.
    pub id: String,
    #[serde(rename = "type", default = "default_element_type")]
    pub element_type: ElementType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_functions: Vec<CallFunction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_attributes: Vec<SetAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentSpec>,
}

fn default_element_type() -> ElementType {
    ElementType::Text
}

impl GuiElement {
    pub fn text(id: impl Into<String>) -> GuiElement {
        GuiElement {
            id: id.into(),
            element_type: ElementType::Text,
            call_functions: Vec::new(),
            set_attributes: Vec::new(),
            attachment: None,
        }
    }

    pub fn table(id: impl Into<String>) -> GuiElement {
        GuiElement {
            element_type: ElementType::Table,
            ..GuiElement::text(id)
        }
    }

    pub fn button(id: impl Into<String>) -> GuiElement {
        GuiElement {
            element_type: ElementType::Button,
            ..GuiElement::text(id)
        }
    }

    pub fn composite(id: impl Into<String>) -> GuiElement {
        GuiElement {
            element_type: ElementType::Composite,
            ..GuiElement::text(id)
        }
    }

    pub fn with_attachment(mut self, spec: AttachmentSpec) -> GuiElement {
        self.attachment = Some(spec);
        self
    }

    pub fn calling(mut self, call: CallFunction) -> GuiElement {
        self.call_functions.push(call);
        self
    }

    pub fn setting(mut self, attribute: SetAttribute) -> GuiElement {
        self.set_attributes.push(attribute);
        self
    }
}

/// A field is an element under its logical name; the name doubles as the
/// record key the value is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenField {
    pub name: String,
    pub element: GuiElement,
}

/// One navigable page of the ERP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    pub name: String,
    /// Fields in declaration order; the engine dispatches them in order.
    #[serde(default)]
    pub fields: Vec<ScreenField>,
    /// How to reach this screen from the previous one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_point: Vec<Action>,
    /// Whether to confirm after filling and interpret the status bar.
    #[serde(default = "default_true")]
    pub press_confirm: bool,
    /// Header screens are filled from the separately supplied header
    /// fields instead of the transaction's line items.
    #[serde(default)]
    pub header: bool,
}

fn default_true() -> bool {
    true
}

impl Screen {
    pub fn new(name: impl Into<String>) -> Screen {
        Screen {
            name: name.into(),
            fields: Vec::new(),
            entry_point: Vec::new(),
            press_confirm: true,
            header: false,
        }
    }

    pub fn field(mut self, name: impl Into<String>, element: GuiElement) -> Screen {
        self.fields.push(ScreenField {
            name: name.into(),
            element,
        });
        self
    }

    pub fn entry(mut self, action: Action) -> Screen {
        self.entry_point.push(action);
        self
    }

    pub fn no_confirm(mut self) -> Screen {
        self.press_confirm = false;
        self
    }

    pub fn header_data(mut self) -> Screen {
        self.header = true;
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&GuiElement> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.element)
    }
}

/// An element of the screen sequence for one transaction run: a screen
/// reference plus the post-fill actions to apply in this particular run.
/// Deserializes from a bare screen name, or from an object whose
/// `post_actions` is a single action or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ScreenOrderRepr")]
pub struct ScreenOrder {
    pub name: String,
    #[serde(default)]
    pub post_actions: Vec<Action>,
}

impl ScreenOrder {
    pub fn new(name: impl Into<String>) -> ScreenOrder {
        ScreenOrder {
            name: name.into(),
            post_actions: Vec::new(),
        }
    }

    pub fn then(mut self, action: Action) -> ScreenOrder {
        self.post_actions.push(action);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Vec<T> {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScreenOrderRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        post_actions: Option<OneOrMany<Action>>,
    },
}

impl From<ScreenOrderRepr> for ScreenOrder {
    fn from(repr: ScreenOrderRepr) -> ScreenOrder {
        match repr {
            ScreenOrderRepr::Name(name) => ScreenOrder {
                name,
                post_actions: Vec::new(),
            },
            ScreenOrderRepr::Full { name, post_actions } => ScreenOrder {
                name,
                post_actions: post_actions.map(Vec::from).unwrap_or_default(),
            },
        }
    }
}
