//! Screen-fill automation for ERP GUI scripting surfaces
//!
//! This crate drives multi-screen data-entry transactions inside a legacy
//! ERP client from a declarative screen map: screens are plain data, the
//! fill engine interprets them against a [`GuiSession`] capability handle,
//! and retry policies absorb the transient failures such clients produce.
//! The session itself (connection, login protocol, COM plumbing) is an
//! external collaborator behind the trait.

pub mod errors;
pub mod fill;
pub mod registry;
pub mod retry;
pub mod screen;
pub mod session;

pub use errors::EngineError;
pub use fill::{fill_screen, run_post_actions, ScreenData};
pub use registry::ScreenRegistry;
pub use retry::RetryPolicy;
pub use screen::{
    Action, ActionType, AttachmentSpec, CallFunction, ElementType, GuiElement, Screen,
    ScreenField, ScreenOrder, SetAttribute,
};
pub use session::{record_text, value_is_empty, GuiSession, Record, StatusBar, StatusLevel, VKey};
