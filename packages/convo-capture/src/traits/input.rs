//! Input surface: where composed content gets written on a provider page.

use serde::{Deserialize, Serialize};

use crate::error::FillError;

/// Kind of control an input handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    TextArea,
    TextInput,
    ContentEditable,
    Other,
}

/// A located input control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputHandle {
    /// Surface-specific element identity
    pub ordinal: usize,

    /// Locator that matched
    pub selector: String,

    pub kind: InputKind,
}

/// Notification dispatched after content is written, so the host page's
/// own change detection observes the new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputEventKind,
    pub ordinal: usize,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputEventKind {
    BeforeInput,
    Input,
    Change,
}

impl InputEventKind {
    /// Notifications dispatched for every write, in order.
    pub const SEQUENCE: [InputEventKind; 3] = [
        InputEventKind::BeforeInput,
        InputEventKind::Input,
        InputEventKind::Change,
    ];
}

/// A page that accepts composed content.
pub trait InputSurface {
    /// First visible, enabled control matching the locators, tried in order.
    fn locate(&self, selectors: &[String]) -> Option<InputHandle>;

    /// Replace the control's content and notify the host.
    fn write(&mut self, handle: &InputHandle, content: &str) -> Result<(), FillError>;
}
