//! Declarative cell nodes handed to the external UI runtime.

use serde::Serialize;

/// Trailing margins stamped on a grid cell. The last column gets no right
/// margin and the last row no bottom margin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CellMargins {
    pub right: f32,
    pub bottom: f32,
}

/// One rendered grid cell. The external runtime owns layout and styling;
/// this carries only the content plus the cell geometry the virtualizer
/// is responsible for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub key: String,
    pub icon: String,
    pub title: String,
    pub label: String,
    pub badge: Option<String>,
    pub interactable: bool,
    pub spinner: bool,
    pub width: f32,
    pub height: f32,
    pub margins: CellMargins,
}

/// Serialize a binding payload for the reactive value store, which
/// transports JSON documents.
pub fn to_binding_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

impl Node {
    /// Content-only node. Cell size and margins are stamped by the
    /// virtualizer when the node is rendered into a grid slot.
    pub fn content(
        key: impl Into<String>,
        icon: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            icon: icon.into(),
            title: title.into(),
            label: String::new(),
            badge: None,
            interactable: false,
            spinner: false,
            width: 0.0,
            height: 0.0,
            margins: CellMargins::default(),
        }
    }
}
