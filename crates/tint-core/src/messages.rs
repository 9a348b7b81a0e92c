//! Outbound wire messages.

use serde::{Deserialize, Serialize};

use crate::constants::COLOR_MESSAGE_TYPE;

/// `{"type":"color","data":"<color>"}`, sent on join and on every change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorUpdate {
    /// Always [`COLOR_MESSAGE_TYPE`].
    #[serde(rename = "type")]
    pub message_type: String,
    /// The current shared color.
    pub data: String,
}

impl ColorUpdate {
    /// Build an update carrying `color`.
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            message_type: COLOR_MESSAGE_TYPE.to_owned(),
            data: color.into(),
        }
    }

    /// Serialize to the JSON text frame payload.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
