use serde::Serialize;
use serde_json::{Map, Value};

use super::message::{MessageKind, PendingMessage};

/// Result of sending one message to one recipient group.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchRecord {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub sender: String,
    pub nickname: String,
    pub to: String,
    pub message: PendingMessage,
    #[serde(flatten)]
    pub injected: Map<String, Value>,
    /// JSON of every other field, as handed to the completion listener.
    #[serde(skip)]
    pub raw: String,
}

impl DispatchRecord {
    /// Record fields as a flat JSON object, injected values merged at the top level.
    pub fn to_parameters(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}
