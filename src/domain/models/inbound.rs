use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A protocol node as surfaced by the Gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub children: Vec<ProtocolNode>,
}

impl ProtocolNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_child(mut self, child: ProtocolNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn child(&self, index: usize) -> Option<&ProtocolNode> {
        self.children.get(index)
    }
}

/// Raw inbound message node returned by `Gateway::get_messages`.
pub type InboundNode = ProtocolNode;

/// First child of an inbound message, enriched with linked media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageBody {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vcard: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub attributes: BTreeMap<String, String>,
    pub timestamp: Option<String>,
    pub body: Option<MessageBody>,
}

impl InboundMessage {
    pub fn message_type(&self) -> Option<&str> {
        self.attributes.get("type").map(String::as_str)
    }
}
