use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::contact::ContactCard;
use super::media::{MediaDescriptor, MediaKind};

/// Seconds of simulated typing per byte of text.
const TYPING_SECONDS_PER_BYTE: f64 = 0.12366667;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Location,
    Contact,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
            MessageKind::Location => "location",
            MessageKind::Contact => "contact",
        }
    }
}

impl From<MediaKind> for MessageKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => MessageKind::Image,
            MediaKind::Audio => MessageKind::Audio,
            MediaKind::Video => MessageKind::Video,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaMessage {
    pub source_ref: String,
    #[serde(flatten)]
    pub descriptor: MediaDescriptor,
    pub caption: Option<String>,
    /// Base64 SHA-256 of the file, filled in on first send.
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationMessage {
    pub longitude: f64,
    pub latitude: f64,
    pub caption: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactMessage {
    pub display_name: String,
    pub card: ContactCard,
}

/// A message queued for one dispatch call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingMessage {
    Text { body: String },
    Image(MediaMessage),
    Audio(MediaMessage),
    Video(MediaMessage),
    Location(LocationMessage),
    Contact(ContactMessage),
}

/// The concrete Gateway operation selected for a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SendCall<'a> {
    Message { body: &'a str },
    BroadcastMessage { body: &'a str },
    MessageImage(&'a MediaMessage),
    BroadcastImage(&'a MediaMessage),
    MessageAudio(&'a MediaMessage),
    BroadcastAudio(&'a MediaMessage),
    MessageVideo(&'a MediaMessage),
    BroadcastVideo(&'a MediaMessage),
    MessageLocation(&'a LocationMessage),
    BroadcastLocation(&'a LocationMessage),
    Vcard { name: &'a str, card: String },
    BroadcastVcard { name: &'a str, card: String },
}

impl SendCall<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SendCall::Message { .. } => "send-message",
            SendCall::BroadcastMessage { .. } => "send-broadcast-message",
            SendCall::MessageImage(_) => "send-message-image",
            SendCall::BroadcastImage(_) => "send-broadcast-image",
            SendCall::MessageAudio(_) => "send-message-audio",
            SendCall::BroadcastAudio(_) => "send-broadcast-audio",
            SendCall::MessageVideo(_) => "send-message-video",
            SendCall::BroadcastVideo(_) => "send-broadcast-video",
            SendCall::MessageLocation(_) => "send-message-location",
            SendCall::BroadcastLocation(_) => "send-broadcast-location",
            SendCall::Vcard { .. } => "send-vcard",
            SendCall::BroadcastVcard { .. } => "send-broadcast-vcard",
        }
    }
}

impl PendingMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            PendingMessage::Text { .. } => MessageKind::Text,
            PendingMessage::Image(_) => MessageKind::Image,
            PendingMessage::Audio(_) => MessageKind::Audio,
            PendingMessage::Video(_) => MessageKind::Video,
            PendingMessage::Location(_) => MessageKind::Location,
            PendingMessage::Contact(_) => MessageKind::Contact,
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            PendingMessage::Image(media)
            | PendingMessage::Audio(media)
            | PendingMessage::Video(media) => media.caption.as_deref(),
            PendingMessage::Location(location) => location.caption.as_deref(),
            PendingMessage::Text { .. } | PendingMessage::Contact(_) => None,
        }
    }

    pub fn media(&self) -> Option<&MediaMessage> {
        match self {
            PendingMessage::Image(media)
            | PendingMessage::Audio(media)
            | PendingMessage::Video(media) => Some(media),
            _ => None,
        }
    }

    pub fn media_mut(&mut self) -> Option<&mut MediaMessage> {
        match self {
            PendingMessage::Image(media)
            | PendingMessage::Audio(media)
            | PendingMessage::Video(media) => Some(media),
            _ => None,
        }
    }

    /// Simulated typing time spent between the composing and paused signals.
    pub fn composition(&self) -> Duration {
        match self {
            PendingMessage::Text { body } => {
                let seconds = (body.len() as f64 * TYPING_SECONDS_PER_BYTE).floor();
                Duration::from_secs(seconds as u64)
            }
            _ => Duration::from_secs(1),
        }
    }

    /// Maps the message onto its direct or broadcast Gateway operation.
    pub fn send_call(&self, broadcast: bool) -> SendCall<'_> {
        match (self, broadcast) {
            (PendingMessage::Text { body }, false) => SendCall::Message { body },
            (PendingMessage::Text { body }, true) => SendCall::BroadcastMessage { body },
            (PendingMessage::Image(media), false) => SendCall::MessageImage(media),
            (PendingMessage::Image(media), true) => SendCall::BroadcastImage(media),
            (PendingMessage::Audio(media), false) => SendCall::MessageAudio(media),
            (PendingMessage::Audio(media), true) => SendCall::BroadcastAudio(media),
            (PendingMessage::Video(media), false) => SendCall::MessageVideo(media),
            (PendingMessage::Video(media), true) => SendCall::BroadcastVideo(media),
            (PendingMessage::Location(location), false) => SendCall::MessageLocation(location),
            (PendingMessage::Location(location), true) => SendCall::BroadcastLocation(location),
            (PendingMessage::Contact(contact), false) => SendCall::Vcard {
                name: &contact.display_name,
                card: contact.card.render(),
            },
            (PendingMessage::Contact(contact), true) => SendCall::BroadcastVcard {
                name: &contact.display_name,
                card: contact.card.render(),
            },
        }
    }
}
