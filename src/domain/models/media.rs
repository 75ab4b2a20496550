use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DispatchError;

const MIB: u64 = 1024 * 1024;

/// Outbound media kinds that can be resolved into a [`MediaDescriptor`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    /// Exclusive upper bound on the media size, in bytes.
    pub fn size_limit(&self) -> u64 {
        match self {
            MediaKind::Image => 5 * MIB,
            MediaKind::Audio => 10 * MIB,
            MediaKind::Video => 20 * MIB,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = DispatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "image" => Ok(MediaKind::Image),
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            other => Err(DispatchError::UnsupportedMediaKind(other.to_string())),
        }
    }
}

/// Validated, size-checked metadata about a media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub file: PathBuf,
    pub filesize: u64,
    pub mime_type: Option<String>,
    pub file_extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Media types that can arrive on inbound nodes and be linked to local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundMediaType {
    Audio,
    Image,
    Location,
    Video,
}

impl InboundMediaType {
    /// Storage subdirectory for the materialized bytes.
    pub fn folder(&self) -> &'static str {
        match self {
            InboundMediaType::Audio => "audios",
            InboundMediaType::Image | InboundMediaType::Location => "pictures",
            InboundMediaType::Video => "videos",
        }
    }
}

impl FromStr for InboundMediaType {
    type Err = DispatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "audio" => Ok(InboundMediaType::Audio),
            "image" => Ok(InboundMediaType::Image),
            "location" => Ok(InboundMediaType::Location),
            "video" => Ok(InboundMediaType::Video),
            other => Err(DispatchError::UnsupportedMediaKind(other.to_string())),
        }
    }
}

/// Inline-renderable reference to inbound media written to local storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkedMedia {
    pub file: PathBuf,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_follow_kind_policy() {
        assert_eq!(MediaKind::Image.size_limit(), 5 * 1024 * 1024);
        assert_eq!(MediaKind::Audio.size_limit(), 10 * 1024 * 1024);
        assert_eq!(MediaKind::Video.size_limit(), 20 * 1024 * 1024);
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        assert!(matches!(
            "document".parse::<MediaKind>(),
            Err(DispatchError::UnsupportedMediaKind(kind)) if kind == "document"
        ));
        assert!(matches!(
            "vcard".parse::<InboundMediaType>(),
            Err(DispatchError::UnsupportedMediaKind(_))
        ));
        assert_eq!("location".parse::<InboundMediaType>().ok(), Some(InboundMediaType::Location));
    }
}
