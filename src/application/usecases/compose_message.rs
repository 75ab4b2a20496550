use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    application::services::media::MediaResolver,
    domain::{
        errors::{DispatchError, DispatchResult},
        models::{
            ContactCard, ContactMessage, LocationMessage, MediaKind, PendingMessage, Target,
        },
    },
};

/// Collects the messages, recipients and injected fields of one send.
pub struct MessageComposer {
    media: Arc<MediaResolver>,
    messages: Vec<PendingMessage>,
    recipients: Vec<String>,
    injected: Map<String, Value>,
}

impl MessageComposer {
    pub fn new(media: Arc<MediaResolver>) -> Self {
        Self {
            media,
            messages: Vec::new(),
            recipients: Vec::new(),
            injected: Map::new(),
        }
    }

    pub fn messages(&self) -> &[PendingMessage] {
        &self.messages
    }

    pub(crate) fn messages_mut(&mut self) -> &mut [PendingMessage] {
        &mut self.messages
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn injected(&self) -> &Map<String, Value> {
        &self.injected
    }

    /// Queues a text message; blank bodies are skipped.
    pub fn add_text(&mut self, body: impl Into<String>) -> &mut Self {
        let body = body.into();
        if !body.trim().is_empty() {
            self.messages.push(PendingMessage::Text { body });
        }
        self
    }

    pub async fn add_image(&mut self, source: &str, caption: Option<&str>) -> DispatchResult<&mut Self> {
        self.add_media(source, MediaKind::Image, caption).await
    }

    pub async fn add_audio(&mut self, source: &str, caption: Option<&str>) -> DispatchResult<&mut Self> {
        self.add_media(source, MediaKind::Audio, caption).await
    }

    pub async fn add_video(&mut self, source: &str, caption: Option<&str>) -> DispatchResult<&mut Self> {
        self.add_media(source, MediaKind::Video, caption).await
    }

    async fn add_media(
        &mut self,
        source: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> DispatchResult<&mut Self> {
        let message = self
            .media
            .compile(source, kind, caption.map(str::to_string))
            .await?;
        self.messages.push(message);
        Ok(self)
    }

    /// Coordinates are passed through unchecked.
    pub fn add_location(
        &mut self,
        longitude: f64,
        latitude: f64,
        caption: Option<&str>,
        url: Option<&str>,
    ) -> &mut Self {
        self.messages.push(PendingMessage::Location(LocationMessage {
            longitude,
            latitude,
            caption: caption.map(str::to_string),
            url: url.map(str::to_string),
        }));
        self
    }

    pub fn add_contact(&mut self, display_name: impl Into<String>, card: ContactCard) -> &mut Self {
        self.messages.push(PendingMessage::Contact(ContactMessage {
            display_name: display_name.into(),
            card,
        }));
        self
    }

    /// Appends the flattened targets. Nothing is kept when they flatten to
    /// an empty set.
    pub fn set_recipients(&mut self, targets: impl Into<Target>) -> DispatchResult<&mut Self> {
        let flattened = targets.into().flatten();
        if flattened.is_empty() {
            return Err(DispatchError::InvalidTarget);
        }
        self.recipients.extend(flattened);
        Ok(self)
    }

    pub fn inject_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.injected.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;
    use crate::{
        domain::models::MessageKind,
        infrastructure::media::{hasher::Sha256Hasher, http::HttpMediaFetcher},
    };

    fn composer(storage: &Path) -> MessageComposer {
        let fetcher = HttpMediaFetcher::new(std::time::Duration::from_secs(1)).unwrap();
        MessageComposer::new(Arc::new(MediaResolver::new(
            storage,
            fetcher,
            Sha256Hasher::new(),
        )))
    }

    #[test]
    fn blank_text_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());

        composer.add_text("   ").add_text("").add_text("hi");

        assert_eq!(
            composer.messages(),
            &[PendingMessage::Text {
                body: "hi".to_string()
            }]
        );
    }

    #[test]
    fn empty_recipients_fail_and_keep_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());

        let result = composer.set_recipients(Vec::<String>::new());
        assert!(matches!(result, Err(DispatchError::InvalidTarget)));

        let nested_empty = Target::Many(vec![Target::Many(vec![])]);
        assert!(matches!(
            composer.set_recipients(nested_empty),
            Err(DispatchError::InvalidTarget)
        ));
        assert!(composer.recipients().is_empty());
    }

    #[test]
    fn recipients_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());

        composer.set_recipients("5219511552222").unwrap();
        composer
            .set_recipients(Target::Many(vec![
                "5219511553333".into(),
                Target::from(vec!["5219511554444", "5219511555555"]),
            ]))
            .unwrap();

        assert_eq!(
            composer.recipients(),
            &["5219511552222", "5219511553333", "5219511554444", "5219511555555"]
        );
    }

    #[test]
    fn location_and_contact_are_always_queued() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());

        composer
            .add_location(-500.0, 91.0, Some("Nowhere"), None)
            .add_contact("John Doe", ContactCard::new("John").with_phone("9611111111"))
            .inject_field("campaign", json!({"id": 7}));

        assert_eq!(composer.messages().len(), 2);
        assert_eq!(composer.messages()[0].caption(), Some("Nowhere"));
        assert_eq!(composer.injected()["campaign"], json!({"id": 7}));
    }

    #[tokio::test]
    async fn audio_keeps_its_caption() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());
        let audio = dir.path().join("note.mp3");
        std::fs::write(&audio, b"ID3").unwrap();

        composer
            .add_audio(&audio.display().to_string(), Some("voice note"))
            .await
            .unwrap();

        assert_eq!(composer.messages().len(), 1);
        assert_eq!(composer.messages()[0].kind(), MessageKind::Audio);
        assert_eq!(composer.messages()[0].caption(), Some("voice note"));
    }

    #[tokio::test]
    async fn media_errors_propagate_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut composer = composer(dir.path());
        let missing = dir.path().join("missing.jpg").display().to_string();

        let result = composer.add_image(&missing, Some("caption")).await;

        assert!(matches!(result, Err(DispatchError::SourceNotFound(_))));
        assert!(composer.messages().is_empty());
    }
}
