use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::{
    application::services::gateway::Gateway,
    domain::models::{InboundNode, LocationMessage, MediaMessage},
};

/// Gateway that performs no network I/O and logs every call instead.
pub struct DryRunGateway {
    number: String,
    sequence: AtomicU64,
}

impl DryRunGateway {
    pub fn new(number: impl Into<String>) -> Arc<dyn Gateway> {
        Arc::new(Self {
            number: number.into(),
            sequence: AtomicU64::new(0),
        }) as Arc<dyn Gateway>
    }

    fn next_id(&self) -> Option<String> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Some(format!("{}-{}", Utc::now().timestamp(), sequence))
    }

    fn sent(&self, operation: &str, to: &[String], summary: &str) -> anyhow::Result<Option<String>> {
        let id = self.next_id();
        info!(
            "[dry-run] {} {} '{}' to {} as {:?}",
            self.number,
            operation,
            summary,
            to.join(", "),
            id
        );
        Ok(id)
    }
}

fn media_summary(media: &MediaMessage) -> String {
    format!(
        "{} ({} bytes)",
        media.descriptor.file.display(),
        media.descriptor.filesize
    )
}

fn location_summary(location: &LocationMessage) -> String {
    format!("{},{}", location.latitude, location.longitude)
}

#[async_trait]
impl Gateway for DryRunGateway {
    async fn connect(&self) -> anyhow::Result<()> {
        info!("[dry-run] {} connect", self.number);
        Ok(())
    }

    async fn login_with_password(&self, _password: &str) -> anyhow::Result<()> {
        info!("[dry-run] {} login", self.number);
        Ok(())
    }

    async fn send_get_server_properties(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        info!("[dry-run] {} disconnect", self.number);
        Ok(())
    }

    async fn send_message(&self, to: &[String], body: &str) -> anyhow::Result<Option<String>> {
        self.sent("send-message", to, body)
    }

    async fn send_broadcast_message(
        &self,
        to: &[String],
        body: &str,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-message", to, body)
    }

    async fn send_message_image(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-message-image", to, &media_summary(media))
    }

    async fn send_broadcast_image(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-image", to, &media_summary(media))
    }

    async fn send_message_audio(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-message-audio", to, &media_summary(media))
    }

    async fn send_broadcast_audio(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-audio", to, &media_summary(media))
    }

    async fn send_message_video(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-message-video", to, &media_summary(media))
    }

    async fn send_broadcast_video(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-video", to, &media_summary(media))
    }

    async fn send_message_location(
        &self,
        to: &[String],
        location: &LocationMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-message-location", to, &location_summary(location))
    }

    async fn send_broadcast_location(
        &self,
        to: &[String],
        location: &LocationMessage,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-location", to, &location_summary(location))
    }

    async fn send_vcard(
        &self,
        to: &[String],
        name: &str,
        _card: &str,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-vcard", to, name)
    }

    async fn send_broadcast_vcard(
        &self,
        to: &[String],
        name: &str,
        _card: &str,
    ) -> anyhow::Result<Option<String>> {
        self.sent("send-broadcast-vcard", to, name)
    }

    async fn send_presence_subscription(&self, target: &str) -> anyhow::Result<()> {
        info!("[dry-run] {} subscribe to presence of {}", self.number, target);
        Ok(())
    }

    async fn send_message_composing(&self, to: &[String]) -> anyhow::Result<()> {
        info!("[dry-run] {} composing to {}", self.number, to.join(", "));
        Ok(())
    }

    async fn send_message_paused(&self, to: &[String]) -> anyhow::Result<()> {
        info!("[dry-run] {} paused to {}", self.number, to.join(", "));
        Ok(())
    }

    async fn send_presence(&self, state: &str) -> anyhow::Result<()> {
        info!("[dry-run] {} presence {}", self.number, state);
        Ok(())
    }

    async fn send_sync(&self, contacts: &[String], delete: &[String]) -> anyhow::Result<()> {
        info!(
            "[dry-run] {} sync {} contacts, delete {}",
            self.number,
            contacts.len(),
            delete.len()
        );
        Ok(())
    }

    async fn poll_message(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn get_messages(&self) -> anyhow::Result<Vec<InboundNode>> {
        Ok(Vec::new())
    }
}
