use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{
    errors::{DispatchError, DispatchResult},
    models::{Account, InboundNode, LocationMessage, MediaMessage, SendCall},
};

/// Chat-protocol session performing the actual network sends and receives.
///
/// Send operations return the protocol message identifier, when the session
/// produced one.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn connect(&self) -> anyhow::Result<()>;
    async fn login_with_password(&self, password: &str) -> anyhow::Result<()>;
    async fn send_get_server_properties(&self) -> anyhow::Result<()>;
    async fn disconnect(&self) -> anyhow::Result<()>;

    async fn send_message(&self, to: &[String], body: &str) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_message(
        &self,
        to: &[String],
        body: &str,
    ) -> anyhow::Result<Option<String>>;
    async fn send_message_image(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_image(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_message_audio(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_audio(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_message_video(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_video(
        &self,
        to: &[String],
        media: &MediaMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_message_location(
        &self,
        to: &[String],
        location: &LocationMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_location(
        &self,
        to: &[String],
        location: &LocationMessage,
    ) -> anyhow::Result<Option<String>>;
    async fn send_vcard(
        &self,
        to: &[String],
        name: &str,
        card: &str,
    ) -> anyhow::Result<Option<String>>;
    async fn send_broadcast_vcard(
        &self,
        to: &[String],
        name: &str,
        card: &str,
    ) -> anyhow::Result<Option<String>>;

    async fn send_presence_subscription(&self, target: &str) -> anyhow::Result<()>;
    async fn send_message_composing(&self, to: &[String]) -> anyhow::Result<()>;
    async fn send_message_paused(&self, to: &[String]) -> anyhow::Result<()>;
    async fn send_presence(&self, state: &str) -> anyhow::Result<()>;
    async fn send_sync(&self, contacts: &[String], delete: &[String]) -> anyhow::Result<()>;

    /// Drains one pending inbound event; `false` once nothing is left.
    async fn poll_message(&self) -> anyhow::Result<bool>;
    async fn get_messages(&self) -> anyhow::Result<Vec<InboundNode>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Owns the Gateway handle together with its connection state.
pub struct GatewaySession {
    gateway: Arc<dyn Gateway>,
    account: Account,
    state: ConnectionState,
}

impl GatewaySession {
    pub fn new(gateway: Arc<dyn Gateway>, account: Account) -> Self {
        Self {
            gateway,
            account,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub async fn connect(&mut self) -> DispatchResult<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        let gateway = &self.gateway;
        gateway.connect().await.map_err(DispatchError::Gateway)?;
        gateway
            .login_with_password(&self.account.password)
            .await
            .map_err(DispatchError::Gateway)?;
        gateway
            .send_get_server_properties()
            .await
            .map_err(DispatchError::Gateway)?;
        self.state = ConnectionState::Connected;
        info!(number = %self.account.number, "connected to chat gateway");

        self.online().await;
        Ok(())
    }

    pub async fn disconnect(&mut self) -> DispatchResult<()> {
        if self.state == ConnectionState::Disconnected {
            return Ok(());
        }

        self.offline().await;
        self.state = ConnectionState::Disconnected;
        self.gateway
            .disconnect()
            .await
            .map_err(DispatchError::Gateway)?;
        info!(number = %self.account.number, "disconnected from chat gateway");
        Ok(())
    }

    /// Connects on first use and hands out the live Gateway.
    pub async fn gateway(&mut self) -> DispatchResult<&Arc<dyn Gateway>> {
        self.connect().await?;
        Ok(&self.gateway)
    }

    pub async fn online(&self) {
        if let Err(err) = self.gateway.send_presence("active").await {
            warn!(error = %err, "failed to announce active presence");
        }
    }

    pub async fn offline(&self) {
        if let Err(err) = self.gateway.send_presence("inactive").await {
            warn!(error = %err, "failed to announce inactive presence");
        }
    }

    /// Subscribes to presence of every target. Failures are logged, never raised.
    pub async fn presence(&mut self, targets: &[String]) -> DispatchResult<()> {
        let gateway = self.gateway().await?;
        for target in targets {
            if let Err(err) = gateway.send_presence_subscription(target).await {
                warn!(target = %target, error = %err, "presence subscription failed");
            }
        }
        Ok(())
    }

    pub async fn typing(&mut self, to: &[String]) -> DispatchResult<()> {
        let gateway = self.gateway().await?;
        if let Err(err) = gateway.send_message_composing(to).await {
            warn!(error = %err, "composing signal failed");
        }
        Ok(())
    }

    pub async fn paused(&mut self, to: &[String]) -> DispatchResult<()> {
        let gateway = self.gateway().await?;
        if let Err(err) = gateway.send_message_paused(to).await {
            warn!(error = %err, "paused signal failed");
        }
        Ok(())
    }

    pub async fn sync_contacts(&mut self, contacts: &[String], delete: &[String]) -> DispatchResult<()> {
        let gateway = self.gateway().await?;
        gateway
            .send_sync(contacts, delete)
            .await
            .map_err(DispatchError::Gateway)
    }

    /// Performs a send call followed by one poll to drain its acknowledgement.
    pub async fn execute(&mut self, to: &[String], call: &SendCall<'_>) -> DispatchResult<Option<String>> {
        let gateway = self.gateway().await?;
        debug!(operation = call.name(), recipients = to.len(), "sending");

        let id = match call {
            SendCall::Message { body } => gateway.send_message(to, body).await,
            SendCall::BroadcastMessage { body } => gateway.send_broadcast_message(to, body).await,
            SendCall::MessageImage(media) => gateway.send_message_image(to, media).await,
            SendCall::BroadcastImage(media) => gateway.send_broadcast_image(to, media).await,
            SendCall::MessageAudio(media) => gateway.send_message_audio(to, media).await,
            SendCall::BroadcastAudio(media) => gateway.send_broadcast_audio(to, media).await,
            SendCall::MessageVideo(media) => gateway.send_message_video(to, media).await,
            SendCall::BroadcastVideo(media) => gateway.send_broadcast_video(to, media).await,
            SendCall::MessageLocation(location) => gateway.send_message_location(to, location).await,
            SendCall::BroadcastLocation(location) => {
                gateway.send_broadcast_location(to, location).await
            }
            SendCall::Vcard { name, card } => gateway.send_vcard(to, name, card).await,
            SendCall::BroadcastVcard { name, card } => {
                gateway.send_broadcast_vcard(to, name, card).await
            }
        }
        .map_err(DispatchError::Gateway)?;

        if let Err(err) = gateway.poll_message().await {
            warn!(error = %err, "poll after send failed");
        }

        Ok(id)
    }

    /// Drains pending inbound events and returns the newly received nodes.
    pub async fn receive(&mut self) -> DispatchResult<Vec<InboundNode>> {
        let gateway = self.gateway().await?;
        while gateway.poll_message().await.map_err(DispatchError::Gateway)? {}
        gateway.get_messages().await.map_err(DispatchError::Gateway)
    }
}
