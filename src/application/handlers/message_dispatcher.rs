use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    application::{
        services::{gateway::GatewaySession, media::MediaResolver, notifier::EventNotifier},
        usecases::compose_message::MessageComposer,
    },
    domain::{
        errors::{DispatchError, DispatchResult},
        events::ON_SEND_COMPLETED,
        models::{DispatchRecord, PendingMessage, RecipientGroup},
    },
};

/// Recipient counts up to this size are sent directly, never broadcast.
pub const DIRECT_SEND_THRESHOLD: usize = 10;

pub const DEFAULT_BROADCAST_LIMIT: usize = 20;

/// Splits recipients into send groups. Returns the groups and whether
/// broadcast operations must be used for them.
pub fn split_receivers(recipients: &[String], broadcast_limit: usize) -> (Vec<RecipientGroup>, bool) {
    if recipients.len() <= DIRECT_SEND_THRESHOLD {
        return (vec![RecipientGroup(recipients.to_vec())], false);
    }

    let groups = recipients
        .chunks(broadcast_limit.max(1))
        .map(|chunk| RecipientGroup(chunk.to_vec()))
        .collect();
    (groups, true)
}

/// Drives one composed batch through the Gateway, one message to one
/// recipient group at a time.
pub struct DispatchEngine {
    session: GatewaySession,
    media: Arc<MediaResolver>,
    notifier: Option<Arc<EventNotifier>>,
    broadcast_limit: usize,
    broadcast: bool,
}

impl DispatchEngine {
    pub fn new(session: GatewaySession, media: Arc<MediaResolver>, broadcast_limit: usize) -> Self {
        Self {
            session,
            media,
            notifier: None,
            broadcast_limit,
            broadcast: false,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<EventNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn session(&mut self) -> &mut GatewaySession {
        &mut self.session
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }

    pub fn receivers(&mut self, recipients: &[String]) -> Vec<RecipientGroup> {
        let (groups, broadcast) = split_receivers(recipients, self.broadcast_limit);
        self.broadcast = broadcast;
        groups
    }

    /// Sends every queued message to every recipient group. Media hashes are
    /// cached back onto the composer so a re-send does not hash again.
    pub async fn process_all(
        &mut self,
        composer: &mut MessageComposer,
    ) -> DispatchResult<Vec<DispatchRecord>> {
        if composer.recipients().is_empty() {
            return Err(DispatchError::InvalidTarget);
        }

        let groups = self.receivers(composer.recipients());
        let result = self.process_groups(&groups, composer).await;
        self.broadcast = false;

        if let Ok(records) = &result {
            info!(
                groups = groups.len(),
                records = records.len(),
                "dispatch finished"
            );
        }
        result
    }

    async fn process_groups(
        &mut self,
        groups: &[RecipientGroup],
        composer: &mut MessageComposer,
    ) -> DispatchResult<Vec<DispatchRecord>> {
        let injected = composer.injected().clone();
        let mut processed = Vec::new();

        for group in groups {
            for message in composer.messages_mut() {
                self.session.presence(group.members()).await?;
                self.composition(group, message).await?;

                let id = {
                    let call = message.send_call(self.broadcast);
                    self.session.execute(group.members(), &call).await?
                };

                if let Some(media) = message.media_mut()
                    && media.hash.is_none()
                {
                    media.hash = Some(self.media.hash(&media.descriptor).await?);
                }

                let account = self.session.account();
                let mut record = DispatchRecord {
                    id,
                    kind: message.kind(),
                    sender: account.number.clone(),
                    nickname: account.nickname.clone(),
                    to: group.display(),
                    message: message.clone(),
                    injected: injected.clone(),
                    raw: String::new(),
                };
                let mut parameters = record.to_parameters()?;
                record.raw = Value::Object(parameters.clone()).to_string();

                if let Some(notifier) = &self.notifier {
                    parameters.insert("raw".to_string(), Value::String(record.raw.clone()));
                    if let Err(err) = notifier.fire(ON_SEND_COMPLETED, &parameters) {
                        warn!(error = %err, "send completion event not delivered");
                    }
                }

                processed.push(record);
            }
        }

        Ok(processed)
    }

    /// Typing simulation around a direct send; skipped in broadcast mode.
    async fn composition(
        &mut self,
        group: &RecipientGroup,
        message: &PendingMessage,
    ) -> DispatchResult<()> {
        if self.broadcast {
            return Ok(());
        }

        self.session.typing(group.members()).await?;
        tokio::time::sleep(message.composition()).await;
        self.session.paused(group.members()).await?;
        Ok(())
    }
}
