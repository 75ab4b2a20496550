use std::io::{self, Write};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    application::{
        handlers::message_dispatcher::DispatchEngine,
        services::{
            gateway::{ConnectionState, Gateway, GatewaySession},
            listener::EventListener,
            media::{ContentHasher, MediaFetcher, MediaResolver},
            notifier::{EventNotifier, ListenType},
        },
        usecases::{compose_message::MessageComposer, receive_messages::transform_messages},
    },
    config::Config,
    domain::{
        errors::{DispatchError, DispatchResult},
        events::{ON_CONNECT, ON_DISCONNECT},
        models::{DispatchRecord, InboundMessage},
    },
    infrastructure::{
        logging::daily_file::DailyLogFile,
        media::{hasher::Sha256Hasher, http::HttpMediaFetcher},
    },
};

/// Chat client owning the session, media resolver, notifier and engine.
pub struct Whatsapi {
    engine: DispatchEngine,
    media: Arc<MediaResolver>,
    notifier: Arc<EventNotifier>,
    listen_events: bool,
}

pub struct WhatsapiBuilder {
    config: Config,
    gateway: Arc<dyn Gateway>,
    listener: Option<Arc<dyn EventListener>>,
    fetcher: Option<Arc<dyn MediaFetcher>>,
    hasher: Option<Arc<dyn ContentHasher>>,
    screen: Option<Box<dyn Write + Send>>,
}

impl WhatsapiBuilder {
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn MediaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn screen(mut self, screen: Box<dyn Write + Send>) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn build(self) -> DispatchResult<Whatsapi> {
        let config = self.config;

        if config.listen_type == ListenType::Custom && self.listener.is_none() {
            return Err(DispatchError::CallbackNotInvocable(
                "listen-type is custom but no listener was registered".to_string(),
            ));
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => HttpMediaFetcher::new(config.http_timeout).map_err(io::Error::other)?,
        };
        let hasher = self.hasher.unwrap_or_else(Sha256Hasher::new);
        let media = Arc::new(MediaResolver::new(&config.media_path, fetcher, hasher));

        let has_listener = self.listener.is_some();
        let mut notifier = EventNotifier::new(config.listen_type, config.templates.clone())
            .with_output(config.output);
        if let Some(listener) = self.listener {
            notifier = notifier.with_listener(listener);
        }
        if config.listen_type.writes_file() {
            let dir = config.log_path.clone().ok_or_else(|| {
                DispatchError::LogPathUnavailable("log-path is not configured".to_string())
            })?;
            let log_file = DailyLogFile::new(dir);
            log_file.ensure_writable()?;
            notifier = notifier.with_log_file(log_file);
        }
        if let Some(screen) = self.screen {
            notifier = notifier.with_screen(screen);
        }
        let notifier = Arc::new(notifier);

        let session = GatewaySession::new(self.gateway, config.account.clone());
        let mut engine = DispatchEngine::new(session, media.clone(), config.broadcast_limit);
        // A registered listener hears send completions even with listen-events off.
        if config.listen_events || has_listener {
            engine = engine.with_notifier(notifier.clone());
        }

        Ok(Whatsapi {
            engine,
            media,
            notifier,
            listen_events: config.listen_events,
        })
    }
}

impl Whatsapi {
    pub fn builder(config: Config, gateway: Arc<dyn Gateway>) -> WhatsapiBuilder {
        WhatsapiBuilder {
            config,
            gateway,
            listener: None,
            fetcher: None,
            hasher: None,
            screen: None,
        }
    }

    pub fn composer(&self) -> MessageComposer {
        MessageComposer::new(self.media.clone())
    }

    pub fn media(&self) -> &MediaResolver {
        &self.media
    }

    /// Notifier for protocol events raised outside the dispatch loop.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    pub fn session(&mut self) -> &mut GatewaySession {
        self.engine.session()
    }

    /// Composes a batch seeded with `text` and sends it. Nothing is sent
    /// when composition fails.
    pub async fn send<F>(&mut self, text: &str, compose: F) -> DispatchResult<Vec<DispatchRecord>>
    where
        F: AsyncFnOnce(&mut MessageComposer) -> DispatchResult<()>,
    {
        let mut composer = self.composer();
        composer.add_text(text);
        compose(&mut composer).await?;
        self.dispatch(&mut composer).await
    }

    pub async fn dispatch(
        &mut self,
        composer: &mut MessageComposer,
    ) -> DispatchResult<Vec<DispatchRecord>> {
        self.connect().await?;
        self.engine.process_all(composer).await
    }

    /// Drains the session and returns newly received messages, if any.
    pub async fn new_messages(&mut self) -> DispatchResult<Option<Vec<InboundMessage>>> {
        self.connect().await?;
        let nodes = self.engine.session().receive().await?;
        transform_messages(&self.media, nodes).await
    }

    pub async fn connect(&mut self) -> DispatchResult<()> {
        let session = self.engine.session();
        if session.state() == ConnectionState::Connected {
            return Ok(());
        }
        session.connect().await?;
        self.fire_account_event(ON_CONNECT);
        Ok(())
    }

    pub async fn disconnect(&mut self) -> DispatchResult<()> {
        let session = self.engine.session();
        if session.state() == ConnectionState::Disconnected {
            return Ok(());
        }
        session.disconnect().await?;
        self.fire_account_event(ON_DISCONNECT);
        Ok(())
    }

    pub async fn online(&mut self) -> DispatchResult<()> {
        self.connect().await?;
        self.engine.session().online().await;
        Ok(())
    }

    pub async fn offline(&mut self) -> DispatchResult<()> {
        self.connect().await?;
        self.engine.session().offline().await;
        Ok(())
    }

    pub async fn sync_contacts(&mut self, contacts: &[String], delete: &[String]) -> DispatchResult<()> {
        self.connect().await?;
        self.engine.session().sync_contacts(contacts, delete).await
    }

    fn fire_account_event(&mut self, event: &str) {
        if !self.listen_events {
            return;
        }
        let number = self.engine.session().account().number.clone();
        let mut parameters = Map::new();
        parameters.insert("mynumber".to_string(), Value::String(number));
        if let Err(err) = self.notifier.fire(event, &parameters) {
            warn!(event, error = %err, "event not delivered");
        }
    }
}
