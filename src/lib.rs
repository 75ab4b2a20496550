pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{
    handlers::message_dispatcher::{DispatchEngine, split_receivers},
    services::{
        gateway::{ConnectionState, Gateway, GatewaySession},
        listener::EventListener,
        media::{ContentHasher, MediaFetcher, MediaProbe, MediaResolver},
        notifier::{EventNotifier, ListenType, OutputContext},
    },
    usecases::{
        compose_message::MessageComposer,
        send_messages::{Whatsapi, WhatsapiBuilder},
    },
};
pub use config::Config;
pub use domain::errors::{DispatchError, DispatchResult};
