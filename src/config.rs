use std::collections::HashMap;
use std::env::var;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::{
    application::{
        handlers::message_dispatcher::DEFAULT_BROADCAST_LIMIT,
        services::notifier::{ListenType, OutputContext},
    },
    domain::models::Account,
};

const DEFAULT_MEDIA_PATH: &str = "media";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("An error occured while getting {0} env param")]
    Missing(&'static str),
    #[error("An error occured while parsing {name} env param: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub broadcast_limit: usize,
    pub listen_events: bool,
    pub listen_type: ListenType,
    pub log_path: Option<PathBuf>,
    pub media_path: PathBuf,
    pub output: OutputContext,
    pub http_timeout: Duration,
    pub account: Account,
    pub templates: HashMap<String, String>,
}

impl Config {
    pub fn new(account: Account) -> Self {
        Self {
            broadcast_limit: DEFAULT_BROADCAST_LIMIT,
            listen_events: true,
            listen_type: ListenType::default(),
            log_path: None,
            media_path: PathBuf::from(DEFAULT_MEDIA_PATH),
            output: OutputContext::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            account,
            templates: default_templates(),
        }
    }

    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();

        let account = Account {
            nickname: var("WHATSAPI_NICKNAME").unwrap_or_default(),
            number: var("WHATSAPI_NUMBER").map_err(|_| ConfigError::Missing("WHATSAPI_NUMBER"))?,
            password: var("WHATSAPI_PASSWORD")
                .map_err(|_| ConfigError::Missing("WHATSAPI_PASSWORD"))?,
        };
        let mut config = Config::new(account);

        if let Some(limit) = optional("WHATSAPI_BROADCAST_LIMIT") {
            config.broadcast_limit = match limit.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(invalid("WHATSAPI_BROADCAST_LIMIT", "expected a positive integer")),
            };
        }
        if let Some(flag) = optional("WHATSAPI_LISTEN_EVENTS") {
            config.listen_events = parse_flag(&flag)
                .ok_or_else(|| invalid("WHATSAPI_LISTEN_EVENTS", "expected true or false"))?;
        }
        if let Some(listen_type) = optional("WHATSAPI_LISTEN_TYPE") {
            config.listen_type = listen_type
                .parse()
                .map_err(|reason: String| invalid("WHATSAPI_LISTEN_TYPE", &reason))?;
        }
        if let Some(output) = optional("WHATSAPI_OUTPUT") {
            config.output = output
                .parse()
                .map_err(|reason: String| invalid("WHATSAPI_OUTPUT", &reason))?;
        }
        if let Some(timeout) = optional("WHATSAPI_HTTP_TIMEOUT_SECS") {
            let secs = timeout
                .parse::<u64>()
                .map_err(|err| invalid("WHATSAPI_HTTP_TIMEOUT_SECS", &err.to_string()))?;
            config.http_timeout = Duration::from_secs(secs);
        }
        config.log_path = optional("WHATSAPI_LOG_PATH").map(PathBuf::from);
        if let Some(media_path) =
            optional("WHATSAPI_MEDIA_PATH").or_else(|| optional("WHATSAPI_DATA_STORAGE"))
        {
            config.media_path = PathBuf::from(media_path);
        }

        if config.listen_type.writes_file() && config.log_path.is_none() {
            return Err(ConfigError::Missing("WHATSAPI_LOG_PATH"));
        }

        Ok(config)
    }
}

fn optional(name: &str) -> Option<String> {
    var(name).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Built-in event templates. `{field}` placeholders take event parameters.
pub fn default_templates() -> HashMap<String, String> {
    [
        ("onConnect", "{mynumber} Connected successfully!"),
        ("onConnectError", "{mynumber} Connect error throught socket {socket}"),
        (
            "onCredentialsBad",
            "{mynumber} Bad credential provided. \n\tStatus: {status}. \n\tReason: {reason}",
        ),
        (
            "onCredentialsGood",
            "{mynumber} Good credentials \n\tLogin; {login} \n\tPassword: {password} \n\tType: {type} \
             \n\tExpiration: {expiration} \n\tKind: {kind} \n\tPrice: {price} \n\tCost: {cost} \
             \n\tCurrency: {currency} \n\tPrice expiration: {price_expiration}",
        ),
        ("onDisconnect", "{mynumber} Disconnected!"),
        (
            "onMessageComposing",
            "{mynumber} Typing. \n\tTarget: {from} \n\tID: {id} \n\tType: {type} \n\tTime: {time}",
        ),
        (
            "onMessagePaused",
            "{mynumber} Typing paused. \n\tTarget: {from} \n\tID: {id} \n\tType: {type} \n\tTime: {time}",
        ),
        ("onPresence", "{mynumber} get presence. \n\tFrom: {from} \n\tStatus: {status}"),
        (
            "onSendMessage",
            "{mynumber} send a message. \n\tTarget: {target} \n\tID: {messageId} \n\tNode: {node}",
        ),
        ("onSendPresence", "{mynumber} sends presence. Type: {type}. Name: {name}"),
    ]
    .into_iter()
    .map(|(event, template)| (event.to_string(), template.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_documented_options() {
        let config = Config::new(Account {
            nickname: "Itnovado".to_string(),
            number: "5219512132132".to_string(),
            password: "secret".to_string(),
        });

        assert_eq!(config.broadcast_limit, 20);
        assert!(config.listen_events);
        assert_eq!(config.listen_type, ListenType::Screen);
        assert_eq!(config.media_path, PathBuf::from("media"));
        assert_eq!(
            config.templates["onConnect"],
            "{mynumber} Connected successfully!"
        );
    }

    #[test]
    fn listen_type_accepts_echo_alias() {
        assert_eq!("echo".parse::<ListenType>(), Ok(ListenType::Screen));
        assert_eq!("mixed".parse::<ListenType>(), Ok(ListenType::Mixed));
        assert!("syslog".parse::<ListenType>().is_err());
    }

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
