use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Target phone(s) not found")]
    InvalidTarget,
    #[error("Source {0} can't be downloaded")]
    UnreachableSource(String),
    #[error("Couldn't tell what {0} was, local file or URL")]
    SourceNotFound(String),
    #[error("Media {source_ref} too big: {size} bytes (limit {limit})")]
    MediaTooLarge {
        source_ref: String,
        size: u64,
        limit: u64,
    },
    #[error("Media type {0} unsupported")]
    UnsupportedMediaKind(String),
    #[error("Media storage path {0} is not set up")]
    MediaPathUnavailable(String),
    #[error("Log path {0} is missing or not writable")]
    LogPathUnavailable(String),
    #[error("Callback is not invocable: {0}")]
    CallbackNotInvocable(String),
    #[error("Gateway call failed: {0}")]
    Gateway(#[source] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
