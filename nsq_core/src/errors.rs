use std::time::Duration;

use thiserror::Error;

/// Coarse classification of a failure, used by callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Config,
    Transport,
    Encode,
}

#[derive(Error, Debug)]
pub enum NsqError {
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("JSON encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl NsqError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::Config(_) => ErrorKind::Config,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Encode(_) => ErrorKind::Encode,
        }
    }
}

/// Errors raised while resolving a module's configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Module key '{module}' is not configured")]
    MissingModule { module: String },

    #[error("Config for module '{module}' is invalid: {reason}")]
    InvalidModule { module: String, reason: String },

    #[error("Config for module '{module}' is missing required field '{field}'")]
    MissingField { module: String, field: &'static str },

    #[error("Config store error: {0}")]
    Store(#[from] config::ConfigError),
}

/// Errors raised by a transport while delivering a message.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("nsqd responded with status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout { operation: &'static str, timeout: Duration },

    #[error("nsqd rejected message: {0}")]
    Rejected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, NsqError>;
