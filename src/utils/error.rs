use crate::core::request::Verb;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RssError {
    #[error("RSS: '{method} {path}' failed with status = {status}.")]
    UnexpectedStatus {
        method: Verb,
        path: String,
        status: u16,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("HTTP transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

impl RssError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Status code carried by an `UnexpectedStatus` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RssError>;
