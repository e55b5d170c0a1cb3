use std::fmt;
use thiserror::Error;

/// Which required input a `FileDescriptor` was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Buffer,
    Stream,
    Key,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingInput::Buffer => write!(f, "No file buffer provided"),
            MissingInput::Stream => write!(f, "No file stream provided"),
            MissingInput::Key => write!(f, "No file key provided for deletion"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{input}")]
    MissingInput { input: MissingInput },

    #[error("Invalid MIME type {mime:?}")]
    InvalidMime { mime: String },

    #[error("No data in upload response{}", reason_suffix(.reason))]
    EmptyRemoteResponse { reason: Option<String> },

    #[error("Request to UploadThing failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("UploadThing responded with status {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Invalid UploadThing token: {message}")]
    InvalidToken { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    MissingInput,
    InvalidInput,
    EmptyRemoteResponse,
    TransportFailure,
    Configuration,
}

impl ProviderError {
    pub fn missing(input: MissingInput) -> Self {
        ProviderError::MissingInput { input }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::MissingInput { .. } => ErrorCategory::MissingInput,
            ProviderError::InvalidMime { .. } => ErrorCategory::InvalidInput,
            ProviderError::EmptyRemoteResponse { .. } => ErrorCategory::EmptyRemoteResponse,
            // a stream that fails mid-read is a transfer failure, not bad config
            ProviderError::Transport(_)
            | ProviderError::RemoteStatus { .. }
            | ProviderError::Io(_)
            | ProviderError::SerializationError(_) => ErrorCategory::TransportFailure,
            ProviderError::InvalidToken { .. }
            | ProviderError::TomlError(_)
            | ProviderError::ConfigError { .. }
            | ProviderError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
