use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    /// Input did not match the expected line format or a stage precondition
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required setting is missing; fatal to the finalize in progress
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single sink call failed
    #[error("{sink} error: {message}")]
    Transport { sink: String, message: String },

    /// Lookup found more than one live folder with the same name
    #[error("Ambiguous folder '{name}' under {parent}: {} matches ({})", ids.len(), ids.join(", "))]
    AmbiguousFolder {
        name: String,
        parent: String,
        ids: Vec<String>,
    },

    #[error("Timeout: {operation} took longer than {limit:?}")]
    Timeout { operation: String, limit: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl IntakeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transport(sink: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            sink: sink.into(),
            message: message.to_string(),
        }
    }

    /// Whether a retry of the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::Io(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
