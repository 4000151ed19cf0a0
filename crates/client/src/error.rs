//! Error types for the channel, the REST collaborator, and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Why a notification channel could not be opened
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("No session token available")]
    MissingToken,

    #[error("Session token has expired")]
    ExpiredToken,

    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),
}

/// Errors from REST collection requests
#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RestError {
    /// Toast text shown when fetching `collection` fails
    pub fn user_message(&self, collection: &str) -> String {
        match self {
            RestError::Status { status: 401, .. } => {
                format!("Failed to fetch {collection}: session expired")
            }
            _ => format!("Failed to fetch {collection}"),
        }
    }
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid origin {origin}: {reason}")]
    Origin { origin: String, reason: String },
}
