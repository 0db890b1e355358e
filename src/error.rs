//! Error type shared by the library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlogError>;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GET {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no {document_type} document with uid {uid:?}")]
    NotFound { document_type: String, uid: String },

    #[error("content API did not advertise a master ref")]
    NoMasterRef,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BlogError {
    /// Not-found is reported to readers as a missing page rather than a crash.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlogError::NotFound { .. })
    }
}
