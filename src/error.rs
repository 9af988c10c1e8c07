//! Error types for the showcase library.

use thiserror::Error;

/// Result type alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the stats client, the document store and startup wiring.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure from the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// A response or document body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration is present but unusable.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The document store rejected or failed a query.
    #[error("document store error on `{collection}`: {message}")]
    Store { collection: String, message: String },
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config { message: message.into() }
    }

    pub fn store<C: Into<String>, S: Into<String>>(collection: C, message: S) -> Self {
        Error::Store { collection: collection.into(), message: message.into() }
    }

    /// Whether the failure is worth retrying on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Status { .. } | Error::Decode(_) | Error::Store { .. })
    }
}
