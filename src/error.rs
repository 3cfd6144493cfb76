use std::sync::Arc;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The backend answered with a non-success status.
    #[error("API error {status}: {details}")]
    Api { status: u16, details: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    /// The hub rejected an invocation or broke protocol.
    #[error("hub error: {0}")]
    Hub(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("not connected to the tracking hub")]
    NotConnected,

    #[error("invalid coordinates: lat={lat}, lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("invalid identifier '{value}': {reason}")]
    InvalidId { value: String, reason: String },

    /// The request was superseded and cancelled; never shown to users.
    #[error("request aborted")]
    Aborted,

    /// A failure delivered to every waiter of a deduplicated load.
    #[error(transparent)]
    Shared(Arc<Error>),

    #[error("cache error: {0}")]
    Cache(String),

    /// A list view could not be loaded; carries the message the view shows.
    #[error("failed to load {scope}: {message}")]
    ListLoad { scope: &'static str, message: String },
}

impl Error {
    /// True when the error comes from a cancelled request, at any depth.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        match self {
            Self::Aborted => true,
            Self::Shared(inner) => inner.is_aborted(),
            _ => false,
        }
    }

    /// HTTP status of an API failure, if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            Self::Shared(inner) => inner.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_is_detected_through_shared() {
        let err = Error::Shared(Arc::new(Error::Aborted));
        assert!(err.is_aborted());
        assert!(!Error::Connection("refused".into()).is_aborted());
    }

    #[test]
    fn shared_error_displays_inner_message() {
        let err = Error::Shared(Arc::new(Error::Api {
            status: 500,
            details: "boom".into(),
        }));
        assert_eq!(err.to_string(), "API error 500: boom");
        assert_eq!(err.status(), Some(500));
    }
}
