use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Model registry is empty")]
    EmptyRegistry,

    #[error("Transport failure (model {model}): {source}")]
    TransportFailure {
        model: String,
        #[source]
        source: TransportError,
    },

    #[error("Empty message")]
    EmptyMessage,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbotError {
    /// The transport error behind a failed turn, if this is one.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            DbotError::TransportFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Why a call to the LLM provider failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    RateLimited,
    Unauthorized,
    Network,
    Api,
    EmptyResponse,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::RateLimited => "rate_limited",
            TransportErrorKind::Unauthorized => "unauthorized",
            TransportErrorKind::Network => "network",
            TransportErrorKind::Api => "api",
            TransportErrorKind::EmptyResponse => "empty_response",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({})", message, kind.as_str())]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::RateLimited | TransportErrorKind::Network
        )
    }
}

pub type Result<T> = std::result::Result<T, DbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_display_includes_model_and_kind() {
        let err = DbotError::TransportFailure {
            model: "m1".to_string(),
            source: TransportError::new(TransportErrorKind::RateLimited, "slow down"),
        };
        assert_eq!(
            err.to_string(),
            "Transport failure (model m1): slow down (rate_limited)"
        );
        assert_eq!(
            err.transport_error().map(|e| e.kind),
            Some(TransportErrorKind::RateLimited)
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(TransportError::new(TransportErrorKind::Timeout, "").is_retryable());
        assert!(TransportError::new(TransportErrorKind::Network, "").is_retryable());
        assert!(!TransportError::new(TransportErrorKind::Unauthorized, "").is_retryable());
        assert!(!TransportError::new(TransportErrorKind::EmptyResponse, "").is_retryable());
    }
}
