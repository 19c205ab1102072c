//! Maps async-openai errors onto the transport error taxonomy.

use async_openai::error::OpenAIError;
use dbot_core::{TransportError, TransportErrorKind};

/// Classifies a provider error message by its wording. Used when no HTTP status is available
/// (async-openai turns non-2xx bodies into `ApiError` without keeping the status).
pub fn classify_message(message: &str) -> TransportErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("too many requests")
        || lower.contains("429")
    {
        TransportErrorKind::RateLimited
    } else if lower.contains("api key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("401")
    {
        TransportErrorKind::Unauthorized
    } else if lower.contains("timed out") || lower.contains("timeout") {
        TransportErrorKind::Timeout
    } else {
        TransportErrorKind::Api
    }
}

fn classify_status(status: u16) -> TransportErrorKind {
    match status {
        401 | 403 => TransportErrorKind::Unauthorized,
        408 => TransportErrorKind::Timeout,
        429 => TransportErrorKind::RateLimited,
        _ => TransportErrorKind::Api,
    }
}

/// Converts an async-openai error into a [`TransportError`].
pub fn classify_error(err: &OpenAIError) -> TransportError {
    let kind = match err {
        OpenAIError::Reqwest(e) => {
            if e.is_timeout() {
                TransportErrorKind::Timeout
            } else if let Some(status) = e.status() {
                classify_status(status.as_u16())
            } else {
                TransportErrorKind::Network
            }
        }
        OpenAIError::ApiError(api) => classify_message(&api.message),
        OpenAIError::StreamError(message) => classify_message(message),
        _ => TransportErrorKind::Api,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_message_rate_limit() {
        assert_eq!(
            classify_message("Rate limit exceeded: free-models-per-day"),
            TransportErrorKind::RateLimited
        );
        assert_eq!(
            classify_message("Too Many Requests"),
            TransportErrorKind::RateLimited
        );
    }

    #[test]
    fn test_classify_message_unauthorized() {
        assert_eq!(
            classify_message("Incorrect API key provided"),
            TransportErrorKind::Unauthorized
        );
        assert_eq!(
            classify_message("No auth credentials found (401)"),
            TransportErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_classify_message_other() {
        assert_eq!(
            classify_message("The model `foo` does not exist"),
            TransportErrorKind::Api
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(429), TransportErrorKind::RateLimited);
        assert_eq!(classify_status(401), TransportErrorKind::Unauthorized);
        assert_eq!(classify_status(403), TransportErrorKind::Unauthorized);
        assert_eq!(classify_status(500), TransportErrorKind::Api);
    }

    #[test]
    fn test_classify_error_invalid_argument_is_api() {
        let err = OpenAIError::InvalidArgument("bad request".to_string());
        let transport = classify_error(&err);
        assert_eq!(transport.kind, TransportErrorKind::Api);
        assert!(transport.message.contains("bad request"));
    }
}
