//! Structured scraper failure.
//!
//! Every failure that can leave the scraper carries a human-readable
//! message, the endpoint it came from (when known) and the underlying
//! cause (when there is one).

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;
/// Shared so that one failure can be handed to every caller of a refresh.
type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a failure, used by callers to decide whether
/// to retry later or escalate to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, TLS or timeout failure before any upstream verdict.
    Transport,
    /// HTTP 403.
    Blocked,
    /// HTTP 429.
    RateLimited,
    /// HTTP 404.
    NotFound,
    /// Any other non-200 status.
    HttpStatus(u16),
    /// An HTML interstitial was served instead of JSON.
    Challenge,
    /// Body was not valid JSON.
    Decode,
    /// JSON carried a non-zero upstream business code.
    Business,
    /// Every endpoint answered but none produced matches.
    Exhausted,
    /// A failure that is not one of the above.
    Unexpected,
}

impl ErrorKind {
    /// Whether the upstream itself produced this verdict.
    pub fn is_upstream(self) -> bool {
        !matches!(
            self,
            ErrorKind::Transport | ErrorKind::Unexpected | ErrorKind::Exhausted
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Blocked => write!(f, "blocked"),
            ErrorKind::RateLimited => write!(f, "rate_limited"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::HttpStatus(code) => write!(f, "http_{code}"),
            ErrorKind::Challenge => write!(f, "challenge"),
            ErrorKind::Decode => write!(f, "decode"),
            ErrorKind::Business => write!(f, "business"),
            ErrorKind::Exhausted => write!(f, "exhausted"),
            ErrorKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}{}", render_context(.endpoint, .cause))]
pub struct ScraperError {
    kind: ErrorKind,
    message: String,
    endpoint: Option<String>,
    #[source]
    cause: Option<Cause>,
}

fn render_context(endpoint: &Option<String>, cause: &Option<Cause>) -> String {
    let mut out = String::new();
    if let Some(endpoint) = endpoint {
        out.push_str(" | endpoint=");
        out.push_str(endpoint);
    }
    if let Some(cause) = cause {
        out.push_str(" | cause=");
        out.push_str(&cause.to_string());
    }
    out
}

impl ScraperError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            endpoint: None,
            cause: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxedCause>) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Network-level failure from a transport strategy.
    pub fn transport(endpoint: &str, cause: reqwest::Error) -> Self {
        let message = if cause.is_timeout() {
            "Request timed out"
        } else if cause.is_connect() {
            "Connection failed"
        } else {
            "Request failed"
        };
        Self::new(ErrorKind::Transport, message)
            .with_endpoint(endpoint)
            .with_cause(cause)
    }

    /// Wrap a failure that did not originate as a `ScraperError`.
    pub fn unexpected(endpoint: &str, cause: anyhow::Error) -> Self {
        let cause: BoxedCause = cause.into();
        Self::new(ErrorKind::Unexpected, "Unexpected error")
            .with_endpoint(endpoint)
            .with_cause(cause)
    }

    pub fn exhausted() -> Self {
        Self::new(
            ErrorKind::Exhausted,
            "All endpoints exhausted — no matches returned",
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Whether trying again later is likely to help.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Transport
            | ErrorKind::RateLimited
            | ErrorKind::Challenge
            | ErrorKind::Blocked => true,
            ErrorKind::HttpStatus(code) => code >= 500,
            ErrorKind::NotFound
            | ErrorKind::Decode
            | ErrorKind::Business
            | ErrorKind::Exhausted
            | ErrorKind::Unexpected => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_message_only() {
        let err = ScraperError::exhausted();
        assert_eq!(
            err.to_string(),
            "All endpoints exhausted — no matches returned"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn test_display_with_endpoint_and_cause() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ScraperError::new(ErrorKind::Decode, "Invalid JSON")
            .with_endpoint("https://x/api")
            .with_cause(json_err);

        let rendered = err.to_string();
        assert!(rendered.starts_with("Invalid JSON | endpoint=https://x/api | cause="));
        assert!(err.source().is_some());
        assert_eq!(err.endpoint(), Some("https://x/api"));
    }

    #[test]
    fn test_unexpected_keeps_origin() {
        let err = ScraperError::unexpected("https://x/api", anyhow::anyhow!("boom"));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.to_string().contains("cause=boom"));
    }

    #[test]
    fn test_clone_shares_cause() {
        let json_err = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let err = ScraperError::new(ErrorKind::Decode, "Invalid JSON").with_cause(json_err);
        let copy = err.clone();
        assert_eq!(copy.to_string(), err.to_string());
        assert_eq!(copy.kind(), ErrorKind::Decode);
        assert!(copy.source().is_some());
    }

    #[test]
    fn test_retry_classification() {
        assert!(ScraperError::new(ErrorKind::RateLimited, "r").is_retryable());
        assert!(ScraperError::new(ErrorKind::HttpStatus(503), "s").is_retryable());
        assert!(!ScraperError::new(ErrorKind::HttpStatus(400), "s").is_retryable());
        assert!(!ScraperError::new(ErrorKind::NotFound, "n").is_retryable());
        assert!(!ScraperError::exhausted().is_retryable());
    }

    #[test]
    fn test_upstream_kinds() {
        assert!(ErrorKind::Blocked.is_upstream());
        assert!(ErrorKind::Decode.is_upstream());
        assert!(!ErrorKind::Transport.is_upstream());
        assert!(!ErrorKind::Unexpected.is_upstream());
    }
}
