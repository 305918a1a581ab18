// ── Core error types ──
//
// User-facing errors from flowdeck-core. Consumers never see raw HTTP
// bodies or serde failures; the `From<flowdeck_api::Error>` impl folds
// transport-layer errors into the variants below.
//
// `CoreError` is `Clone` because the session keeps the last error as
// state and every published view carries a copy of it.

use thiserror::Error;

/// Coarse classification used by the session and by front ends to decide
/// how to present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Fetch or push failures, including HTTP error statuses.
    Transport,
    /// A filter expression that does not compile.
    Compile,
    /// A push message that could not be decoded.
    Protocol,
    Config,
    Internal,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Transport errors ─────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Flow not found: {identifier}")]
    FlowNotFound { identifier: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Expression errors ────────────────────────────────────────────
    #[error("Invalid filter expression {expression:?}: {message}")]
    Compile { expression: String, message: String },

    // ── Protocol errors ──────────────────────────────────────────────
    #[error("Malformed push message: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Flow controller is not running")]
    ControllerStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. }
            | Self::AuthenticationFailed { .. }
            | Self::Timeout { .. }
            | Self::FlowNotFound { .. }
            | Self::Api { .. } => ErrorKind::Transport,
            Self::Compile { .. } => ErrorKind::Compile,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Config { .. } => ErrorKind::Config,
            Self::ControllerStopped | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn compile(expression: &str, message: impl Into<String>) -> Self {
        Self::Compile {
            expression: expression.to_owned(),
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<flowdeck_api::Error> for CoreError {
    fn from(err: flowdeck_api::Error) -> Self {
        match err {
            flowdeck_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            flowdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            flowdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            flowdeck_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            flowdeck_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            flowdeck_api::Error::NotFound { path } => CoreError::FlowNotFound { identifier: path },
            flowdeck_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            flowdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            flowdeck_api::Error::Protocol(message) => CoreError::Protocol { message },
        }
    }
}
