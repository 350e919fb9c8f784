// ── Core error types ──
//
// User-facing errors from wagate-core. Consumers never match on reqwest
// or serde failures directly; the `From<wagate_api::Error>` impl folds
// transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error(
        "Authentication failed: {}",
        .message.as_deref().unwrap_or("rejected by gateway")
    )]
    AuthenticationFailed { message: Option<String> },

    #[error("Not signed in")]
    NotAuthenticated,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Gateway request timed out")]
    Timeout,

    // ── Gateway errors ───────────────────────────────────────────────
    #[error("Not found: {}", .message.as_deref().unwrap_or("no such resource"))]
    NotFound { message: Option<String> },

    #[error("Gateway error: {}", .message.as_deref().unwrap_or("request failed"))]
    Api {
        /// The gateway's own wording; absent when the body carried none.
        message: Option<String>,
        /// HTTP status or envelope code, when the gateway supplied one.
        status: Option<u16>,
    },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("Token storage error: {message}")]
    Storage { message: String },

    #[error("Cannot read attachment: {message}")]
    Media { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Message the gateway sent with this failure, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed { message }
            | Self::NotFound { message }
            | Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text for a resource client's error slot: the gateway's message,
    /// or `fallback` when the failure never reached the gateway.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_owned()
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wagate_api::Error> for CoreError {
    fn from(err: wagate_api::Error) -> Self {
        match err {
            wagate_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            wagate_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Internal(format!("HTTP transport error: {e}"))
                }
            }
            wagate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            wagate_api::Error::ClientSetup(message) => CoreError::Config { message },
            wagate_api::Error::Api { status: 404, message } => CoreError::NotFound { message },
            wagate_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            wagate_api::Error::MissingData { message } => {
                CoreError::Internal(format!("Gateway response had no data: {message}"))
            }
            wagate_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            wagate_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            wagate_api::Error::Protocol(reason) => {
                CoreError::Internal(format!("Socket protocol error: {reason}"))
            }
        }
    }
}
