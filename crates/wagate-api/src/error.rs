use thiserror::Error;

/// Top-level error type for the `wagate-api` crate.
///
/// Covers every failure mode across both API surfaces: the JSON HTTP API
/// and the Socket.IO notification channel. `wagate-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The gateway rejected the bearer token or the login credentials.
    /// `message` is the gateway's own wording, when the body carried one.
    #[error("Authentication failed: {}", .message.as_deref().unwrap_or("unauthorized"))]
    Authentication { message: Option<String> },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to build the underlying HTTP client.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── Gateway API ─────────────────────────────────────────────────
    /// Error reported by the gateway, with the message from its
    /// `{code, message, data}` envelope when one was returned.
    #[error(
        "Gateway API error (HTTP {status}): {}",
        .message.as_deref().unwrap_or("no message")
    )]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// The envelope was well-formed but carried no `data` payload.
    #[error("Gateway response had no data: {message}")]
    MissingData { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// A frame did not follow the Engine.IO / Socket.IO framing rules.
    #[error("Socket protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if this error indicates the token was rejected
    /// and signing in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The message the gateway put in its error envelope, if any.
    ///
    /// Transport failures, bodies without a `message` and local decoding
    /// errors have none; callers fall back to their own wording for those.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Authentication { message } | Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}
