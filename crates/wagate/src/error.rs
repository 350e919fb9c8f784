//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use wagate_config::ConfigError;
use wagate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {url}")]
    #[diagnostic(
        code(wagate::connection_failed),
        help(
            "Check that the gateway is running and reachable.\n\
             Reason: {reason}\n\
             Change the address with: wagate config set-url <URL>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(wagate::timeout),
        help("Increase timeout with --timeout or check gateway responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(wagate::auth_failed),
        help("Check your email and password, then run: wagate auth login")
    )]
    AuthFailed { message: String },

    #[error("Not signed in to profile '{profile}'")]
    #[diagnostic(
        code(wagate::not_signed_in),
        help("Sign in with: wagate auth login --profile {profile}")
    )]
    NotSignedIn { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(wagate::permission_denied))]
    PermissionDenied { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(wagate::not_found),
        help("Run: wagate {list_command} to see what exists")
    )]
    NotFound {
        message: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(wagate::conflict))]
    Conflict { message: String },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Gateway error ({status}): {message}")]
    #[diagnostic(code(wagate::api_error))]
    ApiError { status: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wagate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(wagate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: wagate config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Could not load configuration: {message}")]
    #[diagnostic(
        code(wagate::config),
        help("Inspect the file reported by: wagate config path")
    )]
    Config { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Token storage failed: {message}")]
    #[diagnostic(
        code(wagate::storage),
        help("Check permissions on the token location shown by: wagate config path")
    )]
    Storage { message: String },

    #[error("Cannot use attachment: {message}")]
    #[diagnostic(code(wagate::media))]
    Media { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wagate::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(wagate::render))]
    Render { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(wagate::internal))]
    Internal { message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotSignedIn { .. } => exit_code::AUTH,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                message: message.unwrap_or_else(|| "credentials rejected by the gateway".into()),
            },
            CoreError::NotAuthenticated => Self::NotSignedIn {
                profile: "current".into(),
            },
            CoreError::NotFound { message } => Self::NotFound {
                message: message.unwrap_or_else(|| "Not found".into()),
                list_command: "devices list".into(),
            },
            CoreError::Api { message, status } => {
                let message = message.unwrap_or_else(|| "request failed".into());
                match status {
                    Some(401) => Self::AuthFailed { message },
                    Some(403) => Self::PermissionDenied { message },
                    Some(409) => Self::Conflict { message },
                    Some(code) => Self::ApiError {
                        status: code.to_string(),
                        message,
                    },
                    None => Self::ApiError {
                        status: "-".into(),
                        message,
                    },
                }
            }
            CoreError::Storage { message } => Self::Storage { message },
            CoreError::Media { message } => Self::Media { message },
            CoreError::Config { message } => Self::Validation {
                field: "api_base_url".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: "(unknown)".into(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
