// ── Core error types ──
//
// Domain errors from meraki-core. Dashboard transport failures and config
// validation failures are folded into these variants, and `flow_code()`
// reduces any of them to the short code a setup flow reports back.

use meraki_config::ConfigError;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Dashboard not ready: {message}")]
    NotReady { message: String },

    #[error("No organizations are visible to this API key")]
    NoOrganizations,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the Dashboard: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Dashboard request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Polling errors ───────────────────────────────────────────────
    /// A coordinator poll failed; the message carries the cause.
    #[error("{message}")]
    UpdateFailed { message: String },

    // ── Registry errors ──────────────────────────────────────────────
    #[error("Unknown entity type: {device_type}_{metric}")]
    UnknownEntityType { device_type: String, metric: String },

    #[error("Hub not found: {hub_id}")]
    HubNotFound { hub_id: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if one was received).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("{message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap a poll failure the way coordinators surface it.
    pub fn update_failed(err: &impl std::fmt::Display) -> Self {
        Self::UpdateFailed {
            message: format!("Error communicating with API: {err}"),
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Transient failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Map this error onto the code a setup flow shows the user.
    pub fn flow_code(&self) -> FlowErrorCode {
        match self {
            Self::AuthenticationFailed { .. } => FlowErrorCode::InvalidAuth,
            Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::RateLimited { .. }
            | Self::NotReady { .. }
            | Self::UpdateFailed { .. }
            | Self::Api { .. } => FlowErrorCode::CannotConnect,
            Self::Validation { .. } => FlowErrorCode::InvalidFormat,
            Self::NoOrganizations => FlowErrorCode::NoOrganizations,
            Self::UnknownEntityType { .. }
            | Self::HubNotFound { .. }
            | Self::Config { .. }
            | Self::Internal(_) => FlowErrorCode::Unknown,
        }
    }
}

// ── Flow error codes ─────────────────────────────────────────────────

/// Short error codes reported by a config flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FlowErrorCode {
    InvalidAuth,
    CannotConnect,
    InvalidFormat,
    NoOrganizations,
    Unknown,
}

impl FlowErrorCode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<meraki_api::Error> for CoreError {
    fn from(err: meraki_api::Error) -> Self {
        match err {
            meraki_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "Invalid API key".into(),
            },
            meraki_api::Error::Forbidden { message }
            | meraki_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            meraki_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            meraki_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            meraki_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            meraki_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            meraki_api::Error::RateLimited { retry_after_secs } => {
                CoreError::RateLimited { retry_after_secs }
            }
            meraki_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            meraki_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(message) => CoreError::Validation { message },
            other => CoreError::Config {
                message: other.to_string(),
            },
        }
    }
}
