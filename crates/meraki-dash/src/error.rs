//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use meraki_config::ConfigError;
use meraki_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Meraki Dashboard")]
    #[diagnostic(
        code(meraki::connection_failed),
        help(
            "Check network access to the Dashboard API.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Dashboard is not ready: {message}")]
    #[diagnostic(
        code(meraki::not_ready),
        help("The Dashboard answered but setup could not finish. Try again shortly.")
    )]
    NotReady { message: String },

    #[error("Rate limited by the Dashboard, retry after {seconds}s")]
    #[diagnostic(
        code(meraki::rate_limited),
        help("The organization is over its API budget. Wait and run again.")
    )]
    RateLimited { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(meraki::auth_failed),
        help(
            "Verify the API key under My Profile > API access in the Dashboard.\n\
             Store a new one with: meraki-dash config set-key --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(meraki::no_credentials),
        help(
            "Store one with: meraki-dash config set-key\n\
             Or set the MERAKI_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("No organizations are visible to this API key")]
    #[diagnostic(
        code(meraki::no_organizations),
        help("Enable API access for the organization, or use a key from an org admin.")
    )]
    NoOrganizations,

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(meraki::not_found),
        help("Run: meraki-dash {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(meraki::api_error))]
    ApiError {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid configuration: {reason}")]
    #[diagnostic(
        code(meraki::validation),
        help("Check the profile with: meraki-dash config show")
    )]
    Validation { reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(meraki::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Config file: {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(meraki::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(meraki::timeout),
        help("Increase the timeout with --timeout or check Dashboard reachability.")
    )]
    Timeout { seconds: u64 },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(meraki::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(meraki::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotReady { .. } | Self::RateLimited { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } | Self::NoOrganizations => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to an auth failure.
    #[must_use]
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.to_owned(),
                message,
            },
            Self::NoCredentials { .. } => Self::NoCredentials {
                profile: name.to_owned(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::NotReady { message } | CoreError::UpdateFailed { message } => {
                CliError::NotReady { message }
            }
            CoreError::NoOrganizations => CliError::NoOrganizations,
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::RateLimited { retry_after_secs } => CliError::RateLimited {
                seconds: retry_after_secs,
            },
            CoreError::HubNotFound { hub_id } => CliError::NotFound {
                resource_type: "hub".into(),
                identifier: hub_id,
                list_command: "networks list".into(),
            },
            CoreError::Api { message, status } => CliError::ApiError { message, status },
            CoreError::Validation { message } => CliError::Validation { reason: message },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::UnknownEntityType { .. } | CoreError::Internal(_) => {
                CliError::Internal(err.to_string())
            }
        }
    }
}

impl From<meraki_api::Error> for CliError {
    fn from(err: meraki_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(reason) => CliError::Validation { reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
                path: meraki_config::config_path().display().to_string(),
            },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
