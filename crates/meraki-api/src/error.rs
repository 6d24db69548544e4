use thiserror::Error;

/// Top-level error type for the `meraki-api` crate.
///
/// Covers every failure mode of the Dashboard REST surface:
/// authentication, authorization, rate limiting, transport, and decoding.
/// `meraki-core` maps these into domain errors and config-flow codes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The Dashboard rejected the API key (HTTP 401).
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The API key is valid but lacks access to the resource (HTTP 403).
    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    /// The API key could not be turned into a request header.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Rate limiting ───────────────────────────────────────────────
    /// The Dashboard throttled the request (HTTP 429).
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Dashboard API ───────────────────────────────────────────────
    /// Any other non-success response, with the `errors` array joined.
    #[error("Dashboard API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the Dashboard refused the credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidApiKey | Self::Forbidden { .. } | Self::Authentication { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the request never reached the Dashboard.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
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

    /// Seconds the Dashboard asked us to wait, if this is a 429.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// HTTP status code behind this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidApiKey => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures() {
        assert!(Error::InvalidApiKey.is_auth_failure());
        assert!(
            Error::Forbidden {
                message: "no".into()
            }
            .is_auth_failure()
        );
        assert!(
            !Error::RateLimited {
                retry_after_secs: 2
            }
            .is_auth_failure()
        );
    }

    #[test]
    fn transient_classification() {
        assert!(
            Error::RateLimited {
                retry_after_secs: 1
            }
            .is_transient()
        );
        assert!(Error::Timeout { timeout_secs: 30 }.is_transient());
        assert!(
            Error::Api {
                status: 502,
                message: "bad gateway".into()
            }
            .is_transient()
        );
        assert!(
            !Error::Api {
                status: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
        assert!(!Error::InvalidApiKey.is_transient());
    }

    #[test]
    fn status_and_retry_after() {
        let err = Error::RateLimited {
            retry_after_secs: 7,
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some(7));
        assert_eq!(Error::InvalidApiKey.retry_after(), None);
        assert!(
            Error::Api {
                status: 404,
                message: "missing".into()
            }
            .is_not_found()
        );
    }
}
