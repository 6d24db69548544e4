//! Configuration for the Meraki Dashboard poller.
//!
//! Two layers live here:
//!
//! - [`schema`]: the validated config-entry schema (`data` + `options`
//!   maps) and the migration check, built on the field checks in
//!   [`validate`].
//! - [`profile`]: TOML profiles on disk, layered with `MERAKI_*` env vars
//!   through figment, plus API-key resolution (env, keyring, plaintext).

pub mod profile;
pub mod schema;
pub mod validate;

use thiserror::Error;

pub use profile::{
    Config, Defaults, Profile, config_path, load_config, load_config_from, load_config_or_default,
    resolve_api_key, save_config, store_api_key,
};
pub use schema::{ConfigMap, MerakiConfigSchema, keys, validate_config_migration};
pub use validate::{HubIntervalConfig, IntervalBounds, TieredRefresh};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value failed format, range, or ordering checks.
    #[error("{0}")]
    Validation(String),

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for schema validation failures (as opposed to IO/loading).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}
