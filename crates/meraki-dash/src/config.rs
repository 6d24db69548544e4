//! CLI configuration: a thin layer over `meraki_config`.
//!
//! Resolves the active profile and applies `GlobalOpts` flag overrides
//! (--api-key, --base-url, --org, --timeout) to build a config entry.

use std::time::Duration;

use meraki_api::{TlsMode, TransportConfig};
use meraki_config::{Config, ConfigMap, MerakiConfigSchema, Profile, keys};
use meraki_core::ConfigEntry;
use secrecy::SecretString;
use serde_json::Value;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use meraki_config::{config_path, load_config_or_default};

/// A profile resolved against the CLI flags, ready to build a controller.
#[derive(Debug)]
pub struct ResolvedProfile {
    pub name: String,
    pub entry: ConfigEntry,
    pub transport: TransportConfig,
}

impl ResolvedProfile {
    /// Validate the entry and return its schema.
    pub fn schema(&self) -> Result<MerakiConfigSchema, CliError> {
        Ok(self.entry.schema()?)
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

/// Build the config entry for the active profile.
///
/// Flags win over profile values. Without a matching profile, the flags
/// alone must supply an API key; an explicitly requested profile that
/// does not exist is an error.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<ResolvedProfile, CliError> {
    let name = active_profile_name(global, config);
    let fallback = Profile::default();
    let profile = lookup_profile(global, config, &name, &fallback)?;

    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => meraki_config::resolve_api_key(profile, &name)
            .map_err(|e| CliError::from(e).for_profile(&name))?,
    };

    let mut data = profile.entry_data(&api_key);
    if let Some(ref url) = global.base_url {
        data.insert(keys::BASE_URL.into(), Value::from(url.clone()));
    }
    if let Some(ref org) = global.org {
        data.insert(keys::ORGANIZATION_ID.into(), Value::from(org.clone()));
    }

    let title = entry_title(&name, &data);
    let entry = ConfigEntry::new(name.clone(), title, data).with_options(profile.options.clone());

    let timeout = global.timeout.map_or_else(
        || profile.effective_timeout(&config.defaults),
        Duration::from_secs,
    );
    let mut transport = TransportConfig::default().with_timeout(timeout);
    if let Some(ref ca) = profile.ca_cert {
        transport.tls = TlsMode::CustomCa(ca.clone());
    }

    Ok(ResolvedProfile {
        name,
        entry,
        transport,
    })
}

/// The named profile, or `fallback` when the name came from the config
/// default rather than `--profile`.
pub fn lookup_profile<'a>(
    global: &GlobalOpts,
    config: &'a Config,
    name: &str,
    fallback: &'a Profile,
) -> Result<&'a Profile, CliError> {
    match config.profiles.get(name) {
        Some(profile) => Ok(profile),
        None if global.profile.is_some() => Err(profile_not_found(name, config)),
        None => Ok(fallback),
    }
}

/// Configured profile names, sorted.
pub fn profile_names(config: &Config) -> Vec<String> {
    let mut names: Vec<String> = config.profiles.keys().cloned().collect();
    names.sort();
    names
}

fn profile_not_found(name: &str, config: &Config) -> CliError {
    let names = profile_names(config);
    CliError::ProfileNotFound {
        name: name.to_owned(),
        available: if names.is_empty() {
            "(none)".into()
        } else {
            names.join(", ")
        },
        path: config_path().display().to_string(),
    }
}

fn entry_title(profile: &str, data: &ConfigMap) -> String {
    match data.get(keys::ORGANIZATION_ID).and_then(Value::as_str) {
        Some(org) if !org.is_empty() => format!("Meraki {profile} ({org})"),
        _ => format!("Meraki {profile}"),
    }
}
