//! TOML profiles, figment loading, and API-key credential resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use meraki_api::Region;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ConfigError;
use crate::schema::{ConfigMap, MerakiConfigSchema, keys};

/// Keyring service name for stored API keys.
pub const KEYRING_SERVICE: &str = "meraki-dash";

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named Dashboard profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named Dashboard profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Dashboard region; ignored when `base_url` is set.
    pub region: Option<Region>,

    /// Explicit API base URL (must be a regional endpoint).
    pub base_url: Option<String>,

    /// Organization to poll.
    pub organization_id: Option<String>,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout.
    pub timeout: Option<u64>,

    /// Config-entry options (intervals, discovery, device selection).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: ConfigMap,
}

impl Profile {
    /// Effective base URL: explicit URL, else the region's, else global.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.region.unwrap_or_default().base_url().to_owned())
    }

    pub fn effective_timeout(&self, defaults: &Defaults) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(defaults.timeout))
    }

    /// The `data` map a config entry built from this profile would carry.
    pub fn entry_data(&self, api_key: &SecretString) -> ConfigMap {
        let mut data = ConfigMap::new();
        data.insert(
            keys::API_KEY.into(),
            Value::from(api_key.expose_secret().to_owned()),
        );
        data.insert(
            keys::BASE_URL.into(),
            Value::from(self.effective_base_url()),
        );
        data.insert(
            keys::ORGANIZATION_ID.into(),
            Value::from(self.organization_id.clone().unwrap_or_default()),
        );
        data
    }

    /// Resolve credentials and validate the profile as a config entry.
    pub fn to_schema(&self, profile_name: &str) -> Result<MerakiConfigSchema, ConfigError> {
        let api_key = resolve_api_key(self, profile_name)?;
        MerakiConfigSchema::from_config_entry(&self.entry_data(&api_key), Some(&self.options))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "meraki-dash", "meraki-dash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("meraki-dash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from an explicit path, layered under `MERAKI_*` env vars.
///
/// Nested keys use a double underscore:
/// `MERAKI_PROFILES__HQ__ORGANIZATION_ID=123`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MERAKI_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve an API key: profile env var, then keyring, then plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the OS keyring for a profile.
pub fn store_api_key(profile_name: &str, api_key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(api_key.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn loads_profiles_and_options_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "hq"

[defaults]
output = "json"

[profiles.hq]
region = "canada"
organization_id = "123456"
api_key = "0123456789abcdef0123456789abcdef01234567"

[profiles.hq.options]
scan_interval = 600
selected_devices = ["Q2MT-0000-0001"]
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.default_profile_name(), "hq");
        assert_eq!(config.defaults.output, "json");

        let profile = config.profile("hq").unwrap();
        assert_eq!(profile.effective_base_url(), "https://api.meraki.ca/api/v1");
        assert_eq!(profile.options.get("scan_interval"), Some(&json!(600)));

        let schema = MerakiConfigSchema::from_config_entry(
            &profile.entry_data(&SecretString::from(KEY.to_owned())),
            Some(&profile.options),
        )
        .unwrap();
        assert_eq!(schema.scan_interval, 600);
        assert_eq!(schema.organization_id, "123456");
        assert_eq!(schema.selected_devices, vec!["Q2MT-0000-0001".to_owned()]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), "default");
        assert_eq!(config.defaults.timeout, 30);
        assert!(matches!(
            config.profile("nope"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                base_url: Some("https://api.meraki.in/api/v1".into()),
                organization_id: Some("42".into()),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.effective_base_url(), "https://api.meraki.in/api/v1");
        assert_eq!(profile.organization_id.as_deref(), Some("42"));
    }

    #[test]
    fn plaintext_used_when_env_var_unset() {
        let var = "MERAKI_DASH_TEST_PROFILE_KEY_7731";
        let profile = Profile {
            api_key_env: Some(var.into()),
            api_key: Some(KEY.into()),
            ..Profile::default()
        };
        let key = resolve_api_key(&profile, "meraki-dash-test-env-fallback").unwrap();
        assert_eq!(key.expose_secret(), KEY);
    }

    #[test]
    fn missing_credentials_error() {
        let profile = Profile {
            api_key_env: Some("MERAKI_DASH_TEST_UNSET_VAR_1234".into()),
            ..Profile::default()
        };
        let err = resolve_api_key(&profile, "meraki-dash-test-no-such-profile").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }
}
