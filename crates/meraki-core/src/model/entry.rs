// ── Config entries ──

use meraki_config::{ConfigMap, MerakiConfigSchema, keys};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use crate::error::CoreError;

/// Lifecycle state of a config entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryState {
    #[default]
    NotLoaded,
    Loaded,
    /// Setup failed for good (bad credentials, invalid config).
    SetupError,
    /// Setup failed transiently; a later attempt may succeed.
    SetupRetry,
    FailedUnload,
}

/// A persisted pair of `data` and `options` maps plus an entry id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub data: ConfigMap,
    #[serde(default)]
    pub options: ConfigMap,
    #[serde(skip, default)]
    pub state: EntryState,
}

fn default_version() -> u32 {
    1
}

impl ConfigEntry {
    pub fn new(entry_id: impl Into<String>, title: impl Into<String>, data: ConfigMap) -> Self {
        Self {
            entry_id: entry_id.into(),
            title: title.into(),
            version: default_version(),
            data,
            options: ConfigMap::new(),
            state: EntryState::NotLoaded,
        }
    }

    pub fn with_options(mut self, options: ConfigMap) -> Self {
        self.options = options;
        self
    }

    /// Validate `data` + `options` into the typed schema.
    pub fn schema(&self) -> Result<MerakiConfigSchema, CoreError> {
        Ok(MerakiConfigSchema::from_config_entry(
            &self.data,
            Some(&self.options),
        )?)
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.data.get(keys::ORGANIZATION_ID).and_then(Value::as_str)
    }

    /// Keys present in `data`, minus the API key.
    pub fn redacted_data_keys(&self) -> Vec<String> {
        self.data
            .keys()
            .filter(|k| k.as_str() != keys::API_KEY)
            .cloned()
            .collect()
    }
}
