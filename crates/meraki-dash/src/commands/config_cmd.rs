//! Config subcommand handlers.

use meraki_config::validate::validate_api_key;
use meraki_config::{ConfigMap, Profile};
use meraki_core::diagnostics::REDACTED;
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// A profile as shown by `config show`, secrets redacted.
#[derive(Debug, Serialize)]
struct ProfileView {
    profile: String,
    config_file: String,
    base_url: String,
    organization_id: Option<String>,
    api_key: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key_env: Option<String>,
    timeout_secs: u64,
    options: ConfigMap,
}

/// Outcome of `config validate`.
#[derive(Debug, Serialize)]
struct ValidationReport {
    profile: String,
    valid: bool,
    base_url: String,
    organization_id: Option<String>,
    scan_interval: u64,
    auto_discovery: bool,
    discovery_interval: u64,
    selected_devices: usize,
}

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let name = config::active_profile_name(global, &cfg);
    let fallback = Profile::default();
    let profile = config::lookup_profile(global, &cfg, &name, &fallback)?;

    let has_key =
        global.api_key.is_some() || meraki_config::resolve_api_key(profile, &name).is_ok();
    let view = ProfileView {
        profile: name,
        config_file: config::config_path().display().to_string(),
        base_url: global
            .base_url
            .clone()
            .unwrap_or_else(|| profile.effective_base_url()),
        organization_id: global
            .org
            .clone()
            .or_else(|| profile.organization_id.clone()),
        api_key: has_key.then_some(REDACTED),
        api_key_env: profile.api_key_env.clone(),
        timeout_secs: global
            .timeout
            .unwrap_or_else(|| profile.effective_timeout(&cfg.defaults).as_secs()),
        options: profile.options.clone(),
    };

    let out = output::render_single(
        global.output,
        &view,
        |v| {
            let mut lines = vec![
                format!("Profile:      {}", v.profile),
                format!("Config file:  {}", v.config_file),
                format!("Base URL:     {}", v.base_url),
                format!(
                    "Organization: {}",
                    v.organization_id.as_deref().unwrap_or("(first visible)")
                ),
                format!("API key:      {}", v.api_key.unwrap_or("(not set)")),
                format!("Timeout:      {}s", v.timeout_secs),
            ];
            if let Some(ref env) = v.api_key_env {
                lines.push(format!("API key env:  {env}"));
            }
            for (key, value) in &v.options {
                lines.push(format!("  {key} = {value}"));
            }
            lines.join("\n")
        },
        |v| v.profile.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn validate(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile = config::resolve(global, &cfg)?;
    let schema = profile.schema()?;

    let report = ValidationReport {
        profile: profile.name,
        valid: true,
        base_url: schema.base_url.clone(),
        organization_id: (!schema.organization_id.is_empty())
            .then(|| schema.organization_id.clone()),
        scan_interval: schema.scan_interval,
        auto_discovery: schema.auto_discovery,
        discovery_interval: schema.discovery_interval,
        selected_devices: schema.selected_devices.len(),
    };
    let out = output::render_single(
        global.output,
        &report,
        |r| {
            format!(
                "Profile '{}' is valid\n  Base URL:      {}\n  Organization:  {}\n  \
                 Scan interval: {}s\n  Discovery:     {} (every {}s)\n  Selected:      {}",
                r.profile,
                r.base_url,
                r.organization_id.as_deref().unwrap_or("(first visible)"),
                r.scan_interval,
                if r.auto_discovery { "on" } else { "off" },
                r.discovery_interval,
                if r.selected_devices == 0 {
                    "all devices".to_owned()
                } else {
                    format!("{} devices", r.selected_devices)
                },
            )
        },
        |r| r.profile.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

fn set_key(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let name = config::active_profile_name(global, &cfg);

    let key = match global.api_key {
        Some(ref key) => key.clone(),
        None => rpassword::prompt_password(format!("Dashboard API key for '{name}': "))?,
    };
    let key = key.trim().to_owned();
    validate_api_key(&key)?;

    meraki_config::store_api_key(&name, &SecretString::from(key))?;
    if !global.quiet {
        eprintln!("API key stored in the system keyring for profile '{name}'");
    }
    Ok(())
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Validate => validate(global),
        ConfigCommand::Show => show(global),
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::SetKey => set_key(global),
    }
}
