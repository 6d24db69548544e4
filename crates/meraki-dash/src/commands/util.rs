//! Shared helpers for command handlers.

use meraki_api::MerakiClient;
use meraki_core::{Controller, build_client, resolve_organization};
use tracing::info;

use crate::config::ResolvedProfile;
use crate::error::CliError;

/// A connected client plus the organization it should read.
#[derive(Debug)]
pub struct Session {
    pub client: MerakiClient,
    pub org_id: String,
}

/// Validate the profile, build a client and settle the organization id.
pub async fn connect(profile: &ResolvedProfile) -> Result<Session, CliError> {
    let schema = profile.schema()?;
    let client = build_client(&schema, &profile.transport)?;
    let org_id = if schema.organization_id.is_empty() {
        let org = resolve_organization(&client)
            .await
            .map_err(|e| CliError::from(e).for_profile(&profile.name))?;
        info!(org_id = %org.id, name = %org.name, "using first visible organization");
        org.id
    } else {
        schema.organization_id
    };
    Ok(Session { client, org_id })
}

/// Build a controller for the profile and run its setup, which includes
/// the first poll of every hub.
pub async fn start_controller(profile: ResolvedProfile) -> Result<Controller, CliError> {
    let name = profile.name.clone();
    let controller = Controller::new(profile.entry, profile.transport);
    controller
        .setup()
        .await
        .map_err(|e| CliError::from(e).for_profile(&name))?;
    Ok(controller)
}

/// `-` for missing values in tables.
pub fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_owned()
}
