//! Device command handlers.

use std::collections::HashMap;

use meraki_api::models::Device;
use meraki_core::DeviceType;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Type")]
    family: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "LAN IP")]
    lan_ip: String,
}

/// Inventory record joined with its Dashboard status.
#[derive(Debug, Serialize)]
struct DeviceView {
    #[serde(flatten)]
    device: Device,
    family: Option<DeviceType>,
    status: Option<String>,
}

impl DeviceView {
    fn row(&self, color: bool) -> DeviceRow {
        let d = &self.device;
        DeviceRow {
            serial: d.serial.clone(),
            name: util::or_dash(d.name.as_deref()),
            model: d.model.clone(),
            family: self.family.map_or_else(|| "-".into(), |f| f.to_string()),
            network: util::or_dash(d.network_id.as_deref()),
            status: output::paint_status(self.status.as_deref().unwrap_or("-"), color),
            lan_ip: util::or_dash(d.lan_ip.as_deref()),
        }
    }
}

pub async fn handle(
    profile: &ResolvedProfile,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List {
            device_type,
            network,
        } => {
            let session = util::connect(profile).await?;
            let (devices, statuses) = tokio::try_join!(
                session.client.get_organization_devices(&session.org_id),
                session
                    .client
                    .get_organization_devices_statuses(&session.org_id),
            )?;

            let status_by_serial: HashMap<String, String> =
                statuses.into_iter().map(|s| (s.serial, s.status)).collect();
            let family: Option<DeviceType> = device_type.map(Into::into);

            let mut views: Vec<DeviceView> = devices
                .into_iter()
                .filter(|d| family.is_none_or(|f| f.matches_model(&d.model)))
                .filter(|d| {
                    network
                        .as_deref()
                        .is_none_or(|n| d.network_id.as_deref() == Some(n))
                })
                .map(|device| DeviceView {
                    family: DeviceType::from_model(&device.model),
                    status: status_by_serial.get(&device.serial).cloned(),
                    device,
                })
                .collect();
            views.sort_by(|a, b| a.device.serial.cmp(&b.device.serial));

            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                &views,
                |v| v.row(color),
                |v| v.device.serial.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
