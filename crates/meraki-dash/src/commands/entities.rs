//! Entity listing: one full poll, then the store's contents.

use std::sync::Arc;

use meraki_core::{Entity, Platform};
use tabled::Tabled;

use crate::cli::{EntitiesArgs, EntitiesCommand, GlobalOpts, PlatformFilter};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity ID")]
    entity_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Device")]
    device: String,
}

pub(crate) fn state_with_unit(entity: &Entity) -> String {
    let state = entity.display_state();
    match entity.description.unit {
        Some(unit) if entity.is_available() && entity.platform() == Platform::Sensor => {
            format!("{state} {unit}")
        }
        _ => state,
    }
}

fn row(entity: &Arc<Entity>, color: bool) -> EntityRow {
    EntityRow {
        entity_id: entity.entity_id.clone(),
        name: entity.name.clone(),
        state: output::paint_state(&state_with_unit(entity), color),
        device: entity.device_info.name.clone(),
    }
}

fn keep(
    entity: &Entity,
    platform: Option<PlatformFilter>,
    serial: Option<&str>,
    available: bool,
) -> bool {
    let platform_ok = match platform {
        None => true,
        Some(PlatformFilter::Sensor) => entity.platform() == Platform::Sensor,
        Some(PlatformFilter::BinarySensor) => entity.platform() == Platform::BinarySensor,
    };
    platform_ok
        && serial.is_none_or(|s| entity.serial.as_deref() == Some(s))
        && (!available || entity.is_available())
}

pub async fn handle(
    profile: ResolvedProfile,
    args: EntitiesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        EntitiesCommand::List {
            platform,
            serial,
            available,
        } => {
            let controller = util::start_controller(profile).await?;
            let entities: Vec<Arc<Entity>> = controller
                .store()
                .snapshot()
                .into_iter()
                .filter(|e| keep(e, platform, serial.as_deref(), available))
                .collect();
            controller.unload().await;

            if let Some(ref serial) = serial {
                if entities.is_empty() {
                    return Err(CliError::NotFound {
                        resource_type: "device".into(),
                        identifier: serial.clone(),
                        list_command: "devices list".into(),
                    });
                }
            }

            let color = output::should_color(global.color);
            let out = output::render_list(
                global.output,
                &entities,
                |e| row(e, color),
                |e| e.entity_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
