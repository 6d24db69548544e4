//! `watch`: run the poller until Ctrl-C and stream what changes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use meraki_core::{Entity, MerakiEvent, OrganizationEventData};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::entities::state_with_unit;
use super::util;

/// One streamed line.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WatchLine<'a> {
    StateChanged {
        entity_id: &'a str,
        old_state: &'a str,
        new_state: &'a str,
        timestamp: DateTime<Utc>,
    },
    Event(&'a MerakiEvent),
    OrganizationEvent(&'a OrganizationEventData),
}

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn print(&self, line: &WatchLine<'_>) {
        let text = match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(line),
            OutputFormat::Yaml => format!("---\n{}", output::render_yaml(line).trim_end()),
            OutputFormat::Table | OutputFormat::Plain => self.text(line),
        };
        output::print_output(&text, self.quiet);
    }

    fn text(&self, line: &WatchLine<'_>) -> String {
        match line {
            WatchLine::StateChanged {
                entity_id,
                old_state,
                new_state,
                timestamp,
            } => format!(
                "{} {entity_id}: {} -> {}",
                clock(*timestamp),
                output::paint_state(old_state, self.color),
                output::paint_state(new_state, self.color),
            ),
            WatchLine::Event(event) => format!(
                "{} {} {} {}={} (was {})",
                clock(event.timestamp),
                output::paint_label(&event.event_type.to_string(), self.color),
                event.device_serial,
                event.sensor_type,
                event.value,
                event.previous_value,
            ),
            WatchLine::OrganizationEvent(event) => format!(
                "{} {} {} {}",
                event.timestamp.as_deref().unwrap_or("-"),
                output::paint_label(event.event_type.as_deref().unwrap_or("event"), self.color),
                event.device_serial.as_deref().unwrap_or("-"),
                event.event_description.as_deref().unwrap_or(""),
            )
            .trim_end()
            .to_owned(),
        }
    }
}

fn clock(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Entities whose displayed state differs from `previous`; updates it.
fn diff_states(
    previous: &mut HashMap<String, String>,
    entities: &[Arc<Entity>],
) -> Vec<(String, String, String)> {
    let mut changes = Vec::new();
    for entity in entities {
        let state = state_with_unit(entity);
        match previous.get(&entity.unique_id) {
            Some(old) if *old == state => {}
            Some(old) => {
                changes.push((entity.entity_id.clone(), old.clone(), state.clone()));
                previous.insert(entity.unique_id.clone(), state);
            }
            None => {
                previous.insert(entity.unique_id.clone(), state);
            }
        }
    }
    changes
}

fn wanted_serial(serials: &[String], serial: Option<&str>) -> bool {
    serials.is_empty() || serial.is_some_and(|s| serials.iter().any(|w| w == s))
}

pub async fn handle(
    profile: ResolvedProfile,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let controller = util::start_controller(profile).await?;
    let printer = Printer {
        format: global.output,
        color: output::should_color(global.color),
        quiet: global.quiet,
    };

    let store = controller.store();
    let mut entities_rx = store.subscribe();
    let mut events = controller.events();
    let mut org_events = controller.organization_events();
    let mut previous: HashMap<String, String> = HashMap::new();
    diff_states(&mut previous, &store.snapshot());

    if !global.quiet {
        eprintln!(
            "Watching {} entities across {} hubs. Press Ctrl-C to stop.",
            store.len(),
            controller.coordinators().await.len()
        );
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("interrupt received, stopping");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if wanted_serial(&args.serial, Some(&event.device_serial)) {
                        printer.print(&WatchLine::Event(&event));
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            event = org_events.recv() => match event {
                Ok(event) => {
                    if wanted_serial(&args.serial, event.device_serial.as_deref()) {
                        printer.print(&WatchLine::OrganizationEvent(&event));
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "organization event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = entities_rx.changed(), if !args.events_only => {
                if changed.is_err() {
                    break;
                }
                let snapshot = entities_rx.borrow_and_update().clone();
                let now = Utc::now();
                for (entity_id, old_state, new_state) in diff_states(&mut previous, &snapshot) {
                    let serial = snapshot
                        .iter()
                        .find(|e| e.entity_id == entity_id)
                        .and_then(|e| e.serial.as_deref());
                    if wanted_serial(&args.serial, serial) {
                        printer.print(&WatchLine::StateChanged {
                            entity_id: &entity_id,
                            old_state: &old_state,
                            new_state: &new_state,
                            timestamp: now,
                        });
                    }
                }
            }
        }
    }

    controller.unload().await;
    Ok(())
}
