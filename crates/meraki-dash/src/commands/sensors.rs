//! One-shot MT sensor reads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use meraki_api::models::SensorReadings;
use meraki_core::entity::description;
use meraki_core::transform::transform_mt_readings;
use meraki_core::{DeviceType, MetricValue};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, SensorsArgs, SensorsCommand};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Latest readings of one sensor, after transformation.
#[derive(Debug, Serialize)]
struct SensorView {
    serial: String,
    name: Option<String>,
    network_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    readings: Vec<MetricReading>,
}

#[derive(Debug, Serialize)]
struct MetricReading {
    metric: &'static str,
    value: MetricValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
}

fn unit_for(key: &str) -> Option<&'static str> {
    description::all()
        .iter()
        .find(|d| d.key() == key)
        .and_then(|d| d.unit)
}

fn view(sensor: &SensorReadings, names: &HashMap<String, String>) -> SensorView {
    let readings = transform_mt_readings(sensor);
    SensorView {
        serial: sensor.serial.clone(),
        name: names.get(&sensor.serial).cloned(),
        network_id: sensor.network.as_ref().map(|n| n.id.clone()),
        timestamp: readings.timestamp,
        readings: readings
            .values
            .iter()
            .map(|(&metric, value)| MetricReading {
                metric,
                value: value.clone(),
                unit: unit_for(metric),
            })
            .collect(),
    }
}

fn rows(views: &[SensorView]) -> Vec<ReadingRow> {
    views
        .iter()
        .flat_map(|v| {
            v.readings.iter().map(|r| ReadingRow {
                serial: v.serial.clone(),
                name: util::or_dash(v.name.as_deref()),
                metric: r.metric.to_owned(),
                value: match r.unit {
                    Some(unit) => format!("{} {unit}", r.value),
                    None => r.value.to_string(),
                },
            })
        })
        .collect()
}

pub async fn handle(
    profile: &ResolvedProfile,
    args: SensorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SensorsCommand::Read { serial } => {
            let session = util::connect(profile).await?;
            let (readings, devices) = tokio::try_join!(
                session
                    .client
                    .get_organization_sensor_readings_latest(&session.org_id, &serial),
                session.client.get_organization_devices(&session.org_id),
            )?;

            let names: HashMap<String, String> = devices
                .into_iter()
                .filter(|d| DeviceType::Mt.matches_model(&d.model))
                .filter_map(|d| d.name.map(|name| (d.serial, name)))
                .collect();

            if let Some(missing) = serial
                .iter()
                .find(|s| !readings.iter().any(|r| &r.serial == *s))
            {
                return Err(CliError::NotFound {
                    resource_type: "sensor".into(),
                    identifier: missing.clone(),
                    list_command: "devices list --type mt".into(),
                });
            }

            let mut views: Vec<SensorView> = readings.iter().map(|r| view(r, &names)).collect();
            views.sort_by(|a, b| a.serial.cmp(&b.serial));

            let out = output::render_single(
                global.output,
                &views,
                |views| output::render_table(&rows(views)),
                |views| {
                    views
                        .iter()
                        .map(|v| v.serial.clone())
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sensor() -> SensorReadings {
        serde_json::from_value(json!({
            "serial": "Q2MT-0000-0001",
            "network": { "id": "N_1", "name": "HQ" },
            "readings": [
                {
                    "ts": "2024-05-01T10:00:00Z",
                    "metric": "temperature",
                    "temperature": { "celsius": 4.5, "fahrenheit": 40.1 }
                },
                {
                    "ts": "2024-05-01T10:00:00Z",
                    "metric": "door",
                    "door": { "open": true }
                },
                { "ts": "2024-05-01T10:00:00Z", "metric": "somethingNew" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn view_names_and_units() {
        let names = HashMap::from([("Q2MT-0000-0001".to_owned(), "Fridge".to_owned())]);
        let view = view(&sensor(), &names);
        assert_eq!(view.name.as_deref(), Some("Fridge"));
        assert_eq!(view.network_id.as_deref(), Some("N_1"));
        assert!(view.timestamp.is_some());
        assert_eq!(view.readings.len(), 2);

        let temperature = view
            .readings
            .iter()
            .find(|r| r.metric == "temperature")
            .unwrap();
        assert_eq!(temperature.unit, Some("°C"));
    }

    #[test]
    fn one_row_per_reading() {
        let views = vec![view(&sensor(), &HashMap::new())];
        let rows = rows(&views);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.name == "-"));
    }
}
