// ── Capability filter ──
//
// Which metrics a device can report, from its model number and from what it
// has actually reported. Used to decide whether an entity is worth creating.

use std::collections::BTreeSet;

use strum::IntoEnumIterator;
use tracing::debug;

use crate::model::{DeviceReadings, DeviceType, Metric, MrMetric, MsMetric, MtMetric};

/// Payloads with at least this many readings are trusted to be complete.
const SUBSTANTIAL_READINGS: usize = 3;

/// Metrics still created when a substantial payload omits them.
const CRITICAL_METRICS: [&str; 4] = ["temperature", "humidity", "battery", "realPower"];

/// Switch families that supply PoE.
const POE_SWITCH_FAMILIES: [&str; 6] = ["MS120", "MS125", "MS210", "MS220", "MS225", "MS250"];

const MS_POE_METRICS: [MsMetric; 3] = [MsMetric::PoePower, MsMetric::PoePorts, MsMetric::PoeLimit];

fn mt_model_metrics(family: &str) -> &'static [MtMetric] {
    use MtMetric::{
        ApparentPower, Battery, Button, Co2, Current, Door, Frequency, Humidity, IndoorAirQuality,
        Noise, Pm25, PowerFactor, RealPower, RealPowerEnergy, Temperature, Tvoc, Voltage, Water,
    };
    match family {
        "MT10" => &[Temperature, Humidity],
        "MT11" => &[Temperature],
        "MT12" => &[Water],
        "MT14" => &[Temperature, Humidity, Pm25, Tvoc, Noise],
        "MT15" => &[
            Temperature,
            Humidity,
            Co2,
            Pm25,
            Tvoc,
            Noise,
            IndoorAirQuality,
        ],
        "MT20" | "MT21" => &[Temperature, Humidity, Button, Door, Battery],
        "MT30" => &[Button],
        "MT40" => &[
            RealPower,
            RealPowerEnergy,
            ApparentPower,
            Current,
            Voltage,
            Frequency,
            PowerFactor,
        ],
        _ => &[],
    }
}

/// Model family without the hardware suffix: `MS120-8LP` → `MS120`.
fn model_family(model: &str) -> &str {
    model.split('-').next().unwrap_or(model)
}

/// Metrics a model is documented to report.
pub fn static_capabilities(model: &str) -> BTreeSet<&'static str> {
    let Some(device_type) = DeviceType::from_model(model) else {
        return BTreeSet::new();
    };
    let keys = |m: Metric| m.key();

    match device_type {
        DeviceType::Mt => mt_model_metrics(model_family(model))
            .iter()
            .map(|&m| keys(m.into()))
            .collect(),
        DeviceType::Mr => MrMetric::iter().map(|m| keys(m.into())).collect(),
        DeviceType::Ms => {
            let poe = POE_SWITCH_FAMILIES.iter().any(|f| model.contains(f));
            MsMetric::iter()
                .filter(|m| poe || !MS_POE_METRICS.contains(m))
                .map(|m| keys(m.into()))
                .collect()
        }
        DeviceType::Mv => BTreeSet::new(),
    }
}

/// Metrics present in a reading payload.
pub fn discover_from_readings(readings: Option<&DeviceReadings>) -> BTreeSet<&'static str> {
    readings.map(|r| r.keys().collect()).unwrap_or_default()
}

/// Everything a device is known to report: documented plus observed.
pub fn capabilities_for(model: &str, readings: Option<&DeviceReadings>) -> BTreeSet<&'static str> {
    let mut caps = static_capabilities(model);
    caps.extend(discover_from_readings(readings));
    caps
}

/// Observed metrics when there are any, else the documented ones.
fn supported_metrics(model: &str, readings: Option<&DeviceReadings>) -> BTreeSet<&'static str> {
    let observed = discover_from_readings(readings);
    if observed.is_empty() {
        static_capabilities(model)
    } else {
        observed
    }
}

/// Decide whether `metric` deserves an entity on a device of `model`.
///
/// Observed data wins over the model table, except that a few critical
/// metrics survive a temporary gap in otherwise complete payloads.
pub fn should_create_entity(metric: &str, model: &str, readings: Option<&DeviceReadings>) -> bool {
    let supported = supported_metrics(model, readings);
    if !supported.contains(metric) {
        return false;
    }

    let Some(readings) = readings.filter(|r| !r.is_empty()) else {
        return true;
    };

    if readings.len() < SUBSTANTIAL_READINGS {
        debug!(
            model,
            metric,
            count = readings.len(),
            "limited readings, creating entity"
        );
        return true;
    }

    if readings.contains(metric) {
        return true;
    }

    let critical = CRITICAL_METRICS.contains(&metric);
    debug!(
        model,
        metric, critical, "metric missing from a complete payload"
    );
    critical
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn readings(metrics: &[MtMetric]) -> DeviceReadings {
        let mut r = DeviceReadings::new();
        for &m in metrics {
            r.insert(m, 1.0);
        }
        r
    }

    #[test]
    fn mt_table_by_family() {
        let caps = static_capabilities("MT15");
        assert!(caps.contains("indoorAirQuality"));
        assert!(caps.contains("co2"));
        assert!(!caps.contains("water"));

        assert_eq!(
            static_capabilities("MT12").into_iter().collect::<Vec<_>>(),
            vec!["water"]
        );
        assert!(static_capabilities("MT99").is_empty());
        assert!(static_capabilities("Z3").is_empty());
    }

    #[test]
    fn poe_switches_get_poe_metrics() {
        let poe = static_capabilities("MS120-8LP");
        assert!(poe.contains("poe_power"));
        assert!(poe.contains("port_count"));

        let plain = static_capabilities("MS350-24X");
        assert!(!plain.contains("poe_power"));
        assert!(plain.contains("port_utilization"));
    }

    #[test]
    fn union_of_static_and_observed() {
        let r = readings(&[MtMetric::Co2]);
        let caps = capabilities_for("MT10", Some(&r));
        assert_eq!(
            caps.into_iter().collect::<Vec<_>>(),
            vec!["co2", "humidity", "temperature"]
        );
    }

    #[test]
    fn without_readings_model_table_decides() {
        assert!(should_create_entity("temperature", "MT10", None));
        assert!(!should_create_entity("co2", "MT10", None));
        assert!(should_create_entity(
            "humidity",
            "MT10",
            Some(&DeviceReadings::new())
        ));
    }

    #[test]
    fn observed_metrics_replace_the_table() {
        let r = readings(&[MtMetric::Temperature, MtMetric::Humidity]);
        assert!(should_create_entity("temperature", "MT99", Some(&r)));
        assert!(!should_create_entity("co2", "MT15", Some(&r)));
    }

    #[test]
    fn complete_payload_present_metric() {
        let r = readings(&[MtMetric::Temperature, MtMetric::Humidity, MtMetric::Tvoc]);
        assert!(should_create_entity("tvoc", "MT14", Some(&r)));
        assert!(should_create_entity("humidity", "MT14", Some(&r)));
        assert!(!should_create_entity("noise", "MT14", Some(&r)));
    }
}
