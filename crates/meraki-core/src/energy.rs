//! Energy from power samples.
//!
//! MT power meters only report instantaneous real power. Each coordinator
//! keeps an [`EnergyTracker`] that turns consecutive samples into a running
//! kWh total per device with the trapezoidal rule. The total restarts at
//! the first sample of every new local day.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::model::{DeviceReadings, MetricValue, MtMetric};

/// Gaps longer than this are integrated as if they were this long.
const MAX_GAP_SECS: f64 = 3_600.0;
/// Steps at or above this are discarded as implausible.
const MAX_STEP_WH: f64 = 10_000.0;

/// Running daily energy of one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyMeter {
    total_wh: f64,
    last_power_w: Option<f64>,
    last_sample: Option<DateTime<Utc>>,
    day: Option<NaiveDate>,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one power sample taken at `at`. `today` is the local date the
    /// running total belongs to. Samples older than the last one are ignored.
    pub fn add_sample(&mut self, power_w: f64, at: DateTime<Utc>, today: NaiveDate) {
        if self.day != Some(today) {
            if self.total_wh > 0.0 {
                debug!(total_wh = self.total_wh, "daily energy reset");
            }
            self.total_wh = 0.0;
            self.day = Some(today);
        }

        if let (Some(last_power), Some(last_at)) = (self.last_power_w, self.last_sample) {
            if at < last_at {
                return;
            }
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let secs = ((at - last_at).num_milliseconds() as f64 / 1000.0).min(MAX_GAP_SECS);
            let step_wh = (last_power + power_w) * secs / 7_200.0;
            if step_wh > 0.0 && step_wh < MAX_STEP_WH {
                self.total_wh += step_wh;
            }
        }
        self.last_power_w = Some(power_w);
        self.last_sample = Some(at);
    }

    /// Today's total in kWh, three decimals.
    pub fn kwh(&self) -> f64 {
        self.total_wh.round() / 1000.0
    }

    /// The day the running total started.
    pub fn last_reset(&self) -> Option<NaiveDate> {
        self.day
    }
}

/// Energy meters of one hub, keyed by serial.
#[derive(Debug, Default)]
pub struct EnergyTracker {
    meters: DashMap<String, EnergyMeter>,
}

impl EnergyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `realPower_energy` to every device that reports real power.
    ///
    /// The newest reading timestamp of the device is the sample time; a
    /// device without one keeps its current total.
    pub fn integrate(&self, devices: &mut BTreeMap<String, DeviceReadings>, today: NaiveDate) {
        for (serial, readings) in devices.iter_mut() {
            let Some(power_w) = readings
                .metric(MtMetric::RealPower)
                .and_then(MetricValue::as_f64)
            else {
                continue;
            };
            let mut meter = self.meters.entry(serial.clone()).or_default();
            if let Some(at) = readings.timestamp {
                meter.add_sample(power_w, at, today);
            }
            readings.insert(MtMetric::RealPowerEnergy, meter.kwh());
        }
    }

    pub fn meter(&self, serial: &str) -> Option<EnergyMeter> {
        self.meters.get(serial).map(|m| m.clone())
    }
}
