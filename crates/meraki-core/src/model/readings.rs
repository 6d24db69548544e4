// ── Reading values ──

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::metric::Metric;

/// A single metric value as reported or derived from a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            Self::Int(v) => Some(*v as f64),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Truthiness for binary sensors: `true`, or the integer `1`.
    pub fn is_on(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(v) => *v == 1,
            #[allow(clippy::float_cmp)]
            Self::Float(v) => *v == 1.0,
            Self::Text(s) => s.eq_ignore_ascii_case("true") || s == "1",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Bool(v) => serde_json::Value::from(*v),
            Self::Text(v) => serde_json::Value::from(v.as_str()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(true) => f.write_str("on"),
            Self::Bool(false) => f.write_str("off"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

// ── DeviceReadings ───────────────────────────────────────────────────

/// Latest values for one device, keyed by metric key in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceReadings {
    pub values: IndexMap<&'static str, MetricValue>,
    /// When the newest reading was taken, if the payload said.
    pub timestamp: Option<DateTime<Utc>>,
}

impl DeviceReadings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric: impl Into<Metric>, value: impl Into<MetricValue>) {
        self.values.insert(metric.into().key(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.values.get(key)
    }

    pub fn metric(&self, metric: impl Into<Metric>) -> Option<&MetricValue> {
        self.values.get(metric.into().key())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep the newest of the current and the given timestamp.
    pub fn observe_timestamp(&mut self, ts: DateTime<Utc>) {
        if self.timestamp.is_none_or(|current| ts > current) {
            self.timestamp = Some(ts);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{MsMetric, MtMetric};

    #[test]
    fn insert_by_metric_lookup_by_key() {
        let mut readings = DeviceReadings::new();
        readings.insert(MtMetric::Temperature, 21.5);
        readings.insert(MsMetric::PortCount, 24_usize);

        assert_eq!(readings.get("temperature"), Some(&MetricValue::Float(21.5)));
        assert_eq!(
            readings.metric(MsMetric::PortCount),
            Some(&MetricValue::Int(24))
        );
        assert_eq!(
            readings.keys().collect::<Vec<_>>(),
            vec!["temperature", "port_count"]
        );
    }

    #[test]
    fn binary_truthiness() {
        assert!(MetricValue::Bool(true).is_on());
        assert!(MetricValue::Int(1).is_on());
        assert!(!MetricValue::Int(0).is_on());
        assert!(!MetricValue::Text("closed".into()).is_on());
    }

    #[test]
    fn keeps_newest_timestamp() {
        let older = "2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let newer = "2024-05-01T10:05:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut readings = DeviceReadings::new();
        readings.observe_timestamp(newer);
        readings.observe_timestamp(older);
        assert_eq!(readings.timestamp, Some(newer));
    }

    #[test]
    fn serializes_untagged() {
        let mut readings = DeviceReadings::new();
        readings.insert(MtMetric::Door, true);
        let json = serde_json::to_value(&readings).unwrap();
        assert_eq!(json["values"]["door"], serde_json::json!(true));
    }
}
