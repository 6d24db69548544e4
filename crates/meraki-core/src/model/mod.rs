// ── Domain model ──
//
// Device families, metric keys, reading values, registry records, and
// config entries shared by the hubs, the registry, and the CLI.

pub mod device;
pub mod device_type;
pub mod entry;
pub mod metric;
pub mod readings;

pub use device::{DeviceInfo, MANUFACTURER, ORG_HUB_SUFFIX, dashboard_origin};
pub use device_type::DeviceType;
pub use entry::{ConfigEntry, EntryState};
pub use metric::{Metric, MrMetric, MsMetric, MtMetric, OrgMetric};
pub use readings::{DeviceReadings, MetricValue};
