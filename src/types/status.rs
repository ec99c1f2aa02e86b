use serde::{Deserialize, Serialize};

use super::common::Selection;

/// Read-only telemetry snapshot reported by the device
///
/// The same fields are echoed in the configuration file, so this type is
/// also decoded from configuration objects when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceStatus {
    #[serde(rename = "chipid")]
    pub chip_id: Selection,
    #[serde(rename = "cpu")]
    pub cpu_mhz: u32,
    #[serde(rename = "heap")]
    pub heap_bytes_free: u64,
    #[serde(rename = "availsize")]
    pub flash_bytes_free: u64,
    #[serde(rename = "availspiffs")]
    pub filesystem_bytes_free: u64,
    #[serde(rename = "spiffssize")]
    pub filesystem_bytes_total: u64,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub netmask: String,
    #[serde(default)]
    pub dns: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub ssid: String,
}
