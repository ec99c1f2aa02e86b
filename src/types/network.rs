use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;

use super::common::Selection;

/// WiFi operating mode of the device
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Serialize_repr)]
#[serde(try_from = "Selection")]
#[repr(u8)]
pub enum WifiMode {
    /// Device joins an existing network
    #[default]
    Station = 0,
    /// Device hosts its own network
    AccessPoint = 1,
}

impl TryFrom<Selection> for WifiMode {
    type Error = String;

    fn try_from(value: Selection) -> Result<Self, Self::Error> {
        match value.as_number() {
            Some(0) => Ok(Self::Station),
            Some(1) => Ok(Self::AccessPoint),
            _ => Err(format!("invalid wifi mode: {value}")),
        }
    }
}

/// Network settings of a device configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSettings {
    pub ssid: String,
    pub bssid: String,
    pub wifi_password: String,
    pub mode: WifiMode,
}

/// A single network found by a WiFi scan
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub bssid: String,
    pub rssi: i32,
}

/// Scan snapshot as reported by the device
///
/// `error` is set by the firmware while a scan is still incomplete.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanResult {
    #[serde(default)]
    pub list: Vec<Network>,
    #[serde(default)]
    pub error: bool,
}

impl ScanResult {
    /// Whether the snapshot carries usable results
    pub fn is_complete(&self) -> bool {
        !self.error && !self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_mode_accepts_numbers_and_strings() {
        assert_eq!(
            serde_json::from_str::<WifiMode>("1").unwrap(),
            WifiMode::AccessPoint
        );
        assert_eq!(
            serde_json::from_str::<WifiMode>(r#""0""#).unwrap(),
            WifiMode::Station
        );
        assert!(serde_json::from_str::<WifiMode>("7").is_err());
    }

    #[test]
    fn wifi_mode_serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&WifiMode::AccessPoint).unwrap(),
            "1"
        );
    }

    #[test]
    fn scan_result_defaults_missing_fields() {
        let result: ScanResult = serde_json::from_str(r#"{"error":true}"#).unwrap();
        assert!(result.error);
        assert!(result.list.is_empty());
        assert!(!result.is_complete());

        let result: ScanResult =
            serde_json::from_str(r#"{"list":[{"ssid":"home","bssid":"aa","rssi":-50}]}"#)
                .unwrap();
        assert!(result.is_complete());
    }
}
