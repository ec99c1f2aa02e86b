use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_valid::Validate;

use super::{
    common::Selection,
    network::{NetworkSettings, WifiMode},
};
use crate::{Error, Result};

/// Discriminator of configuration objects, on the wire and in backup files
pub const CONFIG_COMMAND: &str = "configfile";

/// One controllable output (relay) definition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Selection,
    pub pin: Selection,
}

/// Paired open/close definition for a motorized cover
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShutterConfig {
    #[serde(rename = "open")]
    pub open_pin: Selection,
    #[serde(rename = "close")]
    pub close_pin: Selection,
    pub pin: Selection,
}

/// Shape of the configuration schema of one firmware build
///
/// Negotiated from the keys the device reports, never assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Validate)]
pub struct Layout {
    #[validate(minimum = 1)]
    #[validate(maximum = 8)]
    pub channels: usize,
    #[validate(maximum = 3)]
    pub shutters: usize,
    /// Firmware reports `wifimode` and `bssid`
    pub wifi_mode: bool,
    /// `wifimode` arrived as a numeric string and is written back as one
    pub wifi_mode_as_text: bool,
}

impl Layout {
    /// Derive the layout from the keys of a raw configuration object
    pub fn negotiate(raw: &Map<String, Value>) -> Result<Self> {
        let layout = Self {
            channels: count_slots(raw, "relay"),
            shutters: count_slots(raw, "mask"),
            wifi_mode: raw.contains_key("wifimode"),
            wifi_mode_as_text: raw.get("wifimode").is_some_and(Value::is_string),
        };

        layout
            .validate()
            .map_err(|e| Error::Parse(format!("unsupported configuration layout: {e}")))?;

        Ok(layout)
    }
}

/// Full persisted configuration of the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub hostname: String,
    pub admin_password: Option<String>,
    pub network: NetworkSettings,
    pub channels: Vec<ChannelConfig>,
    pub shutters: Vec<ShutterConfig>,
    pub layout: Layout,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    hostname: String,
    #[serde(default, rename = "adminpwd")]
    admin_password: Option<String>,
    #[serde(default)]
    ssid: Option<String>,
    #[serde(default)]
    bssid: Option<String>,
    #[serde(default, rename = "wifipwd")]
    wifi_password: Option<String>,
    #[serde(default, rename = "wifimode")]
    mode: Option<WifiMode>,
}

impl DeviceConfig {
    /// Decode a raw configuration object as sent by the device
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(Error::Parse("configuration is not a JSON object".to_string()));
        };

        let layout = Layout::negotiate(map)?;

        let header = Header::deserialize(raw)
            .map_err(|e| Error::Parse(format!("invalid configuration: {e}")))?;

        let channels = (1..=layout.channels)
            .map(|n| slot::<ChannelConfig>(map, "relay", n))
            .collect::<Result<Vec<_>>>()?;
        let shutters = (1..=layout.shutters)
            .map(|n| slot::<ShutterConfig>(map, "mask", n))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            hostname: header.hostname,
            admin_password: header.admin_password,
            network: NetworkSettings {
                ssid: header.ssid.unwrap_or_default(),
                bssid: header.bssid.unwrap_or_default(),
                wifi_password: header.wifi_password.unwrap_or_default(),
                mode: header.mode.unwrap_or_default(),
            },
            channels,
            shutters,
            layout,
        })
    }

    /// Encode the complete configuration object for submission
    ///
    /// Fails if the channel or shutter collections do not match the
    /// negotiated layout: they are never truncated or padded.
    pub fn to_value(&self) -> Result<Value> {
        self.check_layout()?;

        let mut map = Map::new();
        map.insert("command".into(), CONFIG_COMMAND.into());
        map.insert("hostname".into(), self.hostname.clone().into());
        map.insert(
            "adminpwd".into(),
            self.admin_password.clone().unwrap_or_default().into(),
        );
        map.insert("ssid".into(), self.network.ssid.clone().into());
        if self.layout.wifi_mode {
            map.insert("bssid".into(), self.network.bssid.clone().into());
            let mode = if self.layout.wifi_mode_as_text {
                Value::String((self.network.mode as u8).to_string())
            } else {
                encode(&self.network.mode)?
            };
            map.insert("wifimode".into(), mode);
        }
        map.insert("wifipwd".into(), self.network.wifi_password.clone().into());

        for (index, channel) in self.channels.iter().enumerate() {
            map.insert(format!("relay{}", index + 1), encode(channel)?);
        }
        for (index, shutter) in self.shutters.iter().enumerate() {
            map.insert(format!("mask{}", index + 1), encode(shutter)?);
        }

        Ok(Value::Object(map))
    }

    /// Ensure the collections have exactly the negotiated length
    pub fn check_layout(&self) -> Result<()> {
        if self.channels.len() != self.layout.channels {
            return Err(Error::Validation(format!(
                "expected {} channels, got {}",
                self.layout.channels,
                self.channels.len()
            )));
        }
        if self.shutters.len() != self.layout.shutters {
            return Err(Error::Validation(format!(
                "expected {} shutters, got {}",
                self.layout.shutters,
                self.shutters.len()
            )));
        }
        Ok(())
    }
}

fn count_slots(map: &Map<String, Value>, prefix: &str) -> usize {
    (1..)
        .take_while(|n| map.contains_key(&format!("{prefix}{n}")))
        .count()
}

fn slot<T: for<'de> Deserialize<'de>>(map: &Map<String, Value>, prefix: &str, n: usize) -> Result<T> {
    let key = format!("{prefix}{n}");
    let value = map
        .get(&key)
        .ok_or_else(|| Error::Parse(format!("missing {key}")))?;

    T::deserialize(value).map_err(|e| Error::Parse(format!("invalid {key}: {e}")))
}

fn encode(value: &impl Serialize) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Parse(format!("failed to encode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_config(channels: usize, shutters: usize) -> Value {
        let mut map = Map::new();
        map.insert("command".into(), "configfile".into());
        map.insert("hostname".into(), "relay-board".into());
        map.insert("adminpwd".into(), "admin".into());
        map.insert("ssid".into(), "home".into());
        map.insert("wifipwd".into(), "secret".into());
        for n in 1..=channels {
            map.insert(format!("relay{n}"), json!({"type": "0", "pin": "12"}));
        }
        for n in 1..=shutters {
            map.insert(format!("mask{n}"), json!({"open": 1, "close": 2, "pin": 14}));
        }
        Value::Object(map)
    }

    mod layout {
        use super::*;

        #[test]
        fn counts_contiguous_slots() {
            let config = DeviceConfig::from_value(&raw_config(5, 3)).unwrap();

            assert_eq!(config.layout.channels, 5);
            assert_eq!(config.layout.shutters, 3);
            assert!(!config.layout.wifi_mode);
            assert_eq!(config.channels.len(), 5);
            assert_eq!(config.shutters.len(), 3);
        }

        #[test]
        fn stops_at_first_gap() {
            let mut raw = raw_config(4, 0);
            raw["relay6"] = json!({"type": 0, "pin": 5});

            let config = DeviceConfig::from_value(&raw).unwrap();
            assert_eq!(config.layout.channels, 4);
        }

        #[test]
        fn rejects_configuration_without_channels() {
            let result = DeviceConfig::from_value(&raw_config(0, 0));
            assert!(matches!(result, Err(Error::Parse(_))));
        }

        #[test]
        fn rejects_too_many_shutters() {
            let result = DeviceConfig::from_value(&raw_config(8, 4));
            assert!(matches!(result, Err(Error::Parse(_))));
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn reads_network_and_channels() {
            let mut raw = raw_config(8, 0);
            raw["wifimode"] = json!("1");
            raw["bssid"] = json!("AA:BB:CC:DD:EE:FF");
            raw["relay2"] = json!({"name": "Pump", "type": 1, "pin": 4});

            let config = DeviceConfig::from_value(&raw).unwrap();

            assert_eq!(config.hostname, "relay-board");
            assert_eq!(config.admin_password.as_deref(), Some("admin"));
            assert_eq!(config.network.mode, WifiMode::AccessPoint);
            assert_eq!(config.network.bssid, "AA:BB:CC:DD:EE:FF");
            assert!(config.layout.wifi_mode);
            assert_eq!(config.channels[1].name.as_deref(), Some("Pump"));
            assert_eq!(config.channels[1].pin, Selection::Number(4));
            assert_eq!(config.channels[0].kind, Selection::from("0"));
        }

        #[test]
        fn null_admin_password_is_missing() {
            let mut raw = raw_config(4, 0);
            raw["adminpwd"] = Value::Null;

            let config = DeviceConfig::from_value(&raw).unwrap();
            assert_eq!(config.admin_password, None);
        }

        #[test]
        fn rejects_malformed_channel() {
            let mut raw = raw_config(4, 0);
            raw["relay3"] = json!({"type": 0});

            let result = DeviceConfig::from_value(&raw);
            assert!(
                matches!(result, Err(Error::Parse(msg)) if msg.contains("relay3"))
            );
        }

        #[test]
        fn accepts_empty_hostname() {
            let mut raw = raw_config(4, 0);
            raw["hostname"] = json!("");

            let config = DeviceConfig::from_value(&raw).unwrap();
            assert!(config.hostname.is_empty());
            assert_eq!(DeviceConfig::from_value(&config.to_value().unwrap()).unwrap(), config);
        }
    }

    mod encode {
        use super::*;

        #[test]
        fn writes_exactly_the_negotiated_slots() {
            let config = DeviceConfig::from_value(&raw_config(4, 1)).unwrap();
            let value = config.to_value().unwrap();
            let map = value.as_object().unwrap();

            assert_eq!(map["command"], "configfile");
            assert!(map.contains_key("relay4"));
            assert!(!map.contains_key("relay5"));
            assert!(map.contains_key("mask1"));
            assert!(!map.contains_key("mask2"));
            assert!(!map.contains_key("wifimode"));
            assert!(!map.contains_key("bssid"));
        }

        #[test]
        fn emits_wifi_mode_when_supported() {
            let mut raw = raw_config(4, 0);
            raw["wifimode"] = json!(0);
            raw["bssid"] = json!("AA");

            let value = DeviceConfig::from_value(&raw).unwrap().to_value().unwrap();
            assert_eq!(value["wifimode"], json!(0));
            assert_eq!(value["bssid"], json!("AA"));
        }

        #[test]
        fn keeps_wifi_mode_wire_form() {
            let mut raw = raw_config(4, 0);
            raw["wifimode"] = json!("1");
            raw["bssid"] = json!("");

            let config = DeviceConfig::from_value(&raw).unwrap();
            assert!(config.layout.wifi_mode_as_text);
            assert_eq!(config.to_value().unwrap()["wifimode"], json!("1"));

            raw["wifimode"] = json!(1);
            let config = DeviceConfig::from_value(&raw).unwrap();
            assert_eq!(config.to_value().unwrap()["wifimode"], json!(1));
        }

        #[test]
        fn refuses_padded_channels() {
            let mut config = DeviceConfig::from_value(&raw_config(4, 0)).unwrap();
            config.channels.push(ChannelConfig::default());

            assert!(matches!(config.to_value(), Err(Error::Validation(_))));
        }

        #[test]
        fn decode_of_encoded_is_identity() {
            let config = DeviceConfig::from_value(&raw_config(5, 2)).unwrap();
            let decoded = DeviceConfig::from_value(&config.to_value().unwrap()).unwrap();

            assert_eq!(config, decoded);
        }
    }
}
