//! Mapping between raw device configuration and editable form state
//!
//! Slots are matched by position, never by name: channel `i` of the form
//! always edits `relay{i+1}` of the device.

use crate::types::{
    ChannelConfig, DeviceConfig, Layout, Network, NetworkSettings, Selection, ShutterConfig,
    WifiMode,
};

/// Label shown for a channel the device did not name
pub fn default_channel_label(index: usize) -> String {
    format!("Relay {}", index + 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableChannel {
    pub name: String,
    pub kind: Selection,
    pub pin: Selection,
    supplied_name: Option<String>,
}

/// Which network inputs the renderer shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub ssid: bool,
    pub bssid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableNetwork {
    pub ssid: String,
    pub bssid: String,
    pub wifi_password: String,
    mode: WifiMode,
    visibility: Visibility,
}

impl EditableNetwork {
    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

/// Form state of one device configuration
///
/// Collections keep the length of the negotiated layout; there is no way to
/// add or remove slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableConfig {
    pub hostname: String,
    pub admin_password: Option<String>,
    pub network: EditableNetwork,
    channels: Vec<EditableChannel>,
    shutters: Vec<ShutterConfig>,
    layout: Layout,
}

/// Materialize a device configuration into editable state
pub fn reconcile(config: &DeviceConfig, selection: Option<&Network>) -> EditableConfig {
    let channels = config
        .channels
        .iter()
        .enumerate()
        .map(|(index, channel)| EditableChannel {
            name: channel
                .name
                .clone()
                .unwrap_or_else(|| default_channel_label(index)),
            kind: channel.kind.clone(),
            pin: channel.pin.clone(),
            supplied_name: channel.name.clone(),
        })
        .collect();

    let mut editable = EditableConfig {
        hostname: config.hostname.clone(),
        admin_password: config.admin_password.clone(),
        network: EditableNetwork {
            ssid: config.network.ssid.clone(),
            bssid: config.network.bssid.clone(),
            wifi_password: config.network.wifi_password.clone(),
            mode: config.network.mode,
            visibility: Visibility::default(),
        },
        channels,
        shutters: config.shutters.clone(),
        layout: config.layout,
    };
    editable.set_mode(config.network.mode, selection);
    editable
}

impl EditableConfig {
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn channels(&self) -> &[EditableChannel] {
        &self.channels
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut EditableChannel> {
        self.channels.get_mut(index)
    }

    pub fn shutters(&self) -> &[ShutterConfig] {
        &self.shutters
    }

    pub fn shutter_mut(&mut self, index: usize) -> Option<&mut ShutterConfig> {
        self.shutters.get_mut(index)
    }

    /// Switch WiFi mode and recompute which network inputs are shown
    pub fn set_mode(&mut self, mode: WifiMode, selection: Option<&Network>) {
        let network = &mut self.network;
        network.mode = mode;

        match mode {
            WifiMode::AccessPoint => {
                network.ssid.clear();
                network.bssid.clear();
                network.visibility = Visibility {
                    ssid: false,
                    bssid: false,
                };
            }
            WifiMode::Station => {
                network.visibility = Visibility {
                    ssid: true,
                    bssid: self.layout.wifi_mode,
                };
            }
        }

        if let Some(selected) = selection {
            self.select_network(selected);
        }
    }

    /// Take SSID and BSSID from a scanned network, always as a pair
    pub fn select_network(&mut self, selected: &Network) {
        if self.network.mode != WifiMode::Station {
            return;
        }
        self.network.ssid = selected.ssid.clone();
        if self.layout.wifi_mode {
            self.network.bssid = selected.bssid.clone();
        }
    }

    /// Map the form back onto a complete device configuration
    pub fn to_config(&self) -> DeviceConfig {
        let channels = self
            .channels
            .iter()
            .enumerate()
            .map(|(index, channel)| ChannelConfig {
                name: (channel.supplied_name.is_some()
                    || channel.name != default_channel_label(index))
                .then(|| channel.name.clone()),
                kind: channel.kind.clone(),
                pin: channel.pin.clone(),
            })
            .collect();

        DeviceConfig {
            hostname: self.hostname.clone(),
            admin_password: self.admin_password.clone(),
            network: NetworkSettings {
                ssid: self.network.ssid.clone(),
                bssid: self.network.bssid.clone(),
                wifi_password: self.network.wifi_password.clone(),
                mode: self.network.mode,
            },
            channels,
            shutters: self.shutters.clone(),
            layout: self.layout,
        }
    }
}
