//! Last-known device configuration and the full-replacement save path

use crate::{
    Error, Result,
    backup::ConfirmedRestore,
    protocol::{Message, Request},
    transport::DeviceTransport,
    types::{DeviceConfig, WifiMode},
};
use log::{debug, info};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct ConfigStore {
    /// Object exactly as last fetched or saved, for byte-identical backups
    raw: Option<Value>,
    config: Option<DeviceConfig>,
}

impl ConfigStore {
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Fetch the configuration
    ///
    /// Returns `None` when the transport delivers the reply later (push); it
    /// is then recorded through [`ConfigStore::apply`].
    pub async fn load<T: DeviceTransport>(&mut self, transport: &T) -> Result<Option<&DeviceConfig>> {
        debug!("loading configuration");

        match transport
            .request(Request::GetConfig)
            .await
            .map_err(Error::Transport)?
        {
            Some(Message::ConfigFile { raw, config }) => Ok(Some(self.apply(raw, config))),
            Some(other) => Err(Error::Parse(format!(
                "unexpected {} reply to configuration request",
                other.command()
            ))),
            None => Ok(None),
        }
    }

    /// Record a configuration received from the device
    pub fn apply(&mut self, raw: Value, config: DeviceConfig) -> &DeviceConfig {
        info!(
            "configuration of {} with {} channels and {} shutters",
            config.hostname, config.layout.channels, config.layout.shutters
        );
        self.raw = Some(raw);
        self.config.insert(config)
    }

    /// Submit the whole configuration as a replacement
    ///
    /// Validation happens before anything is sent. Transport failures are
    /// returned as they are, without retry.
    pub async fn save<T: DeviceTransport>(&mut self, transport: &T, config: &DeviceConfig) -> Result<()> {
        self.validate_submission(config)?;
        let raw = config.to_value()?;

        self.submit(transport, raw, config.clone()).await
    }

    /// Send a confirmed backup through the same path as [`ConfigStore::save`]
    pub async fn restore<T: DeviceTransport>(
        &mut self,
        transport: &T,
        restore: ConfirmedRestore,
    ) -> Result<()> {
        let (raw, config) = restore.into_parts();
        self.validate_submission(&config)?;

        self.submit(transport, raw, config).await
    }

    pub fn clear(&mut self) {
        self.raw = None;
        self.config = None;
    }

    async fn submit<T: DeviceTransport>(
        &mut self,
        transport: &T,
        raw: Value,
        config: DeviceConfig,
    ) -> Result<()> {
        info!("submitting configuration of {}", config.hostname);

        transport
            .request(Request::SaveConfig(raw.clone()))
            .await
            .map_err(Error::Transport)?;

        self.apply(raw, config);
        Ok(())
    }

    fn validate_submission(&self, config: &DeviceConfig) -> Result<()> {
        if config.admin_password.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Validation(
                "administrator password cannot be empty".to_string(),
            ));
        }

        if config.network.mode == WifiMode::Station {
            if config.network.ssid.is_empty() {
                return Err(Error::Validation(
                    "station mode requires an SSID".to_string(),
                ));
            }
            if config.layout.wifi_mode && config.network.bssid.is_empty() {
                return Err(Error::Validation(
                    "station mode requires a BSSID".to_string(),
                ));
            }
        }

        config.check_layout()?;

        if let Some(current) = &self.config {
            let (expected, actual) = (current.layout, config.layout);
            if (expected.channels, expected.shutters) != (actual.channels, actual.shutters) {
                return Err(Error::Validation(format!(
                    "device has {} channels and {} shutters, configuration has {} and {}",
                    expected.channels, expected.shutters, actual.channels, actual.shutters
                )));
            }
        }

        Ok(())
    }
}
