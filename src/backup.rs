//! Backup files of the device configuration
//!
//! A backup is the configuration object exactly as the device last reported
//! or accepted it, pretty printed. Restoring goes through a two-step
//! [`PendingRestore`] so nothing is sent without explicit confirmation.

use crate::{
    Error, Result,
    types::{CONFIG_COMMAND, DeviceConfig},
};
use log::{debug, info};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Serialized backup ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub file_name: String,
    pub contents: String,
}

impl BackupFile {
    /// Write the backup into `dir`, returning the full path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.contents)?;
        info!("backup written to {}", path.display());
        Ok(path)
    }
}

/// Decoded backup awaiting user confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRestore {
    raw: Value,
    config: DeviceConfig,
}

impl PendingRestore {
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn confirm(self) -> ConfirmedRestore {
        info!("restore of {} confirmed", self.config.hostname);
        ConfirmedRestore {
            raw: self.raw,
            config: self.config,
        }
    }

    pub fn discard(self) {
        debug!("restore of {} discarded", self.config.hostname);
    }
}

/// Backup the user agreed to send
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedRestore {
    raw: Value,
    config: DeviceConfig,
}

impl ConfirmedRestore {
    pub(crate) fn into_parts(self) -> (Value, DeviceConfig) {
        (self.raw, self.config)
    }
}

pub struct BackupCodec;

impl BackupCodec {
    const FALLBACK_NAME: &str = "device";

    pub fn export(raw: &Value) -> Result<BackupFile> {
        let hostname = raw
            .get("hostname")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(Self::FALLBACK_NAME);

        let contents = serde_json::to_string_pretty(raw)
            .map_err(|e| Error::Parse(format!("failed to serialize backup: {e}")))?;

        Ok(BackupFile {
            file_name: format!("{hostname}-settings.json"),
            contents,
        })
    }

    pub fn import(bytes: &[u8]) -> Result<PendingRestore> {
        let raw: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::Parse(format!("backup is not valid JSON: {e}")))?;

        if raw.get("command").and_then(Value::as_str) != Some(CONFIG_COMMAND) {
            return Err(Error::SchemaMismatch);
        }

        let config = DeviceConfig::from_value(&raw)?;
        Ok(PendingRestore { raw, config })
    }

    pub fn import_path(path: &Path) -> Result<PendingRestore> {
        debug!("reading backup {}", path.display());
        let bytes = fs::read(path)?;
        Self::import(&bytes)
    }
}
