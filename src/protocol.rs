//! Messages exchanged with the device
//!
//! Every payload is tagged by its `command` field. Inbound payloads are
//! decoded into [`Message`] and validated; unknown commands and malformed
//! shapes are rejected with a [`DecodeError`].

use crate::types::{CONFIG_COMMAND, DeviceConfig, DeviceStatus, ScanResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Requests the client can issue, independent of the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetConfig,
    Status,
    ScanWifi,
    /// Full replacement of the device configuration
    SaveConfig(Value),
}

/// Command-only frames sent over the push connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
enum Outbound {
    GetConf,
    Status,
    Scan,
}

impl Request {
    /// Encode the request as a push frame
    pub fn to_frame(&self) -> serde_json::Result<String> {
        match self {
            Self::GetConfig => serde_json::to_string(&Outbound::GetConf),
            Self::Status => serde_json::to_string(&Outbound::Status),
            Self::ScanWifi => serde_json::to_string(&Outbound::Scan),
            Self::SaveConfig(config) => serde_json::to_string(config),
        }
    }
}

/// Device payloads the client understands
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SsidList(ScanResult),
    ConfigFile { raw: Value, config: DeviceConfig },
    Status(DeviceStatus),
    /// Channel state change, forwarded untouched to the renderer
    Toggle(Map<String, Value>),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message has no command")]
    MissingCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("malformed {command} message: {reason}")]
    Malformed {
        command: &'static str,
        reason: String,
    },
}

impl Message {
    /// Decode a text frame
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = serde_json::from_str(frame)? else {
            return Err(DecodeError::MissingCommand);
        };
        let command = fields
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(DecodeError::MissingCommand)?;

        match command.as_str() {
            "ssidlist" => Self::scan(&Value::Object(fields)),
            CONFIG_COMMAND => Self::config(Value::Object(fields)),
            "status" => Self::status(&Value::Object(fields)),
            "toggle" => {
                fields.remove("command");
                Ok(Self::Toggle(fields))
            }
            _ => Err(DecodeError::UnknownCommand(command)),
        }
    }

    /// Decode a configuration object, with or without its discriminator
    pub fn config(raw: Value) -> Result<Self, DecodeError> {
        let config = DeviceConfig::from_value(&raw).map_err(|e| DecodeError::Malformed {
            command: CONFIG_COMMAND,
            reason: e.to_string(),
        })?;
        Ok(Self::ConfigFile { raw, config })
    }

    pub fn status(raw: &Value) -> Result<Self, DecodeError> {
        DeviceStatus::deserialize(raw)
            .map(Self::Status)
            .map_err(|e| DecodeError::Malformed {
                command: "status",
                reason: e.to_string(),
            })
    }

    pub fn scan(raw: &Value) -> Result<Self, DecodeError> {
        ScanResult::deserialize(raw)
            .map(Self::SsidList)
            .map_err(|e| DecodeError::Malformed {
                command: "ssidlist",
                reason: e.to_string(),
            })
    }

    pub fn command(&self) -> &'static str {
        match self {
            Self::SsidList(_) => "ssidlist",
            Self::ConfigFile { .. } => CONFIG_COMMAND,
            Self::Status(_) => "status",
            Self::Toggle(_) => "toggle",
        }
    }
}
