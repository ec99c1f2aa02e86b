use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a drop-down option on the device (relay type, GPIO pin, ...)
///
/// Firmware builds disagree on whether these are JSON numbers or numeric
/// strings, so both are accepted and each serializes back in the form it
/// was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Selection {
    Number(i64),
    Text(String),
}

impl Selection {
    /// Numeric interpretation, if the value is a number or a numeric string
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::Number(0)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Selection {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Selection {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
