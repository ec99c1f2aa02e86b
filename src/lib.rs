//! Client-side configuration sync for a WiFi relay controller
//!
//! A [`session::Session`] loads the device configuration over one of the
//! [`transport`] implementations, turns it into editable form state, runs
//! WiFi scans, reports resource gauges and writes the configuration back as
//! a whole.

pub mod backup;
pub mod config;
pub mod error;
pub mod http_client;
pub mod protocol;
pub mod reconcile;
pub mod scan;
pub mod session;
pub mod status;
pub mod store;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
