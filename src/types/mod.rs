//! Domain types shared by the components
//!
//! - common: option values as the device encodes them
//! - device: configuration object and its negotiated layout
//! - network: WiFi mode and scan results
//! - status: device telemetry

pub mod common;
pub mod device;
pub mod network;
pub mod status;

pub use common::*;
pub use device::*;
pub use network::*;
pub use status::*;
