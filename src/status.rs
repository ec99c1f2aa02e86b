//! Resource gauges computed from device telemetry

use crate::types::DeviceStatus;
use log::debug;

/// Capacities that the device does not report itself
///
/// Heap and flash totals belong to one firmware build; other builds may
/// need different values, hence they are configurable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacities {
    pub heap_bytes_total: u64,
    pub flash_bytes_total: u64,
}

impl Capacities {
    pub const DEFAULT_HEAP: u64 = 81920;
    pub const DEFAULT_FLASH: u64 = 1044464;
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            heap_bytes_total: Self::DEFAULT_HEAP,
            flash_bytes_total: Self::DEFAULT_FLASH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl Severity {
    /// `> 50` healthy, `> 25` warning, anything else critical
    pub fn classify(percent: f64) -> Self {
        if percent > 50.0 {
            Self::Healthy
        } else if percent > 25.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// Free capacity of one resource
#[derive(Clone, Debug, PartialEq)]
pub struct Gauge {
    pub measured: u64,
    pub total: u64,
    /// Not clamped: a device reporting more than `total` yields more than 100
    pub percent: f64,
    pub severity: Severity,
}

impl Gauge {
    pub fn new(measured: u64, total: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            measured as f64 * 100.0 / total as f64
        };

        Self {
            measured,
            total,
            percent,
            severity: Severity::classify(percent),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gauges {
    pub heap: Gauge,
    pub flash: Gauge,
    pub filesystem: Gauge,
}

/// Keeps the latest telemetry snapshot and its gauges
#[derive(Debug, Default)]
pub struct StatusMonitor {
    capacities: Capacities,
    status: Option<DeviceStatus>,
    gauges: Option<Gauges>,
}

impl StatusMonitor {
    pub fn new(capacities: Capacities) -> Self {
        Self {
            capacities,
            status: None,
            gauges: None,
        }
    }

    /// Replace the snapshot, last write wins
    pub fn update(&mut self, status: DeviceStatus) -> &Gauges {
        let gauges = Gauges {
            heap: Gauge::new(status.heap_bytes_free, self.capacities.heap_bytes_total),
            flash: Gauge::new(status.flash_bytes_free, self.capacities.flash_bytes_total),
            filesystem: Gauge::new(
                status.filesystem_bytes_free,
                status.filesystem_bytes_total,
            ),
        };
        debug!(
            "status updated: heap {:.1}%, flash {:.1}%, filesystem {:.1}%",
            gauges.heap.percent, gauges.flash.percent, gauges.filesystem.percent
        );

        self.status = Some(status);
        self.gauges.insert(gauges)
    }

    pub fn status(&self) -> Option<&DeviceStatus> {
        self.status.as_ref()
    }

    pub fn gauges(&self) -> Option<&Gauges> {
        self.gauges.as_ref()
    }

    pub fn clear(&mut self) {
        self.status = None;
        self.gauges = None;
    }
}
