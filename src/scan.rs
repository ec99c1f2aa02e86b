//! WiFi network discovery retry loop
//!
//! ```text
//!   Idle ──trigger──► Scanning{1} ──non-empty list──► Ready
//!                      │    ▲                            │
//!    error/empty list  │    │ attempt+1 after backoff    │ trigger
//!                      ▼    │                            │
//!                     (retry) ◄──────────────────────────┘
//!                      │
//!                      │ attempts exhausted
//!                      ▼
//!               NoNetworksFound
//! ```

use crate::types::{Network, ScanResult};
use log::{debug, info, warn};
use std::time::Duration;

/// Bounded retry with exponential backoff
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl ScanPolicy {
    /// Delay before the given retry attempt (attempt 2 is the first retry)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning {
        attempt: u32,
    },
    /// Networks ordered by descending signal strength
    Ready {
        networks: Vec<Network>,
    },
    NoNetworksFound {
        attempts: u32,
    },
}

/// What the caller has to do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStep {
    /// Issue a scan request after `delay`
    Request { delay: Duration },
    Done,
}

#[derive(Debug, Default)]
pub struct ScanController {
    policy: ScanPolicy,
    state: ScanState,
    selection: Option<Network>,
}

impl ScanController {
    pub fn new(policy: ScanPolicy) -> Self {
        Self {
            policy,
            state: ScanState::Idle,
            selection: None,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Most recently selected network, if any
    pub fn selection(&self) -> Option<&Network> {
        self.selection.as_ref()
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, ScanState::Scanning { .. })
    }

    /// Start a new scan cycle, dropping prior results
    pub fn trigger(&mut self) -> ScanStep {
        debug!("scan triggered in state {:?}", self.state);
        self.selection = None;
        self.state = ScanState::Scanning { attempt: 1 };

        ScanStep::Request {
            delay: Duration::ZERO,
        }
    }

    /// Feed a scan snapshot from the device
    pub fn on_response(&mut self, result: ScanResult) -> ScanStep {
        let ScanState::Scanning { attempt } = self.state else {
            debug!("ignoring scan result outside of a scan cycle");
            return ScanStep::Done;
        };

        if !result.is_complete() {
            if attempt >= self.policy.max_attempts {
                warn!("no networks found after {attempt} attempts");
                self.state = ScanState::NoNetworksFound { attempts: attempt };
                return ScanStep::Done;
            }

            let attempt = attempt + 1;
            let delay = self.policy.backoff(attempt);
            debug!("scan incomplete, retry {attempt} in {delay:?}");
            self.state = ScanState::Scanning { attempt };
            return ScanStep::Request { delay };
        }

        let mut networks = result.list;
        // stable: equal strengths keep the device's order
        networks.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        info!("scan found {} networks", networks.len());
        self.state = ScanState::Ready { networks };

        ScanStep::Done
    }

    /// Select a network of the ready list by position
    pub fn select(&mut self, index: usize) -> Option<&Network> {
        let ScanState::Ready { networks } = &self.state else {
            return None;
        };

        self.selection = Some(networks.get(index)?.clone());
        self.selection.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = ScanState::Idle;
        self.selection = None;
    }
}
