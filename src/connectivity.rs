//! Station link state tracking.
//!
//! The Wi-Fi event handler is the only writer; every other task reads
//! [`ConnectivityMonitor::is_linked`] to decide whether a request is worth
//! sending.  Each link-down also wakes the reconnect task once.
//!
//! ```text
//!  WiFi event loop ──on_link_up/down──▶ ConnectivityMonitor
//!                                        │  state (short-hold mutex)
//!                                        │  reconnect signal
//!                                        ▼
//!                              reconnect task ──▶ LinkPort::connect()
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::NodeConfig;

/// Snapshot of the station link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub linked: bool,
    /// Link-downs since the last link-up, saturating at the ceiling.
    pub consecutive_failures: u8,
}

impl ConnectivityState {
    const OFFLINE: Self = Self {
        linked: false,
        consecutive_failures: 0,
    };
}

pub struct ConnectivityMonitor {
    state: Mutex<CriticalSectionRawMutex, Cell<ConnectivityState>>,
    failure_ceiling: u8,
    reconnect: Signal<CriticalSectionRawMutex, u8>,
}

impl ConnectivityMonitor {
    pub const fn new(failure_ceiling: u8) -> Self {
        Self {
            state: Mutex::new(Cell::new(ConnectivityState::OFFLINE)),
            failure_ceiling,
            reconnect: Signal::new(),
        }
    }

    pub fn on_link_up(&self) -> ConnectivityState {
        let next = ConnectivityState {
            linked: true,
            consecutive_failures: 0,
        };
        self.state.lock(|s| s.set(next));
        info!("Link: up");
        next
    }

    pub fn on_link_down(&self) -> ConnectivityState {
        let next = self.state.lock(|s| {
            let prev = s.get();
            let next = ConnectivityState {
                linked: false,
                consecutive_failures: prev
                    .consecutive_failures
                    .saturating_add(1)
                    .min(self.failure_ceiling),
            };
            s.set(next);
            next
        });
        info!("Link: down (failures={})", next.consecutive_failures);
        self.reconnect.signal(next.consecutive_failures);
        next
    }

    pub fn is_linked(&self) -> bool {
        self.state.lock(|s| s.get().linked)
    }

    pub fn state(&self) -> ConnectivityState {
        self.state.lock(Cell::get)
    }

    pub fn failure_ceiling(&self) -> u8 {
        self.failure_ceiling
    }

    /// Wait for the next link-down, back off, and ask the driver to
    /// reconnect once.
    pub async fn reconnect_once(&self, link: &mut impl LinkPort, policy: &ReconnectPolicy) {
        let failures = self.reconnect.wait().await;
        Timer::after(policy.delay_for(failures)).await;
        info!("Link: reconnecting (failures={})", failures);
        if let Err(e) = link.connect() {
            warn!("Link: reconnect request failed — {}", e);
        }
    }

    /// Reconnect task body: one initial connect, then one attempt per
    /// link-down.
    pub async fn run_reconnect(&self, link: &mut impl LinkPort, policy: ReconnectPolicy) {
        if let Err(e) = link.connect() {
            warn!("Link: initial connect request failed — {}", e);
        }
        loop {
            self.reconnect_once(link, &policy).await;
        }
    }
}

/// Reconnect delays: short while the failure count is below the
/// ceiling, long once it has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub fast: Duration,
    pub slow: Duration,
    pub ceiling: u8,
}

impl ReconnectPolicy {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            fast: Duration::from_millis(config.reconnect_fast_ms),
            slow: Duration::from_millis(config.reconnect_slow_ms),
            ceiling: config.max_attempts,
        }
    }

    pub fn delay_for(&self, failures: u8) -> Duration {
        if failures < self.ceiling { self.fast } else { self.slow }
    }
}
