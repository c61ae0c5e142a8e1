//! Node configuration parameters
//!
//! All tunable parameters for the access node.  Defaults match the
//! deployed backend and door hardware; `validate()` is called once at
//! bring-up before any task is spawned.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::QUEUE_DEPTH;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Backend ---
    /// Base URL every request path is appended to (must end in `/`)
    pub backend_url: String,
    /// Per-POST timeout (milliseconds)
    pub http_timeout_ms: u64,

    // --- Request timers ---
    /// TIME period after a request went out with the link up
    pub time_linked_period_ms: u64,
    /// TIME period while waiting for the link
    pub time_unlinked_period_ms: u64,
    /// RESERVATION period after a request went out with the link up
    pub reservation_linked_period_ms: u64,
    /// RESERVATION period while waiting for the link
    pub reservation_unlinked_period_ms: u64,
    /// Period used by `restart` after any downstream failure
    pub fast_retry_ms: u64,

    // --- Pipelines ---
    /// Admission units per guarded queue (at most the queue depth)
    pub admission_capacity: usize,
    /// Bounded wait for an admission unit or queue slot (milliseconds)
    pub admission_wait_ms: u64,
    /// Transmission attempts before giving up (HTTP and actuator link)
    pub max_attempts: u8,
    /// Delay between transmission attempts (milliseconds)
    pub retry_delay_ms: u64,

    // --- Actuator peer ---
    /// MAC address of the lock actuator
    pub peer_mac: [u8; 6],
    /// Radio channel used until the station link reports another one
    pub wifi_channel: u8,
    /// Bounded wait for the arbitration token from task context (milliseconds)
    pub remote_claim_wait_ms: u64,
    /// How long the indicator shows "unlocked" after a release (milliseconds)
    pub unlock_hold_ms: u64,

    // --- Station link ---
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Reconnect delay while below the failure ceiling (milliseconds)
    pub reconnect_fast_ms: u64,
    /// Reconnect delay once the failure ceiling is reached (milliseconds)
    pub reconnect_slow_ms: u64,

    // --- Local ---
    /// Fixed offset of local time from UTC (seconds, west negative)
    pub utc_offset_secs: i32,
    /// Number of digits in a keypad access code
    pub access_code_len: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Backend
            backend_url: "http://172.20.10.3:8000/".into(),
            http_timeout_ms: 250,

            // Request timers
            time_linked_period_ms: 86_400_000, // 1/day
            time_unlinked_period_ms: 15_000,
            reservation_linked_period_ms: 60_000, // 1/min
            reservation_unlinked_period_ms: 20_000,
            fast_retry_ms: 20_000,

            // Pipelines
            admission_capacity: QUEUE_DEPTH,
            admission_wait_ms: 10,
            max_attempts: 11,
            retry_delay_ms: 20,

            // Actuator peer
            peer_mac: [0x7C, 0xDF, 0xA1, 0xE5, 0x44, 0x30],
            wifi_channel: 11,
            remote_claim_wait_ms: 10,
            unlock_hold_ms: 10_000,

            // Station link
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            reconnect_fast_ms: 20,
            reconnect_slow_ms: 1_000,

            // Local (CDT)
            utc_offset_secs: -5 * 3600,
            access_code_len: 7,
        }
    }
}

impl NodeConfig {
    /// Reject parameter combinations the pipelines cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !(self.backend_url.starts_with("http://") && self.backend_url.ends_with('/')) {
            return Err(Error::Config("backend_url must be http://.../"));
        }
        if self.admission_capacity == 0 || self.admission_capacity > QUEUE_DEPTH {
            return Err(Error::Config("admission_capacity must be 1..=QUEUE_DEPTH"));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be non-zero"));
        }
        if self.access_code_len == 0 || self.access_code_len > crate::access_code::MAX_CODE_LEN {
            return Err(Error::Config("access_code_len out of range"));
        }
        if self.fast_retry_ms == 0
            || self.fast_retry_ms >= self.time_linked_period_ms
            || self.fast_retry_ms >= self.reservation_linked_period_ms
        {
            return Err(Error::Config("fast_retry_ms must be shorter than the linked periods"));
        }
        if self.wifi_channel == 0 || self.wifi_channel > 14 {
            return Err(Error::Config("wifi_channel must be 1..=14"));
        }
        if self.utc_offset_secs.unsigned_abs() >= 86_400 {
            return Err(Error::Config("utc_offset_secs must be within one day"));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn admission_wait(&self) -> Duration {
        Duration::from_millis(self.admission_wait_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn remote_claim_wait(&self) -> Duration {
        Duration::from_millis(self.remote_claim_wait_ms)
    }

    pub fn unlock_hold(&self) -> Duration {
        Duration::from_millis(self.unlock_hold_ms)
    }

    /// Local time zone for display frames.
    pub fn utc_offset(&self) -> Result<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(self.utc_offset_secs)
            .ok_or(Error::Config("utc_offset_secs must be within one day"))
    }
}
