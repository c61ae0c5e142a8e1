//! Wall-clock adapter.
//!
//! Implements [`ClockPort`].  The node has no RTC backup: the clock is
//! invalid at boot and becomes valid once a TIME response sets it.
//!
//! - **`target_os = "espidf"`**: `settimeofday()` / `gettimeofday()` on the
//!   ESP-IDF system clock, with an atomic flag tracking whether it was set.
//! - **`not(target_os = "espidf")`**: an offset against `std::time::Instant`
//!   for host-side testing and simulation.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::ClockPort;

/// System wall clock for the ESP32-S3 platform.
pub struct SystemClock {
    is_set: AtomicBool,
    #[cfg(not(target_os = "espidf"))]
    sim: std::sync::Mutex<Option<(i64, std::time::Instant)>>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            is_set: AtomicBool::new(false),
            #[cfg(not(target_os = "espidf"))]
            sim: std::sync::Mutex::new(None),
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_set.load(Ordering::Acquire)
    }

    #[cfg(target_os = "espidf")]
    fn platform_set(&self, secs: i64) {
        let tv = esp_idf_svc::sys::timeval {
            tv_sec: secs as esp_idf_svc::sys::time_t,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid timeval; a null timezone is permitted.
        let rc = unsafe { esp_idf_svc::sys::settimeofday(&tv, core::ptr::null()) };
        if rc != 0 {
            log::warn!("Clock: settimeofday failed (rc={})", rc);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_set(&self, secs: i64) {
        if let Ok(mut sim) = self.sim.lock() {
            *sim = Some((secs, std::time::Instant::now()));
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_now(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid, writable timeval.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some(tv.tv_sec as i64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_now(&self) -> Option<i64> {
        let (base, at) = (*self.sim.lock().ok()?)?;
        Some(base + at.elapsed().as_secs() as i64)
    }
}

impl ClockPort for SystemClock {
    fn set_unix_time(&self, secs: i64) {
        self.platform_set(secs);
        self.is_set.store(true, Ordering::Release);
        log::info!("Clock: set to {}", secs);
    }

    fn unix_time(&self) -> Option<i64> {
        if !self.is_set() {
            return None;
        }
        self.platform_now()
    }
}
