//! Core-pinned thread spawning for ESP32-S3 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size.  On non-ESP targets, falls back to plain thread spawn.
//!
//! # Task layout
//!
//! ```text
//!  Core 0 (radio)                       Core 1 (application)
//!  ──────────────                       ────────────────────
//!  actuator  pri 23  ESP-NOW release    node-core  pri 10  scheduler,
//!  http      pri 19  POST + dispatch                       formatter,
//!  wifi      pri 19  reconnect                             display,
//!                                                          lock indicator
//!                                       keypad     pri 10  UART RX
//! ```
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration for the *next*
//! `pthread_create()` from the calling thread, so the config→spawn pair
//! must not be interleaved with other thread creation on that thread.

use std::io;

/// CPU core identifiers for the ESP32-S3 Xtensa LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi, ESP-NOW, lwIP and the tasks talking to them.
    Pro = 0,
    /// Core 1 (APP_CPU): request pipeline, display, keypad.
    App = 1,
}

/// Placement of one firmware task.  `name` must be NUL-terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

pub const ACTUATOR_TASK: TaskSpec = TaskSpec {
    name: "actuator\0",
    core: Core::Pro,
    priority: 23,
    stack_kb: 4,
};

pub const HTTP_TASK: TaskSpec = TaskSpec {
    name: "http\0",
    core: Core::Pro,
    priority: 19,
    stack_kb: 8,
};

pub const WIFI_TASK: TaskSpec = TaskSpec {
    name: "wifi\0",
    core: Core::Pro,
    priority: 19,
    stack_kb: 4,
};

pub const CORE_TASK: TaskSpec = TaskSpec {
    name: "node-core\0",
    core: Core::App,
    priority: 10,
    stack_kb: 12,
};

pub const KEYPAD_TASK: TaskSpec = TaskSpec {
    name: "keypad\0",
    core: Core::App,
    priority: 10,
    stack_kb: 4,
};

/// Spawn `f` with the placement described by `spec`.
#[cfg(target_os = "espidf")]
pub fn spawn_task(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<std::thread::JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by
    // esp_create_default_pthread_config and `name` is a static,
    // NUL-terminated string that outlives the thread.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = i32::from(spec.priority);
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr().cast();
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = spec.name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Simulation fallback: ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(
    spec: TaskSpec,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<std::thread::JoinHandle<()>> {
    let display_name = spec.name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(spec.stack_kb.max(64) * 1024)
        .spawn(f)
}
