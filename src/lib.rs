//! AccessNode firmware library.
//!
//! Exposes the node core (pipelines, arbiter, scheduler) for integration
//! testing on the host. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod access_code;
pub mod actuator;
pub mod app;
pub mod arbiter;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod node;
pub mod pins;
pub mod pipeline;
pub mod scheduler;

// The adapters and drivers compile on every target; the hardware paths
// inside them are cfg-gated and fall back to host simulations.
pub mod adapters;
pub mod drivers;
