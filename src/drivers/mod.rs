//! Board drivers: release button ISR, lock indicator, core-pinned tasks.

pub mod hw_init;
pub mod release_button;
pub mod status_led;
pub mod task_pin;
