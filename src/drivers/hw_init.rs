//! One-shot hardware peripheral initialization.
//!
//! Configures the release button input and installs its interrupt handler
//! using raw ESP-IDF sys calls.  Called once from `main()` after the node
//! has been leaked to `'static`, before any task is spawned.  The lock
//! indicator pins are owned by `PinDriver`s created in `main()`.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::arbiter::ActuatorArbiter;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("release button")
    }
}

// ── Release button ────────────────────────────────────────────

/// Configure the release button and route its edges to `arbiter`.
#[cfg(target_os = "espidf")]
pub fn init_release_button(arbiter: &'static ActuatorArbiter) -> Result<(), HwInitError> {
    use crate::drivers::release_button::release_button_isr;
    use crate::pins;

    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RELEASE_BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
    };

    // SAFETY: called once from main() before tasks start.  The handler
    // argument points at a 'static arbiter that is only accessed through
    // atomics, so it is valid in ISR context for the life of the program.
    unsafe {
        let ret = gpio_config(&cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }

        // ESP_ERR_INVALID_STATE means the service is already installed.
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let arg = core::ptr::from_ref(arbiter).cast_mut().cast::<core::ffi::c_void>();
        let ret = gpio_isr_handler_add(pins::RELEASE_BUTTON_GPIO, Some(release_button_isr), arg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrAddFailed(ret));
        }
        gpio_intr_enable(pins::RELEASE_BUTTON_GPIO);
    }

    log::info!(
        "hw_init: release button on GPIO{} (rising edge)",
        crate::pins::RELEASE_BUTTON_GPIO
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_release_button(_arbiter: &'static ActuatorArbiter) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): release button ISR skipped");
    Ok(())
}
