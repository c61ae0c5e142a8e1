//! Manual release button.
//!
//! ## Hardware
//!
//! Momentary switch on [`RELEASE_BUTTON_GPIO`](crate::pins::RELEASE_BUTTON_GPIO),
//! interrupt on the rising edge.  The ISR does nothing but try to claim the
//! arbitration token; presses while a release is under way find the token
//! taken and are dropped, so no extra debouncing or interrupt masking is
//! needed.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arbiter::ActuatorArbiter;

/// Edges that lost arbitration.  Written from the ISR, read for diagnostics.
static LOST_EDGES: AtomicU32 = AtomicU32::new(0);

/// Body of the button ISR.  Lock-free: one CAS and at most one counter
/// increment.
pub fn on_release_edge(arbiter: &ActuatorArbiter) -> bool {
    let won = arbiter.claim_from_isr();
    if !won {
        LOST_EDGES.fetch_add(1, Ordering::Relaxed);
    }
    won
}

pub fn lost_edges() -> u32 {
    LOST_EDGES.load(Ordering::Relaxed)
}

/// GPIO ISR trampoline.  `arg` is the `&'static ActuatorArbiter` passed to
/// `gpio_isr_handler_add`.
#[cfg(target_os = "espidf")]
pub(crate) unsafe extern "C" fn release_button_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: hw_init registers this handler with a pointer derived from a
    // `&'static ActuatorArbiter`, so it is valid and shared-only for the
    // life of the program.
    let arbiter = unsafe { &*arg.cast::<ActuatorArbiter>() };
    on_release_edge(arbiter);
}
