//! GPIO / peripheral pin assignments for the access node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Manual release
// ---------------------------------------------------------------------------

/// Manual release button.  Rising edge claims the arbitration token.
pub const RELEASE_BUTTON_GPIO: i32 = 41;

// ---------------------------------------------------------------------------
// Lock indicator (discrete LEDs, active HIGH)
// ---------------------------------------------------------------------------

/// Lit while the door is locked.
pub const LOCKED_LED_GPIO: i32 = 38;
/// Lit for the unlock hold period after a release.
pub const UNLOCKED_LED_GPIO: i32 = 39;

// ---------------------------------------------------------------------------
// Display controller UART
// ---------------------------------------------------------------------------

pub const DISPLAY_UART_PORT: i32 = 1;
pub const DISPLAY_UART_TX_GPIO: i32 = 17;
pub const DISPLAY_UART_RX_GPIO: i32 = 18;
pub const DISPLAY_UART_BAUD: u32 = 115_200;
