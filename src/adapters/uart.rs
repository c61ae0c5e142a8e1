//! Display controller UART.
//!
//! One UART carries both directions: display frames go out through
//! [`UartDisplay`] (a [`DisplayTransport`]); keypad entries come back as
//! CR-, LF- or NUL-terminated frames and are split by [`FrameAssembler`]
//! before reaching the access-code intake.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_hal::uart::UartDriver`.
//! - **all other targets**: logging stub.

use log::{info, warn};

use crate::app::ports::DisplayTransport;

/// Longest keypad frame accepted; longer input is discarded.
pub const MAX_FRAME: usize = 32;

// ───────────────────────────────────────────────────────────────
// Frame assembly
// ───────────────────────────────────────────────────────────────

/// Splits the RX byte stream into keypad frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: heapless::Vec<u8, MAX_FRAME>,
    overflowed: bool,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; `on_frame` is called once per complete frame
    /// (terminator excluded).  Empty frames are skipped.
    pub fn feed(&mut self, bytes: &[u8], mut on_frame: impl FnMut(&[u8])) {
        for &b in bytes {
            if matches!(b, b'\r' | b'\n' | 0) {
                if self.overflowed {
                    warn!("UART: oversized frame dropped");
                } else if !self.buf.is_empty() {
                    on_frame(&self.buf);
                }
                self.buf.clear();
                self.overflowed = false;
            } else if self.buf.push(b).is_err() {
                self.overflowed = true;
            }
        }
    }

    /// Complete a frame that arrived without a terminator (read timeout).
    pub fn flush(&mut self, on_frame: impl FnMut(&[u8])) {
        self.feed(b"\0", on_frame);
    }
}

// ───────────────────────────────────────────────────────────────
// Display side
// ───────────────────────────────────────────────────────────────

pub struct UartDisplay {
    #[cfg(target_os = "espidf")]
    uart: &'static esp_idf_hal::uart::UartDriver<'static>,
    written: usize,
}

impl UartDisplay {
    #[cfg(target_os = "espidf")]
    pub fn new(uart: &'static esp_idf_hal::uart::UartDriver<'static>) -> Self {
        Self { uart, written: 0 }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self { written: 0 }
    }

    /// Bytes handed to the UART so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for UartDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayTransport for UartDisplay {
    #[cfg(target_os = "espidf")]
    fn write(&mut self, bytes: &[u8]) {
        match self.uart.write(bytes) {
            Ok(n) => self.written += n,
            Err(e) => warn!("UART: display write failed ({})", e),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        info!("UART(sim): {:?}", text.trim_end_matches('\0'));
        self.written += bytes.len();
    }
}

// ───────────────────────────────────────────────────────────────
// Keypad side
// ───────────────────────────────────────────────────────────────

/// Keypad RX task body: read, split into frames, hand each to `on_frame`.
#[cfg(target_os = "espidf")]
pub fn run_keypad_rx(
    uart: &'static esp_idf_hal::uart::UartDriver<'static>,
    mut on_frame: impl FnMut(&[u8]),
) {
    use esp_idf_hal::delay::TickType;

    let timeout = TickType::new_millis(100).ticks();
    let mut assembler = FrameAssembler::new();
    let mut chunk = [0u8; MAX_FRAME];
    info!("UART: keypad RX running");
    loop {
        match uart.read(&mut chunk, timeout) {
            Ok(0) => assembler.flush(&mut on_frame),
            Ok(n) => assembler.feed(&chunk[..n], &mut on_frame),
            Err(e) => {
                warn!("UART: read failed ({}), flushing input", e);
                let _ = uart.clear_rx();
                assembler = FrameAssembler::new();
            }
        }
    }
}
