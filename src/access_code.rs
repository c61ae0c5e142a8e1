//! Keypad access codes.
//!
//! The display controller forwards every code typed on the keypad over
//! UART.  A valid code is parked in the [`AccessCodeSlot`] until the
//! request formatter picks it up; reading it always clears it, so a stale
//! code can never be replayed.  The slot holds one code at a time: a new
//! code arriving while the previous one is still pending is rejected.
//!
//! ```text
//!  UART RX ──▶ AccessCode::parse ──▶ slot.store ──▶ submit(ACCESS_CODE)
//!                                                        │
//!              formatter ◀── slot.take (read + reset) ◀──┘
//! ```

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::semaphore::{GreedySemaphore, Semaphore};
use embassy_time::{Duration, with_timeout};
use log::{error, info, warn};

use crate::arbiter::ActuatorArbiter;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{AccessCodeError, AdmissionError};
use crate::pipeline::{RequestKind, RequestPipeline};

/// Longest code the firmware can hold.
pub const MAX_CODE_LEN: usize = 16;

/// A validated, all-digit access code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode(heapless::String<MAX_CODE_LEN>);

impl AccessCode {
    /// Validate a raw keypad frame.  Trailing CR, LF and NUL bytes are
    /// frame terminators and are ignored.
    pub fn parse(raw: &[u8], expected_len: usize) -> Result<Self, AccessCodeError> {
        let end = raw
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n' | 0))
            .map_or(0, |i| i + 1);
        let digits = &raw[..end];

        if digits.len() != expected_len {
            return Err(AccessCodeError::InvalidLength(digits.len()));
        }
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(AccessCodeError::NotNumeric);
        }

        let mut code = heapless::String::new();
        for &b in digits {
            code.push(char::from(b))
                .map_err(|()| AccessCodeError::InvalidLength(digits.len()))?;
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Single-slot holder
// ───────────────────────────────────────────────────────────────

pub struct AccessCodeSlot {
    value: Mutex<CriticalSectionRawMutex, RefCell<Option<AccessCode>>>,
    /// One unit: taken by `store`, returned by the `take` that empties it.
    slot: GreedySemaphore<CriticalSectionRawMutex>,
    wait: Duration,
}

impl AccessCodeSlot {
    pub fn new(wait: Duration) -> Self {
        Self {
            value: Mutex::new(RefCell::new(None)),
            slot: GreedySemaphore::new(1),
            wait,
        }
    }

    /// Park `code` until the formatter takes it.
    pub async fn store(&self, code: AccessCode) -> Result<(), AccessCodeError> {
        let Ok(Ok(permit)) = with_timeout(self.wait, self.slot.acquire(1)).await else {
            return Err(AccessCodeError::Busy);
        };
        permit.disarm();
        self.value.lock(|v| *v.borrow_mut() = Some(code));
        Ok(())
    }

    /// Read and clear the pending code, freeing the slot.
    pub fn take(&self) -> Option<AccessCode> {
        let code = self.value.lock(|v| v.borrow_mut().take());
        if code.is_some() {
            self.slot.release(1);
        }
        code
    }

    pub fn is_pending(&self) -> bool {
        self.value.lock(|v| v.borrow().is_some())
    }
}

// ───────────────────────────────────────────────────────────────
// Input handling
// ───────────────────────────────────────────────────────────────

/// What happened to one keypad frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// ACCESS_CODE was queued for validation.
    Submitted,
    /// The frame was rejected before reaching the slot, or the slot was busy.
    Invalid(AccessCodeError),
    /// No backend link; the code was discarded.
    Unlinked,
    /// A release is already under way; the code was discarded.
    ReleaseInProgress,
    /// The request pipeline refused the submission; the code was discarded.
    Dropped(AdmissionError),
}

/// Entry point for raw keypad frames.
pub struct CodeIntake<'a> {
    pub slot: &'a AccessCodeSlot,
    pub connectivity: &'a ConnectivityMonitor,
    pub arbiter: &'a ActuatorArbiter,
    pub pipeline: &'a RequestPipeline,
    pub expected_len: usize,
}

impl CodeIntake<'_> {
    pub async fn on_code_received(&self, raw: &[u8]) -> IntakeOutcome {
        let code = match AccessCode::parse(raw, self.expected_len) {
            Ok(code) => code,
            Err(e) => {
                error!("Keypad: {}", e);
                return IntakeOutcome::Invalid(e);
            }
        };
        if let Err(e) = self.slot.store(code).await {
            error!("Keypad: {}", e);
            return IntakeOutcome::Invalid(e);
        }

        let outcome = if !self.connectivity.is_linked() {
            IntakeOutcome::Unlinked
        } else if !self.arbiter.is_idle() {
            IntakeOutcome::ReleaseInProgress
        } else {
            match self.pipeline.submit(RequestKind::AccessCode).await {
                Ok(()) => IntakeOutcome::Submitted,
                Err(e) => IntakeOutcome::Dropped(e),
            }
        };

        if outcome == IntakeOutcome::Submitted {
            info!("Keypad: access code queued for validation");
        } else {
            warn!("Keypad: access code discarded ({:?})", outcome);
            self.slot.take();
        }
        outcome
    }
}
