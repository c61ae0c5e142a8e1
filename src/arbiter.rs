//! Actuator arbitration.
//!
//! Two triggers may command a lock release: the manual release button
//! (interrupt context) and a validated access code (display task).  The
//! arbitration token guarantees exactly one release per cycle.
//!
//! ```text
//!            Idle ──claim_from_isr()──▶ Claimed(Interrupt) ─┐
//!             ▲   ──claim_remote()───▶ Claimed(Remote)    ─┤
//!             │                                            ▼
//!             └──────── release() ◀── actuator task (send, retries)
//! ```
//!
//! The token is a single atomic byte.  The interrupt side only performs a
//! compare-and-swap and a store: it never blocks, allocates, logs, or
//! touches a waker.  The actuator task therefore polls for interrupt
//! claims at a short interval; remote claims additionally wake it at once.
//! A claim that finds the token taken is the designed outcome, not an
//! error.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer, with_timeout};

/// Poll interval for claims made from interrupt context.
pub const ISR_POLL: Duration = Duration::from_millis(10);

/// Spacing of token attempts while a remote claim waits.
const REMOTE_RETRY: Duration = Duration::from_millis(1);

const IDLE: u8 = 0;

/// Which trigger won the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClaimSource {
    Interrupt = 1,
    Remote = 2,
}

impl ClaimSource {
    const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Interrupt),
            2 => Some(Self::Remote),
            _ => None,
        }
    }
}

pub struct ActuatorArbiter {
    /// Current token holder, `IDLE` when free.
    holder: AtomicU8,
    /// Claim not yet picked up by the actuator task.
    pending: AtomicU8,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for ActuatorArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorArbiter {
    pub const fn new() -> Self {
        Self {
            holder: AtomicU8::new(IDLE),
            pending: AtomicU8::new(IDLE),
            wake: Signal::new(),
        }
    }

    fn try_claim(&self, source: ClaimSource) -> bool {
        let won = self
            .holder
            .compare_exchange(IDLE, source as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.pending.store(source as u8, Ordering::Release);
        }
        won
    }

    /// Non-blocking claim for the release-button interrupt.
    pub fn claim_from_isr(&self) -> bool {
        self.try_claim(ClaimSource::Interrupt)
    }

    /// Claim on behalf of a validated access code, retrying for at most
    /// `wait`.  Returns `false` if the other trigger holds the token.
    pub async fn claim_remote(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        loop {
            if self.try_claim(ClaimSource::Remote) {
                self.wake.signal(());
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            Timer::after(REMOTE_RETRY).await;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.holder.load(Ordering::Acquire) == IDLE
    }

    pub fn holder(&self) -> Option<ClaimSource> {
        ClaimSource::from_u8(self.holder.load(Ordering::Acquire))
    }

    /// Wait for the next winning claim.
    pub async fn next_claim(&self) -> ClaimSource {
        loop {
            if let Some(source) = ClaimSource::from_u8(self.pending.swap(IDLE, Ordering::AcqRel)) {
                return source;
            }
            let _ = with_timeout(ISR_POLL, self.wake.wait()).await;
        }
    }

    /// Return the token.  Only the actuator task calls this, once its
    /// transmission sequence has finished.
    pub fn release(&self) {
        self.holder.store(IDLE, Ordering::Release);
    }
}
