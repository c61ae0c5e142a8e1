//! Lock indicator LEDs.
//!
//! Two discrete LEDs show the door state: the locked LED is lit at rest;
//! after a successful release the unlocked LED is lit for the hold period,
//! then the indicator returns to locked.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::digital::OutputPin`: on ESP-IDF the pins are
//! `PinDriver`s from `hw_init`; on host/test any mock pin works.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin;
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

pub struct LockIndicator<L: OutputPin, U: OutputPin> {
    locked_led: L,
    unlocked_led: U,
    state: LockState,
}

impl<L: OutputPin, U: OutputPin> LockIndicator<L, U> {
    /// Takes ownership of both pins and shows the locked state.
    pub fn new(locked_led: L, unlocked_led: U) -> Self {
        let mut indicator = Self {
            locked_led,
            unlocked_led,
            state: LockState::Unlocked,
        };
        indicator.show(LockState::Locked);
        indicator
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn show(&mut self, state: LockState) {
        let locked = state == LockState::Locked;
        let ok = set(&mut self.locked_led, locked) & set(&mut self.unlocked_led, !locked);
        if !ok {
            warn!("Indicator: pin write failed");
        }
        self.state = state;
    }

    /// Wait for one unlock notice, show unlocked for `hold`, then lock.
    pub async fn cycle(&mut self, unlocked: &Signal<CriticalSectionRawMutex, ()>, hold: Duration) {
        unlocked.wait().await;
        self.show(LockState::Unlocked);
        info!("Indicator: unlocked for {}ms", hold.as_millis());
        Timer::after(hold).await;
        self.show(LockState::Locked);
    }

    pub async fn run(&mut self, unlocked: &Signal<CriticalSectionRawMutex, ()>, hold: Duration) {
        loop {
            self.cycle(unlocked, hold).await;
        }
    }
}

fn set(pin: &mut impl OutputPin, high: bool) -> bool {
    if high { pin.set_high().is_ok() } else { pin.set_low().is_ok() }
}
