//! Request timers.
//!
//! TIME and RESERVATION each own a oneshot timer that rearms itself every
//! time it fires.  ACCESS_CODE is keypad-driven and has no timer.  The
//! period picked on each rearm depends on the [`Regime`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Timer fires                            │
//! │                            │                                 │
//! │              link up? ─────┴───── link down?                 │
//! │                 │                      │                     │
//! │      rearm NormalLinked        rearm NormalUnlinked          │
//! │      (TIME 24h / RSV 60s)      (TIME 15s / RSV 20s)          │
//! │      submit(kind)              (nothing sent)                │
//! │                                                              │
//! │  Any downstream failure ──▶ restart(kind, fast) (20s)        │
//! │  overrides whatever countdown is running.                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The bookkeeping lives in [`TimerTable`], a pure structure driven by
//! explicit instants; [`RequestScheduler`] wraps it in a short-hold mutex
//! and runs the async driver loop.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, with_timeout};
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::pipeline::{RequestKind, RequestPipeline};

// ═══════════════════════════════════════════════════════════════
//  Regimes and periods
// ═══════════════════════════════════════════════════════════════

/// Why a timer was last armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// Fired with the link up and submitted its request.
    NormalLinked,
    /// Fired with the link down; waiting for connectivity.
    NormalUnlinked,
    /// Rearmed by a failure somewhere downstream.
    FastRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPeriods {
    pub linked: Duration,
    pub unlinked: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePeriods {
    pub time: TimerPeriods,
    pub reservation: TimerPeriods,
    pub fast_retry: Duration,
}

impl SchedulePeriods {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            time: TimerPeriods {
                linked: Duration::from_millis(config.time_linked_period_ms),
                unlinked: Duration::from_millis(config.time_unlinked_period_ms),
            },
            reservation: TimerPeriods {
                linked: Duration::from_millis(config.reservation_linked_period_ms),
                unlinked: Duration::from_millis(config.reservation_unlinked_period_ms),
            },
            fast_retry: Duration::from_millis(config.fast_retry_ms),
        }
    }

    /// Period for `kind` under `regime`; `None` for kinds without a timer.
    pub fn period(&self, kind: RequestKind, regime: Regime) -> Option<Duration> {
        let tier = match kind {
            RequestKind::Time => self.time,
            RequestKind::Reservation => self.reservation,
            RequestKind::AccessCode => return None,
        };
        Some(match regime {
            Regime::NormalLinked => tier.linked,
            Regime::NormalUnlinked => tier.unlinked,
            Regime::FastRetry => self.fast_retry,
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Timer table
// ═══════════════════════════════════════════════════════════════

const TIMER_COUNT: usize = 2;

fn slot_of(kind: RequestKind) -> Option<usize> {
    match kind {
        RequestKind::Time => Some(0),
        RequestKind::Reservation => Some(1),
        RequestKind::AccessCode => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerSlot {
    kind: RequestKind,
    deadline: Option<Instant>,
    regime: Regime,
}

impl TimerSlot {
    const fn idle(kind: RequestKind) -> Self {
        Self {
            kind,
            deadline: None,
            regime: Regime::NormalUnlinked,
        }
    }
}

/// Deadlines for the two timed request kinds.
#[derive(Debug, Clone)]
pub struct TimerTable {
    slots: [TimerSlot; TIMER_COUNT],
}

impl Default for TimerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerTable {
    pub const fn new() -> Self {
        Self {
            slots: [
                TimerSlot::idle(RequestKind::Time),
                TimerSlot::idle(RequestKind::Reservation),
            ],
        }
    }

    /// Cancel any running countdown for `kind` and start a new one.
    /// Returns `false` for kinds without a timer.
    pub fn arm(&mut self, kind: RequestKind, after: Duration, regime: Regime, now: Instant) -> bool {
        let Some(i) = slot_of(kind) else {
            return false;
        };
        self.slots[i].deadline = Some(now + after);
        self.slots[i].regime = regime;
        true
    }

    /// Disarm and return every timer whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> heapless::Vec<RequestKind, TIMER_COUNT> {
        let mut due = heapless::Vec::new();
        for slot in &mut self.slots {
            if slot.deadline.is_some_and(|d| d <= now) {
                slot.deadline = None;
                // Capacity equals the slot count.
                let _ = due.push(slot.kind);
            }
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().filter_map(|s| s.deadline).min()
    }

    pub fn deadline(&self, kind: RequestKind) -> Option<Instant> {
        slot_of(kind).and_then(|i| self.slots[i].deadline)
    }

    pub fn regime(&self, kind: RequestKind) -> Option<Regime> {
        slot_of(kind).map(|i| self.slots[i].regime)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct RequestScheduler {
    table: Mutex<CriticalSectionRawMutex, RefCell<TimerTable>>,
    periods: SchedulePeriods,
    /// Wakes the driver loop whenever a deadline moves.
    rearmed: Signal<CriticalSectionRawMutex, ()>,
}

impl RequestScheduler {
    pub fn new(periods: SchedulePeriods) -> Self {
        Self {
            table: Mutex::new(RefCell::new(TimerTable::new())),
            periods,
            rearmed: Signal::new(),
        }
    }

    pub fn periods(&self) -> &SchedulePeriods {
        &self.periods
    }

    /// Timeout used by every failure path.
    pub fn fast_timeout(&self) -> Duration {
        self.periods.fast_retry
    }

    /// Arm both timers for the first time.  Nothing is known about the
    /// link yet, so they start in the waiting regime.
    pub fn start(&self) {
        for kind in [RequestKind::Time, RequestKind::Reservation] {
            self.schedule(kind, Regime::NormalUnlinked);
        }
        info!("Scheduler: timers started");
    }

    /// Rearm `kind` with the period its regime prescribes.
    pub fn schedule(&self, kind: RequestKind, regime: Regime) -> bool {
        let Some(after) = self.periods.period(kind, regime) else {
            warn!("Scheduler: {} has no timer, schedule ignored", kind);
            return false;
        };
        self.arm(kind, after, regime)
    }

    /// Cancel the pending countdown of `kind` and rearm it at `after`.
    /// Kinds without a timer are a logged no-op.
    pub fn restart(&self, kind: RequestKind, after: Duration) -> bool {
        if slot_of(kind).is_none() {
            warn!("Scheduler: {} has no timer, restart ignored", kind);
            return false;
        }
        self.arm(kind, after, Regime::FastRetry)
    }

    /// [`restart`](Self::restart) for an id taken from untrusted input.
    pub fn restart_id(&self, id: i64, after: Duration) -> bool {
        match RequestKind::try_from(id) {
            Ok(kind) => self.restart(kind, after),
            Err(id) => {
                warn!("Scheduler: restart for non-existent timer {}", id);
                false
            }
        }
    }

    pub fn deadline(&self, kind: RequestKind) -> Option<Instant> {
        self.table.lock(|t| t.borrow().deadline(kind))
    }

    pub fn regime(&self, kind: RequestKind) -> Option<Regime> {
        self.table.lock(|t| t.borrow().regime(kind))
    }

    /// Handle one expiry of `kind`.  The timer is rearmed before the
    /// request is submitted, so a restart issued by a failure during this
    /// cycle takes precedence.
    pub async fn fire(
        &self,
        kind: RequestKind,
        connectivity: &ConnectivityMonitor,
        pipeline: &RequestPipeline,
    ) -> Regime {
        if connectivity.is_linked() {
            self.schedule(kind, Regime::NormalLinked);
            // Refusals are logged by the pipeline; the rearm above retries.
            let _ = pipeline.submit(kind).await;
            Regime::NormalLinked
        } else {
            self.schedule(kind, Regime::NormalUnlinked);
            debug!("Scheduler: {} skipped, link down", kind);
            Regime::NormalUnlinked
        }
    }

    /// Fire every expired timer once.  Returns how many fired.
    pub async fn fire_due(
        &self,
        now: Instant,
        connectivity: &ConnectivityMonitor,
        pipeline: &RequestPipeline,
    ) -> usize {
        let due = self.table.lock(|t| t.borrow_mut().expire(now));
        for &kind in &due {
            info!("Scheduler: {} timer fired", kind);
            self.fire(kind, connectivity, pipeline).await;
        }
        due.len()
    }

    /// Driver loop: sleep until the earliest deadline or until a restart
    /// moves it, then fire whatever is due.
    pub async fn run(&self, connectivity: &ConnectivityMonitor, pipeline: &RequestPipeline) {
        info!("Scheduler: running");
        loop {
            self.fire_due(Instant::now(), connectivity, pipeline).await;

            match self.table.lock(|t| t.borrow().next_deadline()) {
                Some(at) => {
                    let wait = at.saturating_duration_since(Instant::now());
                    let _ = with_timeout(wait, self.rearmed.wait()).await;
                }
                None => self.rearmed.wait().await,
            }
        }
    }

    fn arm(&self, kind: RequestKind, after: Duration, regime: Regime) -> bool {
        let armed = self
            .table
            .lock(|t| t.borrow_mut().arm(kind, after, regime, Instant::now()));
        if armed {
            debug!(
                "Scheduler: {} armed for {}ms ({:?})",
                kind,
                after.as_millis(),
                regime
            );
            self.rearmed.signal(());
        }
        armed
    }
}
