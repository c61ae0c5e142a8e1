//! Admission-guarded bounded queues.
//!
//! A [`GuardedQueue`] pairs an `embassy-sync` channel with a counting
//! semaphore.  Producers must take one admission unit (bounded wait)
//! before enqueueing; the consumer hands the unit back when it removes
//! the item.  If the enqueue itself fails, the unit is returned by
//! dropping the permit, so capacity can never leak.
//!
//! ```text
//!  producer ──acquire(≤wait)──▶ [ permit ] ──try_send──▶ Channel<T, N>
//!                                   │ disarm on success        │
//!                                   ▼                          ▼
//!                            held by the item ◀──release── consumer.pop()
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::semaphore::{GreedySemaphore, Semaphore};
use embassy_time::{Duration, with_timeout};
use log::warn;

use crate::error::AdmissionError;

/// An item the queue refused, handed back to the producer.
#[derive(Debug)]
pub struct Rejected<T> {
    pub reason: AdmissionError,
    pub item: T,
}

pub struct GuardedQueue<T, const N: usize> {
    name: &'static str,
    guard: GreedySemaphore<CriticalSectionRawMutex>,
    queue: Channel<CriticalSectionRawMutex, T, N>,
    capacity: usize,
    wait: Duration,
    admitted: AtomicUsize,
    peak: AtomicUsize,
}

impl<T, const N: usize> GuardedQueue<T, N> {
    /// `capacity` is clamped to the channel depth `N`.
    pub fn new(name: &'static str, capacity: usize, wait: Duration) -> Self {
        let capacity = capacity.min(N);
        Self {
            name,
            guard: GreedySemaphore::new(capacity),
            queue: Channel::new(),
            capacity,
            wait,
            admitted: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Admit and enqueue `item`, waiting at most the configured bound for
    /// an admission unit.  Never blocks indefinitely.
    pub async fn push(&self, item: T) -> Result<(), Rejected<T>> {
        let Ok(Ok(permit)) = with_timeout(self.wait, self.guard.acquire(1)).await else {
            return Err(Rejected {
                reason: AdmissionError::GuardTimeout,
                item,
            });
        };

        let now = self.admitted.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);

        match self.queue.try_send(item) {
            Ok(()) => {
                // The unit now travels with the item; `pop` returns it.
                permit.disarm();
                Ok(())
            }
            Err(TrySendError::Full(item)) => {
                self.admitted.fetch_sub(1, Ordering::AcqRel);
                warn!("{}: queue full, dropping item", self.name);
                Err(Rejected {
                    reason: AdmissionError::QueueFull,
                    item,
                })
            }
        }
    }

    /// Wait for the next item and return its admission unit.
    pub async fn pop(&self) -> T {
        let item = self.queue.receive().await;
        self.admitted.fetch_sub(1, Ordering::AcqRel);
        self.guard.release(1);
        item
    }

    /// Non-blocking variant of [`pop`](Self::pop).
    pub fn try_pop(&self) -> Option<T> {
        let item = self.queue.try_receive().ok()?;
        self.admitted.fetch_sub(1, Ordering::AcqRel);
        self.guard.release(1);
        Some(item)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently holding an admission unit.
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    /// Highest [`admitted`](Self::admitted) value ever observed.
    pub fn peak_admitted(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
