//! Request identities, owned outbound requests, and their terminal outcomes.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// The three backend requests the node can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestKind {
    /// Wall-clock sync.
    Time = 0,
    /// Current/next room reservation.
    Reservation = 1,
    /// Keypad access-code validation.
    AccessCode = 2,
}

impl RequestKind {
    pub const ALL: [Self; 3] = [Self::Time, Self::Reservation, Self::AccessCode];

    /// Numeric id used in response envelopes.
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Path appended to the backend base URL.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Time => "time/",
            Self::Reservation => "reserve/",
            Self::AccessCode => "value/",
        }
    }
}

impl TryFrom<i64> for RequestKind {
    type Error = i64;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Time),
            1 => Ok(Self::Reservation),
            2 => Ok(Self::AccessCode),
            other => Err(other),
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => write!(f, "TIME"),
            Self::Reservation => write!(f, "RESERVATION"),
            Self::AccessCode => write!(f, "ACCESS_CODE"),
        }
    }
}

/// A fully formatted request on its way to the backend.
///
/// Owns its URL and body.  It moves from the formatter stage through the
/// outbound queue to the transmit stage, which consumes it on exactly one
/// terminal path.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingRequest {
    kind: RequestKind,
    url: String,
    body: String,
}

impl PendingRequest {
    pub fn new(kind: RequestKind, url: String, body: String) -> Self {
        Self { kind, url, body }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// How a request lifetime ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalOutcome {
    /// No body could be produced.
    FormatFailed,
    /// The outbound queue refused the formatted request.
    Rejected,
    /// The backend accepted the POST.
    Delivered { attempts: u8 },
    /// Every transmission attempt failed.
    Exhausted,
}

/// Lifetime counters for one request pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU32,
    submit_rejected: AtomicU32,
    format_failed: AtomicU32,
    rejected: AtomicU32,
    delivered: AtomicU32,
    exhausted: AtomicU32,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submitted: u32,
    pub submit_rejected: u32,
    pub format_failed: u32,
    pub rejected: u32,
    pub delivered: u32,
    pub exhausted: u32,
}

impl StatsSnapshot {
    /// Request lifetimes that have ended, on any path.
    pub fn finished(&self) -> u32 {
        self.format_failed + self.rejected + self.delivered + self.exhausted
    }
}

impl PipelineStats {
    pub fn record_submit(&self, admitted: bool) {
        let counter = if admitted {
            &self.submitted
        } else {
            &self.submit_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: TerminalOutcome) {
        let counter = match outcome {
            TerminalOutcome::FormatFailed => &self.format_failed,
            TerminalOutcome::Rejected => &self.rejected,
            TerminalOutcome::Delivered { .. } => &self.delivered,
            TerminalOutcome::Exhausted => &self.exhausted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            submit_rejected: self.submit_rejected.load(Ordering::Relaxed),
            format_failed: self.format_failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}
