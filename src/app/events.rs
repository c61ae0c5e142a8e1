//! Outbound node events.
//!
//! The pipelines and the actuator link emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, count them, etc.

use crate::arbiter::ClaimSource;
use crate::pipeline::{RequestKind, TerminalOutcome};

/// Structured events emitted by the node core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// All tasks are running.
    Started,

    /// The station link changed state.
    LinkChanged { linked: bool, consecutive_failures: u8 },

    /// A backend request reached one of its terminal outcomes.
    RequestFinished { kind: RequestKind, outcome: TerminalOutcome },

    /// A frame was written to the display.
    DisplayUpdated(RequestKind),

    /// The actuator acknowledged a release frame.
    ActuatorReleased { source: ClaimSource, attempts: u8 },

    /// Every release attempt failed.
    ActuatorReleaseFailed { source: ClaimSource },
}
