//! Backend request pipeline.
//!
//! ```text
//!  submit(kind) ──▶ intake queue ──▶ formatter ──▶ outbound queue ──▶ transmit
//!     ▲  (guarded, depth 3)            │  (guarded, depth 3)            │
//!     │                                │ format failed                  │ exhausted
//!  timers / keypad                     └──────────▶ restart(kind, fast) ◀┘
//!                                                                       │ delivered
//!                                                          ResponseDispatch ◀┘
//! ```
//!
//! Every admission wait is bounded; only the two consumers block
//! indefinitely, on their own queue.

mod admission;
mod formatter;
mod request;
mod transmit;

pub use admission::{GuardedQueue, Rejected};
pub use formatter::{FormatContext, RequestFormatter, build_request, formatter_for};
pub use request::{PendingRequest, PipelineStats, RequestKind, StatsSnapshot, TerminalOutcome};
pub use transmit::{RequestPipeline, RetryPolicy};

/// Depth of every bounded queue in the node.
pub const QUEUE_DEPTH: usize = 3;
