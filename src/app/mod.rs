//! Application layer — port traits and structured events.
//!
//! ```text
//!  ┌───────────┐   ┌────────────┐   ┌───────────────┐
//!  │ Adapters  │──▶│   Ports    │──▶│  Node core    │
//!  │ (outer)   │   │ (traits)   │   │ (pipelines)   │
//!  └───────────┘   └────────────┘   └───────┬───────┘
//!                                           │
//!                                   NodeEvent ──▶ EventSink
//! ```

pub mod events;
pub mod ports;
