//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::pipeline::TerminalOutcome;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &NodeEvent) {
        match event {
            NodeEvent::Started => info!("START | all tasks running"),
            NodeEvent::LinkChanged {
                linked,
                consecutive_failures,
            } => info!(
                "LINK  | {} | failures={}",
                if *linked { "up" } else { "down" },
                consecutive_failures
            ),
            NodeEvent::RequestFinished { kind, outcome } => match outcome {
                TerminalOutcome::Delivered { attempts } => {
                    info!("REQ   | {} delivered | attempts={}", kind, attempts);
                }
                TerminalOutcome::FormatFailed => warn!("REQ   | {} format failed", kind),
                TerminalOutcome::Rejected => warn!("REQ   | {} rejected by outbound queue", kind),
                TerminalOutcome::Exhausted => warn!("REQ   | {} exhausted retries", kind),
            },
            NodeEvent::DisplayUpdated(kind) => info!("DISP  | {} frame", kind),
            NodeEvent::ActuatorReleased { source, attempts } => {
                info!("LOCK  | released by {:?} | attempts={}", source, attempts);
            }
            NodeEvent::ActuatorReleaseFailed { source } => {
                warn!("LOCK  | release by {:?} failed", source);
            }
        }
    }
}
