//! Display output pipeline.
//!
//! Accepted response envelopes queue here (admission-guarded, depth 3).
//! The display task renders each one with the screen for its kind and
//! writes the NUL-terminated frame to the display controller.  A screen
//! that cannot render its envelope produces no frame; the response was
//! already delivered, so the loss is only logged.
//!
//! Frame formats (first byte selects the controller's page):
//!
//! | Kind        | Frame                                             |
//! |-------------|---------------------------------------------------|
//! | TIME        | `0HH MM SS\r`                                     |
//! | RESERVATION | `1Reserved:\n<name>\n\n<hh:mmAM> to <hh:mmPM>\r`  |
//! |             | `1No         Reservation\r`                       |
//! | ACCESS_CODE | `23\r` (granted) / `24\r` (denied)                |

use chrono::{DateTime, FixedOffset};
use embassy_time::Duration;
use log::{debug, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::{ClockPort, DisplayTransport, EventSink};
use crate::arbiter::ActuatorArbiter;
use crate::config::NodeConfig;
use crate::dispatch::{ResponseEnvelope, ResponseStatus};
use crate::error::{AdmissionError, Result};
use crate::pipeline::{GuardedQueue, QUEUE_DEPTH, RequestKind};

/// Renders one kind of envelope into a display frame.
pub trait DisplayFormatter: Sync {
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        clock: &dyn ClockPort,
        offset: &FixedOffset,
    ) -> Option<String>;
}

fn local_time(secs: i64, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(secs, 0).map(|t| t.with_timezone(offset))
}

struct TimeScreen;
struct ReservationScreen;
struct ValidationScreen;

impl DisplayFormatter for TimeScreen {
    /// Also sets the wall clock from `serverTime`.
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        clock: &dyn ClockPort,
        offset: &FixedOffset,
    ) -> Option<String> {
        let server_time = envelope.int_field("serverTime")?;
        clock.set_unix_time(server_time);
        let now = local_time(clock.unix_time()?, offset)?;
        Some(now.format("0%H %M %S\r").to_string())
    }
}

impl DisplayFormatter for ReservationScreen {
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        _clock: &dyn ClockPort,
        offset: &FixedOffset,
    ) -> Option<String> {
        let name = envelope.str_field("firstName");
        let start = envelope.int_field("unixStartTime");
        let end = envelope.int_field("unixEndTime");

        match (name, start, end) {
            (None, None, None) => Some(format!("1No{:9}Reservation\r", "")),
            (Some(name), Some(start), Some(end)) => {
                let start = local_time(start, offset)?.format("%I:%M%p");
                let end = local_time(end, offset)?.format("%I:%M%p");
                Some(format!("1Reserved:\n{name}\n\n{start} to {end}\r"))
            }
            _ => None,
        }
    }
}

impl DisplayFormatter for ValidationScreen {
    fn render(
        &self,
        envelope: &ResponseEnvelope,
        _clock: &dyn ClockPort,
        _offset: &FixedOffset,
    ) -> Option<String> {
        let frame = if envelope.status() == Some(ResponseStatus::Valid) {
            "23\r"
        } else {
            "24\r"
        };
        Some(frame.into())
    }
}

pub fn screen_for(kind: RequestKind) -> &'static dyn DisplayFormatter {
    match kind {
        RequestKind::Time => &TimeScreen,
        RequestKind::Reservation => &ReservationScreen,
        RequestKind::AccessCode => &ValidationScreen,
    }
}

// ───────────────────────────────────────────────────────────────
// Pipeline
// ───────────────────────────────────────────────────────────────

pub struct DisplayPipeline {
    queue: GuardedQueue<ResponseEnvelope, QUEUE_DEPTH>,
    offset: FixedOffset,
    remote_claim_wait: Duration,
}

impl DisplayPipeline {
    pub fn new(config: &NodeConfig) -> Result<Self> {
        Ok(Self {
            queue: GuardedQueue::new(
                "Display",
                config.admission_capacity,
                config.admission_wait(),
            ),
            offset: config.utc_offset()?,
            remote_claim_wait: config.remote_claim_wait(),
        })
    }

    pub async fn push(&self, envelope: ResponseEnvelope) -> core::result::Result<(), AdmissionError> {
        self.queue.push(envelope).await.map_err(|rejected| rejected.reason)
    }

    pub fn queue(&self) -> &GuardedQueue<ResponseEnvelope, QUEUE_DEPTH> {
        &self.queue
    }

    /// Render without writing.  `None` for unknown kinds and for
    /// envelopes their screen cannot render.
    pub fn render(&self, envelope: &ResponseEnvelope, clock: &dyn ClockPort) -> Option<String> {
        let kind = envelope.kind()?;
        screen_for(kind).render(envelope, clock, &self.offset)
    }

    /// Write the next queued envelope.  Returns the kind whose frame was
    /// written, if any.
    pub async fn render_next(
        &self,
        out: &mut impl DisplayTransport,
        clock: &dyn ClockPort,
        arbiter: &ActuatorArbiter,
        sink: &dyn EventSink,
    ) -> Option<RequestKind> {
        let envelope = self.queue.pop().await;
        let kind = envelope.kind()?;

        let Some(text) = self.render(&envelope, clock) else {
            warn!("Display: {} response not renderable, dropped", kind);
            return None;
        };

        let mut frame = text.into_bytes();
        frame.push(0);
        out.write(&frame);
        debug!("Display: {} frame written ({} bytes)", kind, frame.len());
        sink.emit(&NodeEvent::DisplayUpdated(kind));

        if envelope.grants_access() {
            if arbiter.claim_remote(self.remote_claim_wait).await {
                info!("Display: access granted, release requested");
            } else {
                info!("Display: access granted, release already in progress");
            }
        }
        Some(kind)
    }

    pub async fn run(
        &self,
        out: &mut impl DisplayTransport,
        clock: &dyn ClockPort,
        arbiter: &ActuatorArbiter,
        sink: &dyn EventSink,
    ) {
        info!("Display: running");
        loop {
            self.render_next(out, clock, arbiter, sink).await;
        }
    }
}
