//! Port traits — the hexagonal boundary between the node core and its radios.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ pipelines / arbiter (domain)
//! ```
//!
//! Driven adapters (ESP-NOW, HTTP client, UART display, wall clock,
//! Wi-Fi station, event sinks) implement these traits.  The core consumes
//! them via generics or `&dyn`, so it never touches a driver directly and
//! every path can be exercised on the host with mocks.

use core::fmt;

use embassy_time::Duration;

use crate::error::{HttpError, LinkError, PeerSendError};

// ───────────────────────────────────────────────────────────────
// Actuator peer link
// ───────────────────────────────────────────────────────────────

/// 6-byte station address of a point-to-point peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddress(pub [u8; 6]);

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Connectionless frame transport to the lock actuator.
///
/// Shared between the release task and the radio receive callback, so
/// every method takes `&self`; implementations synchronise internally.
pub trait PeerTransport: Sync {
    /// Send one frame.  `ChannelMismatch` means the peer entry has to be
    /// moved to the radio's current channel before the next attempt.
    fn send(&self, peer: &PeerAddress, payload: &[u8]) -> Result<(), PeerSendError>;

    /// Re-register the peer on `channel`.
    fn reconfigure_peer(&self, peer: &PeerAddress, channel: u8);

    /// Channel the station interface is currently on.
    fn current_channel(&self) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Backend HTTP client
// ───────────────────────────────────────────────────────────────

/// One outbound POST.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub body: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub timeout: Duration,
}

/// Blocking HTTP client.  `on_data` is called zero or more times from
/// within `post` with consecutive chunks of the response body.
pub trait HttpClient {
    fn post(
        &mut self,
        request: &HttpRequest<'_>,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> Result<(), HttpError>;
}

// ───────────────────────────────────────────────────────────────
// Display
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget byte sink towards the display controller.
pub trait DisplayTransport {
    fn write(&mut self, bytes: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Wall clock
// ───────────────────────────────────────────────────────────────

/// Wall-clock time, set exogenously from a TIME response.
pub trait ClockPort: Sync {
    /// Set the clock to `secs` since the Unix epoch and mark it valid.
    fn set_unix_time(&self, secs: i64);

    /// Seconds since the Unix epoch, or `None` until the clock was set.
    fn unix_time(&self) -> Option<i64>;
}

// ───────────────────────────────────────────────────────────────
// Station link
// ───────────────────────────────────────────────────────────────

/// Control side of the station link.  Link state itself arrives through
/// [`ConnectivityMonitor`](crate::connectivity::ConnectivityMonitor).
pub trait LinkPort {
    /// Ask the driver to (re)associate.  Completion is reported through
    /// the link-up / link-down events, not through this return value.
    fn connect(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.  Called from several task threads at once.
pub trait EventSink: Sync {
    fn emit(&self, event: &super::events::NodeEvent);
}
