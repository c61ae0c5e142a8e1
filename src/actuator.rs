//! Lock actuator peer link.
//!
//! The actuator is a second board reached over a connectionless
//! point-to-point radio link.  Whenever the arbiter hands out its token,
//! this task sends the release frame with bounded retries, then returns
//! the token.  Heartbeat frames from the actuator are acknowledged from the
//! radio receive path.
//!
//! ```text
//!  arbiter.next_claim() ──▶ send "1\0" (≤ max_attempts, retry delay)
//!                               │  ChannelMismatch → reconfigure_peer
//!                               ▼
//!                     ok: unlock indicator ─┐
//!                     exhausted: log ───────┴──▶ arbiter.release()
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use log::{debug, error, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::{EventSink, PeerAddress, PeerTransport};
use crate::arbiter::{ActuatorArbiter, ClaimSource};
use crate::config::NodeConfig;
use crate::error::PeerSendError;
use crate::pipeline::RetryPolicy;

/// Commands the actuator to open the lock.
pub const RELEASE_FRAME: &[u8] = b"1\0";
/// Answer to an actuator heartbeat.
pub const ACK_FRAME: &[u8] = b"2\0";

pub struct ActuatorLink {
    peer: PeerAddress,
    retry: RetryPolicy,
}

impl ActuatorLink {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            peer: PeerAddress(config.peer_mac),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn peer(&self) -> PeerAddress {
        self.peer
    }

    /// Send the release frame.  Returns the attempt that succeeded, or
    /// `None` once the budget is spent.
    pub async fn send_release(&self, transport: &impl PeerTransport) -> Option<u8> {
        for attempt in 1..=self.retry.max_attempts {
            match transport.send(&self.peer, RELEASE_FRAME) {
                Ok(()) => return Some(attempt),
                Err(e) => {
                    debug!("Actuator: release attempt {} failed — {}", attempt, e);
                    self.realign(transport, e);
                }
            }
            if attempt < self.retry.max_attempts {
                Timer::after(self.retry.delay).await;
            }
        }
        None
    }

    /// Serve one arbitration cycle: wait for a claim, send, return the
    /// token.  `unlocked` is signalled after a successful release.
    pub async fn release_next(
        &self,
        transport: &impl PeerTransport,
        arbiter: &ActuatorArbiter,
        sink: &dyn EventSink,
        unlocked: &Signal<CriticalSectionRawMutex, ()>,
    ) -> ClaimSource {
        let source = arbiter.next_claim().await;
        info!("Actuator: release requested ({:?})", source);

        match self.send_release(transport).await {
            Some(attempts) => {
                info!("Actuator: released (attempts={})", attempts);
                sink.emit(&NodeEvent::ActuatorReleased { source, attempts });
                unlocked.signal(());
            }
            None => {
                error!(
                    "Actuator: release failed after {} attempts",
                    self.retry.max_attempts
                );
                sink.emit(&NodeEvent::ActuatorReleaseFailed { source });
            }
        }

        arbiter.release();
        source
    }

    pub async fn run(
        &self,
        transport: &impl PeerTransport,
        arbiter: &ActuatorArbiter,
        sink: &dyn EventSink,
        unlocked: &Signal<CriticalSectionRawMutex, ()>,
    ) {
        info!("Actuator: peer {}", self.peer);
        loop {
            self.release_next(transport, arbiter, sink, unlocked).await;
        }
    }

    /// Radio receive path: acknowledge any frame from the actuator.
    /// Frames from other stations are ignored.
    pub fn on_peer_frame(&self, transport: &impl PeerTransport, from: &PeerAddress, data: &[u8]) {
        if *from != self.peer {
            debug!("Actuator: ignoring {} bytes from {}", data.len(), from);
            return;
        }
        if let Err(e) = transport.send(&self.peer, ACK_FRAME) {
            warn!("Actuator: heartbeat ack failed — {}", e);
            self.realign(transport, e);
        }
    }

    fn realign(&self, transport: &impl PeerTransport, err: PeerSendError) {
        if err == PeerSendError::ChannelMismatch {
            let channel = transport.current_channel();
            info!("Actuator: moving peer {} to channel {}", self.peer, channel);
            transport.reconfigure_peer(&self.peer, channel);
        }
    }
}
