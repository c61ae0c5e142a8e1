//! Actuator arbitration: button interrupt vs. validated access code, and
//! the release link that serves the winner.

use core::convert::Infallible;
use std::sync::{Arc, Mutex};

use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin};
use futures_lite::future::block_on;

use accessnode::actuator::{ACK_FRAME, RELEASE_FRAME};
use accessnode::app::events::NodeEvent;
use accessnode::app::ports::PeerAddress;
use accessnode::arbiter::ClaimSource;
use accessnode::dispatch::ResponseEnvelope;
use accessnode::drivers::release_button;
use accessnode::drivers::status_led::{LockIndicator, LockState};
use accessnode::error::PeerSendError;
use accessnode::node::Node;

use crate::mock_ports::{MockClock, MockDisplay, MockPeer, PEER, RecordingSink, fast_config};

fn node() -> Node {
    Node::new(fast_config()).unwrap()
}

// ── Claims ────────────────────────────────────────────────────

#[test]
fn valid_access_code_claims_and_releases() {
    let node = node();
    let sink = RecordingSink::new();
    let clock = MockClock::at(1_700_000_000);
    let peer = MockPeer::new(11);
    let mut display = MockDisplay::new();

    let envelope = ResponseEnvelope::parse(br#"{"id":2,"responseCode":1}"#).unwrap();
    block_on(node.display().push(envelope)).unwrap();
    block_on(node.display().render_next(&mut display, &clock, node.arbiter(), &sink));

    assert_eq!(display.texts(), vec!["23\r".to_string()]);
    assert_eq!(node.arbiter().holder(), Some(ClaimSource::Remote));

    let served = block_on(node.actuator().release_next(&peer, node.arbiter(), &sink, node.unlocked()));
    assert_eq!(served, ClaimSource::Remote);
    assert_eq!(peer.sent(), vec![RELEASE_FRAME.to_vec()]);
    assert!(node.arbiter().is_idle());
    assert!(node.unlocked().signaled());
    assert!(sink.events().contains(&NodeEvent::ActuatorReleased {
        source: ClaimSource::Remote,
        attempts: 1,
    }));
}

#[test]
fn invalid_access_code_never_claims() {
    let node = node();
    let sink = RecordingSink::new();
    let clock = MockClock::at(1_700_000_000);
    let mut display = MockDisplay::new();

    let envelope = ResponseEnvelope::parse(br#"{"id":2,"responseCode":2}"#).unwrap();
    block_on(node.display().push(envelope)).unwrap();
    block_on(node.display().render_next(&mut display, &clock, node.arbiter(), &sink));

    assert_eq!(display.texts(), vec!["24\r".to_string()]);
    assert!(node.arbiter().is_idle());
}

#[test]
fn button_press_blocks_remote_claim_until_released() {
    let node = node();
    let sink = RecordingSink::new();
    let peer = MockPeer::new(11);

    assert!(release_button::on_release_edge(node.arbiter()));
    assert!(!release_button::on_release_edge(node.arbiter()), "second edge is ignored");
    assert!(!block_on(node.arbiter().claim_remote(Duration::from_millis(3))));

    let served = block_on(node.actuator().release_next(&peer, node.arbiter(), &sink, node.unlocked()));
    assert_eq!(served, ClaimSource::Interrupt);
    assert_eq!(peer.sent().len(), 1, "exactly one release per winning claim");

    assert!(block_on(node.arbiter().claim_remote(Duration::from_millis(3))));
}

// ── Release link ──────────────────────────────────────────────

#[test]
fn channel_mismatch_moves_peer_and_retries() {
    let node = node();
    let sink = RecordingSink::new();
    let peer = MockPeer::new(11).failing([PeerSendError::ChannelMismatch]);
    peer.move_radio(6);

    assert!(node.arbiter().claim_from_isr());
    block_on(node.actuator().release_next(&peer, node.arbiter(), &sink, node.unlocked()));

    assert_eq!(peer.reconfigured(), vec![6]);
    assert_eq!(peer.sent().len(), 2);
    assert!(sink.events().contains(&NodeEvent::ActuatorReleased {
        source: ClaimSource::Interrupt,
        attempts: 2,
    }));
}

#[test]
fn exhausted_release_still_returns_token() {
    let node = node();
    let sink = RecordingSink::new();
    let peer = MockPeer::new(11).failing(std::iter::repeat_n(PeerSendError::Other(-1), 11));

    assert!(node.arbiter().claim_from_isr());
    block_on(node.actuator().release_next(&peer, node.arbiter(), &sink, node.unlocked()));

    assert_eq!(peer.sent().len(), 11);
    assert!(peer.reconfigured().is_empty());
    assert!(node.arbiter().is_idle());
    assert!(!node.unlocked().signaled());
    assert_eq!(
        sink.events(),
        vec![NodeEvent::ActuatorReleaseFailed { source: ClaimSource::Interrupt }]
    );
}

#[test]
fn heartbeats_from_peer_are_acknowledged() {
    let node = node();
    let peer = MockPeer::new(11);

    node.actuator().on_peer_frame(&peer, &PEER, b"hb");
    node.actuator()
        .on_peer_frame(&peer, &PeerAddress([0xAA; 6]), b"hb");

    assert_eq!(peer.sent(), vec![ACK_FRAME.to_vec()]);
}

#[test]
fn heartbeat_ack_realigns_channel() {
    let node = node();
    let peer = MockPeer::new(11).failing([PeerSendError::ChannelMismatch]);
    peer.move_radio(1);

    node.actuator().on_peer_frame(&peer, &PEER, b"hb");
    assert_eq!(peer.reconfigured(), vec![1]);
}

// ── Lock indicator ────────────────────────────────────────────

#[derive(Clone, Default)]
struct SharedPin(Arc<Mutex<Vec<bool>>>);

impl SharedPin {
    fn level(&self) -> Option<bool> {
        self.0.lock().unwrap().last().copied()
    }
}

impl ErrorType for SharedPin {
    type Error = Infallible;
}

impl OutputPin for SharedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.lock().unwrap().push(true);
        Ok(())
    }
}

#[test]
fn indicator_shows_unlocked_for_hold_after_release() {
    let node = node();
    let sink = RecordingSink::new();
    let peer = MockPeer::new(11);
    let (red, green) = (SharedPin::default(), SharedPin::default());
    let mut indicator = LockIndicator::new(red.clone(), green.clone());
    assert_eq!((red.level(), green.level()), (Some(true), Some(false)));

    assert!(node.arbiter().claim_from_isr());
    block_on(node.actuator().release_next(&peer, node.arbiter(), &sink, node.unlocked()));
    block_on(indicator.cycle(node.unlocked(), Duration::from_millis(2)));

    assert_eq!(indicator.state(), LockState::Locked);
    // locked → unlocked → locked
    assert_eq!(*green.0.lock().unwrap(), vec![false, true, false]);
    assert_eq!(*red.0.lock().unwrap(), vec![true, false, true]);
}
