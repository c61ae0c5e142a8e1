//! Keypad access-code intake through to the release link.

use futures_lite::future::block_on;

use accessnode::access_code::{AccessCode, IntakeOutcome};
use accessnode::arbiter::ClaimSource;
use accessnode::error::{AccessCodeError, AdmissionError};
use accessnode::node::Node;
use accessnode::pipeline::RequestKind;

use crate::mock_ports::{MockClock, MockDisplay, MockHttp, MockPeer, RecordingSink, fast_config};

fn linked_node(sink: &RecordingSink) -> Node {
    let node = Node::new(fast_config()).unwrap();
    node.on_link_up(sink);
    node
}

#[test]
fn valid_code_is_submitted_and_posted() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::at(1_700_000_000);

    let outcome = block_on(node.intake().on_code_received(b"1234567\r"));
    assert_eq!(outcome, IntakeOutcome::Submitted);
    assert!(node.access_code().is_pending());

    let ctx = node.format_context(&clock);
    block_on(node.pipeline().format_next(&ctx, node.scheduler(), &sink));
    assert!(!node.access_code().is_pending(), "formatting consumes the code");

    let request = node.pipeline().outbound().try_pop().unwrap();
    assert_eq!(request.kind(), RequestKind::AccessCode);
    assert_eq!(request.url(), "http://172.20.10.3:8000/value/");
    assert_eq!(request.body(), r#"{"accessCode":"1234567"}"#);
}

#[test]
fn code_is_discarded_while_unlinked() {
    let node = Node::new(fast_config()).unwrap();
    let outcome = block_on(node.intake().on_code_received(b"1234567"));
    assert_eq!(outcome, IntakeOutcome::Unlinked);
    assert!(!node.access_code().is_pending());
    assert!(node.pipeline().intake().is_empty());
}

#[test]
fn code_is_discarded_while_release_in_progress() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    assert!(node.arbiter().claim_from_isr());

    let outcome = block_on(node.intake().on_code_received(b"7654321\n"));
    assert_eq!(outcome, IntakeOutcome::ReleaseInProgress);
    assert!(!node.access_code().is_pending());
}

#[test]
fn malformed_frames_are_rejected() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);

    assert_eq!(
        block_on(node.intake().on_code_received(b"12345\r")),
        IntakeOutcome::Invalid(AccessCodeError::InvalidLength(5))
    );
    assert_eq!(
        block_on(node.intake().on_code_received(b"12a4567\r")),
        IntakeOutcome::Invalid(AccessCodeError::NotNumeric)
    );
    assert!(node.pipeline().intake().is_empty());
}

#[test]
fn pending_code_makes_next_entry_busy() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let first = AccessCode::parse(b"1111111", 7).unwrap();
    block_on(node.access_code().store(first)).unwrap();

    assert_eq!(
        block_on(node.intake().on_code_received(b"2222222")),
        IntakeOutcome::Invalid(AccessCodeError::Busy)
    );
    assert_eq!(node.access_code().take().unwrap().as_str(), "1111111");
}

#[test]
fn refused_submission_frees_the_slot() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    for _ in 0..3 {
        block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    }

    assert_eq!(
        block_on(node.intake().on_code_received(b"1234567")),
        IntakeOutcome::Dropped(AdmissionError::GuardTimeout)
    );
    assert!(!node.access_code().is_pending());
}

#[test]
fn code_without_wall_clock_is_cleared_on_format_failure() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();

    block_on(node.intake().on_code_received(b"1234567"));
    let ctx = node.format_context(&clock);
    block_on(node.pipeline().format_next(&ctx, node.scheduler(), &sink));

    assert!(!node.access_code().is_pending());
    assert!(node.pipeline().outbound().is_empty());
    assert_eq!(node.pipeline().stats().format_failed, 1);
    // ACCESS_CODE has no timer to restart.
    assert_eq!(node.scheduler().deadline(RequestKind::AccessCode), None);
}

#[test]
fn accepted_code_opens_the_door() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::at(1_700_000_000);
    let mut http = MockHttp::new().always_answer("value/", r#"{"id":2,"responseCode":1}"#);
    let mut display = MockDisplay::new();
    let peer = MockPeer::new(11);

    let served = block_on(async {
        node.intake().on_code_received(b"1234567\r").await;
        let ctx = node.format_context(&clock);
        node.pipeline().format_next(&ctx, node.scheduler(), &sink).await;
        node.pipeline()
            .transmit_next(&mut http, &node.dispatch(), node.scheduler(), &sink)
            .await;
        node.display()
            .render_next(&mut display, &clock, node.arbiter(), &sink)
            .await;
        node.actuator()
            .release_next(&peer, node.arbiter(), &sink, node.unlocked())
            .await
    });

    assert_eq!(served, ClaimSource::Remote);
    assert_eq!(display.texts(), vec!["23\r".to_string()]);
    assert_eq!(peer.sent(), vec![b"1\0".to_vec()]);
    assert_eq!(node.arbiter().holder(), None);
    assert!(node.unlocked().signaled());
    assert_eq!(http.posts[0].1, r#"{"accessCode":"1234567"}"#);
}
