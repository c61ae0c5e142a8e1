//! Response dispatch against a real scheduler and display pipeline.

use futures_lite::future::block_on;

use accessnode::dispatch::DispatchOutcome;
use accessnode::node::Node;
use accessnode::pipeline::RequestKind;
use accessnode::scheduler::Regime;

use crate::mock_ports::{RecordingSink, fast_config};

fn started_node() -> Node {
    let node = Node::new(fast_config()).unwrap();
    node.start(&RecordingSink::new());
    node
}

#[test]
fn accepted_codes_reach_the_display() {
    let node = started_node();
    let dispatch = node.dispatch();
    for (body, kind) in [
        (&br#"{"id":0,"responseCode":1,"serverTime":1}"#[..], RequestKind::Time),
        (br#"{"id":1,"responseCode":7}"#, RequestKind::Reservation),
        (br#"{"id":2,"responseCode":2}"#, RequestKind::AccessCode),
    ] {
        assert_eq!(block_on(dispatch.handle(body)), DispatchOutcome::Queued(kind));
    }
    assert_eq!(node.display().queue().len(), 3);
}

#[test]
fn full_display_queue_drops_without_blocking() {
    let node = started_node();
    let dispatch = node.dispatch();
    let body = br#"{"id":1,"responseCode":7}"#;
    for _ in 0..3 {
        block_on(dispatch.handle(body));
    }
    assert_eq!(block_on(dispatch.handle(body)), DispatchOutcome::Dropped);
    assert_eq!(node.display().queue().len(), 3);
}

#[test]
fn unexpected_code_restarts_only_the_named_timer() {
    let node = started_node();
    let dispatch = node.dispatch();

    assert_eq!(
        block_on(dispatch.handle(br#"{"id":0,"responseCode":42}"#)),
        DispatchOutcome::Restarted
    );
    assert_eq!(node.scheduler().regime(RequestKind::Time), Some(Regime::FastRetry));
    assert_eq!(
        node.scheduler().regime(RequestKind::Reservation),
        Some(Regime::NormalUnlinked)
    );
}

#[test]
fn unexpected_code_for_unknown_id_changes_nothing() {
    let node = started_node();
    let before = node.scheduler().deadline(RequestKind::Time);

    assert_eq!(
        block_on(node.dispatch().handle(br#"{"id":9,"responseCode":0}"#)),
        DispatchOutcome::Restarted
    );
    assert_eq!(node.scheduler().deadline(RequestKind::Time), before);
    assert!(node.display().queue().is_empty());
}

#[test]
fn unknown_id_with_known_code_is_discarded() {
    let node = started_node();
    assert_eq!(
        block_on(node.dispatch().handle(br#"{"id":5,"responseCode":1}"#)),
        DispatchOutcome::Discarded
    );
    assert!(node.display().queue().is_empty());
}

#[test]
fn malformed_bodies_are_discarded() {
    let node = started_node();
    for body in [&b""[..], b"null", b"[1,2]", br#"{"id":"0","responseCode":1}"#, b"{\"id\":0,"] {
        assert_eq!(block_on(node.dispatch().handle(body)), DispatchOutcome::Discarded);
    }
}
