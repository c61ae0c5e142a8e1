//! End-to-end request flows: timer → pipeline → backend → dispatch → display.

use embassy_time::Instant;
use futures_lite::future::block_on;

use accessnode::app::events::NodeEvent;
use accessnode::app::ports::ClockPort;
use accessnode::error::{AdmissionError, HttpError};
use accessnode::node::Node;
use accessnode::pipeline::{RequestKind, TerminalOutcome};
use accessnode::scheduler::Regime;

use crate::mock_ports::{MockClock, MockDisplay, MockHttp, RecordingSink, fast_config};

fn linked_node(sink: &RecordingSink) -> Node {
    let node = Node::new(fast_config()).unwrap();
    node.on_link_up(sink);
    node
}

/// Run one request through the formatter and transmitter stages.
fn pump(node: &Node, clock: &MockClock, http: &mut MockHttp, sink: &RecordingSink) {
    block_on(async {
        let ctx = node.format_context(clock);
        node.pipeline().format_next(&ctx, node.scheduler(), sink).await;
        if !node.pipeline().outbound().is_empty() {
            node.pipeline()
                .transmit_next(http, &node.dispatch(), node.scheduler(), sink)
                .await;
        }
    });
}

// ── Happy paths ───────────────────────────────────────────────

#[test]
fn time_sync_sets_clock_and_updates_display() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();
    let mut http = MockHttp::new().always_answer(
        "time/",
        r#"{"id":0,"responseCode":1,"serverTime":1700000000}"#,
    );
    let mut display = MockDisplay::new();

    node.start(&sink);
    assert_eq!(
        block_on(node.scheduler().fire(RequestKind::Time, node.connectivity(), node.pipeline())),
        Regime::NormalLinked
    );
    pump(&node, &clock, &mut http, &sink);

    let shown = block_on(node.display().render_next(&mut display, &clock, node.arbiter(), &sink));
    assert_eq!(shown, Some(RequestKind::Time));
    assert_eq!(clock.unix_time(), Some(1_700_000_000));
    assert_eq!(display.texts(), vec!["017 13 20\r".to_string()]);
    assert_eq!(display.frames[0].last(), Some(&0), "frames are NUL-terminated");

    assert_eq!(http.posts.len(), 1);
    assert_eq!(http.posts[0].0, "http://172.20.10.3:8000/time/");
    assert_eq!(http.posts[0].1, "{}");
    assert!(sink.events().contains(&NodeEvent::RequestFinished {
        kind: RequestKind::Time,
        outcome: TerminalOutcome::Delivered { attempts: 1 },
    }));
    assert!(sink.events().contains(&NodeEvent::DisplayUpdated(RequestKind::Time)));
}

#[test]
fn no_reservation_renders_placeholder() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::at(1_700_000_000);
    let mut http = MockHttp::new().always_answer("reserve/", r#"{"id":1,"responseCode":7}"#);
    let mut display = MockDisplay::new();

    block_on(node.pipeline().submit(RequestKind::Reservation)).unwrap();
    pump(&node, &clock, &mut http, &sink);
    block_on(node.display().render_next(&mut display, &clock, node.arbiter(), &sink));

    assert_eq!(http.posts[0].1, r#"{"unixStartTime":"1700000000"}"#);
    assert_eq!(display.texts(), vec![format!("1No{:9}Reservation\r", "")]);
    assert!(node.arbiter().is_idle());
}

#[test]
fn reservation_shows_name_and_local_times() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::at(1_700_000_000);
    let mut http = MockHttp::new().always_answer(
        "reserve/",
        r#"{"id":1,"responseCode":1,"firstName":"Ada","unixStartTime":"1700000000","unixEndTime":1700003600}"#,
    );
    let mut display = MockDisplay::new();

    block_on(node.pipeline().submit(RequestKind::Reservation)).unwrap();
    pump(&node, &clock, &mut http, &sink);
    block_on(node.display().render_next(&mut display, &clock, node.arbiter(), &sink));

    assert_eq!(
        display.texts(),
        vec!["1Reserved:\nAda\n\n05:13PM to 06:13PM\r".to_string()]
    );
}

// ── Failure paths ─────────────────────────────────────────────

#[test]
fn exhausted_time_request_restarts_timer_fast() {
    let sink = RecordingSink::new();
    // Unlinked: submission itself does not look at the link.
    let node = Node::new(fast_config()).unwrap();
    let clock = MockClock::unset();
    let mut http = MockHttp::new().always_fail("time/", HttpError::Timeout);

    node.start(&sink);
    block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    let before = Instant::now();
    pump(&node, &clock, &mut http, &sink);
    let after = Instant::now();

    assert_eq!(http.post_count("time/"), 11);
    assert_eq!(node.scheduler().regime(RequestKind::Time), Some(Regime::FastRetry));

    // Rearmed at the fast interval, not the day-long linked period.
    let fast = node.scheduler().fast_timeout();
    let deadline = node.scheduler().deadline(RequestKind::Time).unwrap();
    assert!(deadline >= before + fast && deadline <= after + fast);
    let linked = node
        .scheduler()
        .periods()
        .period(RequestKind::Time, Regime::NormalLinked)
        .unwrap();
    assert!(fast * 100 < linked, "fast={fast:?} linked={linked:?}");
    assert_eq!(
        sink.count(|e| matches!(
            e,
            NodeEvent::RequestFinished { outcome: TerminalOutcome::Exhausted, .. }
        )),
        1
    );
    assert!(node.display().queue().is_empty());
}

#[test]
fn transient_backend_failure_is_retried() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();
    let mut http = MockHttp::new()
        .then("time/", Err(HttpError::Connect))
        .then("time/", Err(HttpError::Io(500)))
        .always_answer("time/", r#"{"id":0,"responseCode":1,"serverTime":1700000000}"#);

    block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    pump(&node, &clock, &mut http, &sink);

    assert!(sink.events().contains(&NodeEvent::RequestFinished {
        kind: RequestKind::Time,
        outcome: TerminalOutcome::Delivered { attempts: 3 },
    }));
    assert_eq!(node.display().queue().len(), 1);
}

#[test]
fn reservation_without_clock_fails_formatting() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();
    let mut http = MockHttp::new();

    node.start(&sink);
    block_on(node.pipeline().submit(RequestKind::Reservation)).unwrap();
    pump(&node, &clock, &mut http, &sink);

    assert!(http.posts.is_empty());
    assert_eq!(
        node.scheduler().regime(RequestKind::Reservation),
        Some(Regime::FastRetry)
    );
    assert_eq!(node.pipeline().stats().format_failed, 1);
}

#[test]
fn unknown_status_restarts_the_timer_it_names() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::at(1_700_000_000);
    let mut http = MockHttp::new().always_answer("reserve/", r#"{"id":1,"responseCode":5}"#);

    node.start(&sink);
    block_on(node.pipeline().submit(RequestKind::Reservation)).unwrap();
    pump(&node, &clock, &mut http, &sink);

    assert_eq!(
        node.scheduler().regime(RequestKind::Reservation),
        Some(Regime::FastRetry)
    );
    assert!(node.display().queue().is_empty());
}

#[test]
fn garbage_response_is_discarded() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();
    let mut http = MockHttp::new().always_answer("time/", "<html>502</html>");

    node.start(&sink);
    block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    pump(&node, &clock, &mut http, &sink);

    assert!(node.display().queue().is_empty());
    assert_eq!(node.scheduler().regime(RequestKind::Time), Some(Regime::NormalUnlinked));
}

// ── Admission ─────────────────────────────────────────────────

#[test]
fn fourth_submission_is_refused_without_blocking() {
    let node = Node::new(fast_config()).unwrap();
    for kind in [RequestKind::Time, RequestKind::Reservation, RequestKind::Time] {
        block_on(node.pipeline().submit(kind)).unwrap();
    }
    assert_eq!(
        block_on(node.pipeline().submit(RequestKind::Reservation)),
        Err(AdmissionError::GuardTimeout)
    );
    assert_eq!(node.pipeline().intake().admitted(), 3);

    let stats = node.pipeline().stats();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.submit_rejected, 1);
}

#[test]
fn every_lifetime_ends_in_one_outcome() {
    let sink = RecordingSink::new();
    let node = linked_node(&sink);
    let clock = MockClock::unset();
    let mut http = MockHttp::new()
        .then("time/", Ok(r#"{"id":0,"responseCode":1,"serverTime":1700000000}"#))
        .always_fail("time/", HttpError::Timeout);

    block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    block_on(node.pipeline().submit(RequestKind::Reservation)).unwrap();
    block_on(node.pipeline().submit(RequestKind::Time)).unwrap();
    for _ in 0..3 {
        pump(&node, &clock, &mut http, &sink);
    }

    let stats = node.pipeline().stats();
    assert_eq!(stats.finished(), stats.submitted);
    assert_eq!(
        sink.count(|e| matches!(e, NodeEvent::RequestFinished { .. })),
        3
    );
}

// ── Timer gating ──────────────────────────────────────────────

#[test]
fn timer_skips_submission_while_unlinked() {
    let sink = RecordingSink::new();
    let node = Node::new(fast_config()).unwrap();
    node.start(&sink);

    let regime = block_on(node.scheduler().fire(
        RequestKind::Reservation,
        node.connectivity(),
        node.pipeline(),
    ));
    assert_eq!(regime, Regime::NormalUnlinked);
    assert!(node.pipeline().intake().is_empty());

    node.on_link_up(&sink);
    let regime = block_on(node.scheduler().fire(
        RequestKind::Reservation,
        node.connectivity(),
        node.pipeline(),
    ));
    assert_eq!(regime, Regime::NormalLinked);
    assert_eq!(node.pipeline().intake().len(), 1);
}
