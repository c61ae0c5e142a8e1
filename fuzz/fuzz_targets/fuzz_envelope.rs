//! Fuzz target: `ResponseEnvelope::parse`
//!
//! Feeds arbitrary response bodies to the envelope parser and every
//! display screen.  Parsing and rendering must never panic, and a parsed
//! envelope's kind must agree with its declared id.
//!
//! cargo fuzz run fuzz_envelope

#![no_main]

use accessnode::app::ports::ClockPort;
use accessnode::dispatch::ResponseEnvelope;
use accessnode::display::{DisplayFormatter, screen_for};
use accessnode::pipeline::RequestKind;
use chrono::FixedOffset;
use libfuzzer_sys::fuzz_target;
use std::sync::atomic::{AtomicI64, Ordering};

struct FuzzClock(AtomicI64);

impl ClockPort for FuzzClock {
    fn set_unix_time(&self, secs: i64) {
        self.0.store(secs, Ordering::Relaxed);
    }

    fn unix_time(&self) -> Option<i64> {
        Some(self.0.load(Ordering::Relaxed))
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = ResponseEnvelope::parse(data) else {
        return;
    };

    let kind = envelope.kind();
    assert_eq!(kind, RequestKind::try_from(envelope.type_id()).ok());
    if envelope.grants_access() {
        assert_eq!(kind, Some(RequestKind::AccessCode));
    }

    let clock = FuzzClock(AtomicI64::new(0));
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    for kind in RequestKind::ALL {
        let _ = screen_for(kind).render(&envelope, &clock, &offset);
    }
});
