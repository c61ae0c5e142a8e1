//! Mock port adapters for integration tests.
//!
//! Every mock records what the node core did to it so tests can assert on
//! the full history without a radio, a UART or a backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use accessnode::app::events::NodeEvent;
use accessnode::app::ports::{
    ClockPort, DisplayTransport, EventSink, HttpClient, HttpRequest, LinkPort, PeerAddress,
    PeerTransport,
};
use accessnode::config::NodeConfig;
use accessnode::error::{HttpError, LinkError, PeerSendError};

pub const PEER: PeerAddress = PeerAddress([0x7C, 0xDF, 0xA1, 0xE5, 0x44, 0x30]);

/// Defaults with short delays so retry paths finish quickly.
pub fn fast_config() -> NodeConfig {
    NodeConfig {
        retry_delay_ms: 1,
        admission_wait_ms: 5,
        remote_claim_wait_ms: 5,
        unlock_hold_ms: 5,
        reconnect_fast_ms: 1,
        reconnect_slow_ms: 5,
        ..NodeConfig::default()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NodeEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &NodeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Wall clock frozen at whatever it was last set to (0 = never set).
#[derive(Default)]
pub struct MockClock(AtomicI64);

#[allow(dead_code)]
impl MockClock {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn at(secs: i64) -> Self {
        Self(AtomicI64::new(secs))
    }
}

impl ClockPort for MockClock {
    fn set_unix_time(&self, secs: i64) {
        self.0.store(secs, Ordering::Release);
    }

    fn unix_time(&self) -> Option<i64> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            t => Some(t),
        }
    }
}

// ── Backend ───────────────────────────────────────────────────

/// Scripted backend.  Each URL suffix has a queue of replies; once the
/// queue is empty the URL's default reply is used.
#[derive(Default)]
pub struct MockHttp {
    scripted: HashMap<String, VecDeque<Result<String, HttpError>>>,
    defaults: HashMap<String, Result<String, HttpError>>,
    pub posts: Vec<(String, String)>,
}

#[allow(dead_code)]
impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every POST to `path` fails with `err`.
    pub fn always_fail(mut self, path: &str, err: HttpError) -> Self {
        self.defaults.insert(path.into(), Err(err));
        self
    }

    /// Every POST to `path` answers `body`.
    pub fn always_answer(mut self, path: &str, body: &str) -> Self {
        self.defaults.insert(path.into(), Ok(body.into()));
        self
    }

    /// The next POST to `path` gets `reply`, ahead of the default.
    pub fn then(mut self, path: &str, reply: Result<&str, HttpError>) -> Self {
        self.scripted
            .entry(path.into())
            .or_default()
            .push_back(reply.map(str::to_owned));
        self
    }

    pub fn post_count(&self, path: &str) -> usize {
        self.posts.iter().filter(|(url, _)| url.ends_with(path)).count()
    }

    fn reply_for(&mut self, url: &str) -> Result<String, HttpError> {
        let Some(path) = self
            .defaults
            .keys()
            .chain(self.scripted.keys())
            .find(|p| url.ends_with(p.as_str()))
            .cloned()
        else {
            return Err(HttpError::Io(404));
        };
        if let Some(reply) = self.scripted.get_mut(&path).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.defaults.get(&path).cloned().unwrap_or(Err(HttpError::Io(404)))
    }
}

impl HttpClient for MockHttp {
    fn post(
        &mut self,
        request: &HttpRequest<'_>,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> Result<(), HttpError> {
        self.posts.push((request.url.to_owned(), request.body.to_owned()));
        let body = self.reply_for(request.url)?;
        // Split in two to exercise chunk accumulation.
        let (a, b) = body.as_bytes().split_at(body.len() / 2);
        on_data(a);
        on_data(b);
        Ok(())
    }
}

// ── Actuator peer ─────────────────────────────────────────────

/// ESP-NOW stand-in.  Fails the first `failures` sends with the scripted
/// errors, then succeeds.
pub struct MockPeer {
    failures: Mutex<VecDeque<PeerSendError>>,
    channel: Mutex<u8>,
    pub sent: Mutex<Vec<Vec<u8>>>,
    pub reconfigured: Mutex<Vec<u8>>,
}

#[allow(dead_code)]
impl MockPeer {
    pub fn new(channel: u8) -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            channel: Mutex::new(channel),
            sent: Mutex::new(Vec::new()),
            reconfigured: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(self, errors: impl IntoIterator<Item = PeerSendError>) -> Self {
        self.failures.lock().unwrap().extend(errors);
        self
    }

    /// Simulate the station link moving the radio.
    pub fn move_radio(&self, channel: u8) {
        *self.channel.lock().unwrap() = channel;
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn reconfigured(&self) -> Vec<u8> {
        self.reconfigured.lock().unwrap().clone()
    }
}

impl PeerTransport for MockPeer {
    fn send(&self, _peer: &PeerAddress, payload: &[u8]) -> Result<(), PeerSendError> {
        self.sent.lock().unwrap().push(payload.to_vec());
        match self.failures.lock().unwrap().pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn reconfigure_peer(&self, _peer: &PeerAddress, channel: u8) {
        self.reconfigured.lock().unwrap().push(channel);
    }

    fn current_channel(&self) -> u8 {
        *self.channel.lock().unwrap()
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDisplay {
    pub frames: Vec<Vec<u8>>,
}

#[allow(dead_code)]
impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written frames with the NUL terminator stripped.
    pub fn texts(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|f| String::from_utf8_lossy(f.strip_suffix(&[0]).unwrap_or(f)).into_owned())
            .collect()
    }
}

impl DisplayTransport for MockDisplay {
    fn write(&mut self, bytes: &[u8]) {
        self.frames.push(bytes.to_vec());
    }
}

// ── Station link ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockLink {
    pub connects: u32,
    pub fail_next: bool,
}

impl LinkPort for MockLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.connects += 1;
        if std::mem::take(&mut self.fail_next) {
            return Err(LinkError::ConnectFailed(-1));
        }
        Ok(())
    }
}
