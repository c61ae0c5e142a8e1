//! Unified error types for the access node firmware.
//!
//! Every subsystem reports failures through a small `Copy` enum of its
//! own; all of them convert into [`Error`] so task loops can log failures
//! uniformly.  None of these are fatal at runtime: each one is resolved by
//! dropping the current attempt and letting the request scheduler retry.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A guarded queue refused an item.
    Admission(AdmissionError),
    /// The actuator peer link rejected a frame.
    Peer(PeerSendError),
    /// A backend POST failed.
    Http(HttpError),
    /// A backend response could not be turned into an envelope.
    Envelope(EnvelopeError),
    /// A request body could not be produced.
    Format(FormatError),
    /// Keypad input was rejected.
    AccessCode(AccessCodeError),
    /// The station link could not be (re)established.
    Link(LinkError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admission(e) => write!(f, "admission: {e}"),
            Self::Peer(e) => write!(f, "peer: {e}"),
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Envelope(e) => write!(f, "envelope: {e}"),
            Self::Format(e) => write!(f, "format: {e}"),
            Self::AccessCode(e) => write!(f, "access code: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Admission errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// No admission unit became free within the bounded wait.
    GuardTimeout,
    /// The queue itself had no free slot.
    QueueFull,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GuardTimeout => write!(f, "admission guard timed out"),
            Self::QueueFull => write!(f, "queue full"),
        }
    }
}

impl From<AdmissionError> for Error {
    fn from(e: AdmissionError) -> Self {
        Self::Admission(e)
    }
}

// ---------------------------------------------------------------------------
// Peer link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSendError {
    /// The peer is registered on a different channel than the radio.
    ChannelMismatch,
    /// Any other driver error (raw ESP-IDF code).
    Other(i32),
}

impl fmt::Display for PeerSendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelMismatch => write!(f, "peer channel mismatch"),
            Self::Other(rc) => write!(f, "send failed (rc={rc})"),
        }
    }
}

impl From<PeerSendError> for Error {
    fn from(e: PeerSendError) -> Self {
        Self::Peer(e)
    }
}

// ---------------------------------------------------------------------------
// HTTP errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Connection to the backend could not be opened.
    Connect,
    /// The request did not complete within its timeout.
    Timeout,
    /// Read/write failure mid-request (raw error code).
    Io(i32),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::Io(rc) => write!(f, "I/O error (rc={rc})"),
        }
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// Envelope errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Body is not a JSON object.
    Malformed,
    /// `id` is absent or not a number.
    MissingId,
    /// `responseCode` is absent or not a number.
    MissingStatus,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "body is not a JSON object"),
            Self::MissingId => write!(f, "missing numeric \"id\""),
            Self::MissingStatus => write!(f, "missing numeric \"responseCode\""),
        }
    }
}

impl From<EnvelopeError> for Error {
    fn from(e: EnvelopeError) -> Self {
        Self::Envelope(e)
    }
}

// ---------------------------------------------------------------------------
// Request formatting errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The request needs wall-clock time and no TIME response arrived yet.
    TimeNotSet,
    /// No access code was pending.
    NoAccessCode,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeNotSet => write!(f, "request made before time set"),
            Self::NoAccessCode => write!(f, "no access code pending"),
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

// ---------------------------------------------------------------------------
// Access code errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCodeError {
    /// Input had the wrong number of characters.
    InvalidLength(usize),
    /// Input contained something other than ASCII digits.
    NotNumeric,
    /// A previous code is still waiting to be sent.
    Busy,
}

impl fmt::Display for AccessCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(n) => write!(f, "invalid access code length ({n})"),
            Self::NotNumeric => write!(f, "access code is not numeric"),
            Self::Busy => write!(f, "access code slot busy"),
        }
    }
}

impl From<AccessCodeError> for Error {
    fn from(e: AccessCodeError) -> Self {
        Self::AccessCode(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// SSID is empty, too long, or not printable ASCII.
    InvalidSsid,
    /// Password length is outside WPA2 bounds.
    InvalidPassword,
    /// The driver refused the connect request (raw error code).
    ConnectFailed(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectFailed(rc) => write!(f, "WiFi connect failed (rc={rc})"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
