//! Backend response routing.
//!
//! A delivered POST hands its accumulated body here.  The body is parsed
//! into a [`ResponseEnvelope`]; accepted envelopes go to the display
//! pipeline, unknown status codes restart the request's timer, and
//! malformed bodies are logged and dropped.
//!
//! ```text
//!  body ──parse──▶ envelope ──status ∈ {1,2,7}?──yes──▶ DisplayPipeline
//!    │                             │
//!    │ malformed                   no
//!    ▼                             ▼
//!  log + discard          restart(id, fast)  (no-op for unknown ids)
//! ```

use log::{debug, error, warn};
use serde_json::{Map, Value};

use crate::display::DisplayPipeline;
use crate::error::EnvelopeError;
use crate::pipeline::RequestKind;
use crate::scheduler::RequestScheduler;

/// Status codes the backend uses for meaningful answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Valid = 1,
    Invalid = 2,
    NoReservation = 7,
}

impl ResponseStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Valid),
            2 => Some(Self::Invalid),
            7 => Some(Self::NoReservation),
            _ => None,
        }
    }
}

/// A parsed backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    type_id: i64,
    status_code: i64,
    payload: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Parse a response body.  `id` and `responseCode` must both be
    /// present and numeric; every other member is kept as payload.
    pub fn parse(body: &[u8]) -> Result<Self, EnvelopeError> {
        let Ok(Value::Object(payload)) = serde_json::from_slice::<Value>(body) else {
            return Err(EnvelopeError::Malformed);
        };
        let type_id = payload
            .get("id")
            .and_then(as_integer)
            .ok_or(EnvelopeError::MissingId)?;
        let status_code = payload
            .get("responseCode")
            .and_then(as_integer)
            .ok_or(EnvelopeError::MissingStatus)?;
        Ok(Self {
            type_id,
            status_code,
            payload,
        })
    }

    pub fn type_id(&self) -> i64 {
        self.type_id
    }

    pub fn status_code(&self) -> i64 {
        self.status_code
    }

    /// `None` when the declared id names no request kind.
    pub fn kind(&self) -> Option<RequestKind> {
        RequestKind::try_from(self.type_id).ok()
    }

    pub fn status(&self) -> Option<ResponseStatus> {
        ResponseStatus::from_code(self.status_code)
    }

    /// Whether this envelope validates an access code.
    pub fn grants_access(&self) -> bool {
        self.kind() == Some(RequestKind::AccessCode) && self.status() == Some(ResponseStatus::Valid)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Integer member, accepting both JSON numbers and numeric strings.
    pub fn int_field(&self, key: &str) -> Option<i64> {
        match self.payload.get(key)? {
            Value::String(s) => s.trim().parse().ok(),
            v => as_integer(v),
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// What became of one response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the display pipeline.
    Queued(RequestKind),
    /// Unknown status; the declared timer was restarted (if it exists).
    Restarted,
    /// Malformed envelope or unknown kind; logged only.
    Discarded,
    /// The display pipeline refused the envelope.
    Dropped,
}

pub struct ResponseDispatch<'a> {
    pub scheduler: &'a RequestScheduler,
    pub display: &'a DisplayPipeline,
}

impl ResponseDispatch<'_> {
    pub async fn handle(&self, body: &[u8]) -> DispatchOutcome {
        let envelope = match ResponseEnvelope::parse(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Dispatch: {}", e);
                return DispatchOutcome::Discarded;
            }
        };

        if envelope.status().is_none() {
            warn!(
                "Dispatch: unexpected response code {} for id {}",
                envelope.status_code(),
                envelope.type_id()
            );
            self.scheduler
                .restart_id(envelope.type_id(), self.scheduler.fast_timeout());
            return DispatchOutcome::Restarted;
        }

        let Some(kind) = envelope.kind() else {
            warn!("Dispatch: response for unknown id {}", envelope.type_id());
            return DispatchOutcome::Discarded;
        };

        debug!("Dispatch: {} response (code {})", kind, envelope.status_code());
        match self.display.push(envelope).await {
            Ok(()) => DispatchOutcome::Queued(kind),
            Err(e) => {
                warn!("Dispatch: {} response dropped — {}", kind, e);
                DispatchOutcome::Dropped
            }
        }
    }
}
