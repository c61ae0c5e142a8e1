//! Request body formatters.
//!
//! Each [`RequestKind`] maps to exactly one [`RequestFormatter`] through an
//! exhaustive match, so adding a kind without a formatter does not compile.

use serde_json::json;

use super::request::{PendingRequest, RequestKind};
use crate::access_code::AccessCodeSlot;
use crate::app::ports::ClockPort;
use crate::error::FormatError;

/// Everything a formatter may read.
pub struct FormatContext<'a> {
    pub clock: &'a dyn ClockPort,
    pub access_code: &'a AccessCodeSlot,
}

/// Produces the JSON body for one request kind.
pub trait RequestFormatter: Sync {
    fn body(&self, ctx: &FormatContext<'_>) -> Result<String, FormatError>;
}

struct TimeQuery;
struct ReservationQuery;
struct AccessCodeQuery;

impl RequestFormatter for TimeQuery {
    fn body(&self, _ctx: &FormatContext<'_>) -> Result<String, FormatError> {
        Ok("{}".into())
    }
}

impl RequestFormatter for ReservationQuery {
    fn body(&self, ctx: &FormatContext<'_>) -> Result<String, FormatError> {
        let now = ctx.clock.unix_time().ok_or(FormatError::TimeNotSet)?;
        Ok(json!({ "unixStartTime": now.to_string() }).to_string())
    }
}

impl RequestFormatter for AccessCodeQuery {
    fn body(&self, ctx: &FormatContext<'_>) -> Result<String, FormatError> {
        // Taken first so the code is cleared on every path.
        let code = ctx.access_code.take();
        ctx.clock.unix_time().ok_or(FormatError::TimeNotSet)?;
        let code = code.ok_or(FormatError::NoAccessCode)?;
        Ok(json!({ "accessCode": code.as_str() }).to_string())
    }
}

pub fn formatter_for(kind: RequestKind) -> &'static dyn RequestFormatter {
    match kind {
        RequestKind::Time => &TimeQuery,
        RequestKind::Reservation => &ReservationQuery,
        RequestKind::AccessCode => &AccessCodeQuery,
    }
}

/// Format `kind` into an owned request against `base_url`.
pub fn build_request(
    kind: RequestKind,
    base_url: &str,
    ctx: &FormatContext<'_>,
) -> Result<PendingRequest, FormatError> {
    let body = formatter_for(kind).body(ctx)?;
    let mut url = String::with_capacity(base_url.len() + kind.path().len());
    url.push_str(base_url);
    url.push_str(kind.path());
    Ok(PendingRequest::new(kind, url, body))
}
