//! W3C `traceparent` propagation for outbound requests.
//!
//! Injection rewrites the carried request's headers so the downstream
//! service can parent its own spans on ours; extraction accepts the same
//! header on the way in. Malformed headers are ignored, never an error a
//! request could observe.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::TraceError;
use crate::trace::{SpanContext, SpanId, TraceId};

/// Header carrying trace context across process boundaries.
pub const TRACEPARENT: HeaderName = HeaderName::from_static("traceparent");

/// Formats `context` as a `traceparent` value and inserts it into
/// `headers`, replacing any existing value.
pub fn inject(context: SpanContext, headers: &mut HeaderMap) {
    let value = format!(
        "00-{}-{}-{:02x}",
        context.trace_id,
        context.span_id,
        u8::from(context.sampled)
    );
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(TRACEPARENT, value);
    }
}

/// Reads the trace context out of `headers`.
///
/// Absent or malformed headers yield `None`: an unparseable upstream
/// context means "no parent", not a failure.
pub fn extract(headers: &HeaderMap) -> Option<SpanContext> {
    let raw = headers.get(TRACEPARENT)?.to_str().ok()?;
    match parse(raw) {
        Ok(context) => Some(context),
        Err(error) => {
            debug!(%error, "ignoring malformed traceparent header");
            None
        }
    }
}

fn parse(raw: &str) -> Result<SpanContext, TraceError> {
    let parts: Vec<&str> = raw.trim().split('-').collect();
    if parts.len() != 4 {
        return Err(TraceError::Propagation(format!(
            "expected 4 fields, got {}",
            parts.len()
        )));
    }
    if parts[0] != "00" {
        return Err(TraceError::Propagation(format!(
            "unsupported version {:?}",
            parts[0]
        )));
    }
    if parts[1].len() != 32 || parts[2].len() != 16 || parts[3].len() != 2 {
        return Err(TraceError::Propagation("field width mismatch".to_string()));
    }
    let trace_id = u128::from_str_radix(parts[1], 16)
        .map_err(|e| TraceError::Propagation(format!("trace id: {e}")))?;
    let span_id = u64::from_str_radix(parts[2], 16)
        .map_err(|e| TraceError::Propagation(format!("span id: {e}")))?;
    let flags = u8::from_str_radix(parts[3], 16)
        .map_err(|e| TraceError::Propagation(format!("flags: {e}")))?;
    if trace_id == 0 || span_id == 0 {
        return Err(TraceError::Propagation("all-zero id".to_string()));
    }
    Ok(SpanContext {
        trace_id: TraceId::from_u128(trace_id),
        span_id: SpanId::from_u64(span_id),
        sampled: flags & 0x01 == 0x01,
    })
}
