//! Span machinery: identifiers, the span record, builders, and the
//! tracer that ties them to a sampling policy and an exporter.

mod builder;
mod id;
mod span;
mod tracer;

pub use builder::SpanBuilder;
pub use id::{SpanId, TraceId};
pub use span::{Outcome, SamplingDecision, Span, SpanContext, TagValue};
pub use tracer::{Tracer, global_tracer, set_global_tracer};
