//! # Tracewire
//!
//! Request-scoped distributed tracing for outbound HTTP client calls.
//!
//! Tracewire creates one span per outbound request, propagates trace
//! context across threads and async boundaries, records the response or
//! error outcome on the span, and guarantees the span is finished exactly
//! once whether the request succeeds, fails, or is cancelled.
//!
//! ## Features
//!
//! * Per-request [`RequestHandler`] façade around any HTTP client
//! * Immutable [`Context`] with scoped, stack-disciplined activation
//! * W3C `traceparent` header injection and extraction
//! * Eager, ancestry-consistent sampling
//! * Pluggable [`SpanExporter`] backends
//! * Optional Tower [`layer`](client::layer) for async client stacks
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tracewire::{InMemoryExporter, RequestHandler, Tracer, TracerOptions};
//!
//! let exporter = Arc::new(InMemoryExporter::new());
//! let tracer = Tracer::new(TracerOptions::default(), exporter.clone()).unwrap();
//!
//! let request = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.example.com/orders/42")
//!     .body(())
//!     .unwrap();
//!
//! let mut handler = RequestHandler::start(&tracer, request);
//! let scope = handler.activate();
//! let request = handler.request().unwrap();
//! // ... hand `request` to the transport ...
//! let outcome: Result<http::Response<()>, std::io::Error> =
//!     Ok(http::Response::builder().status(200).body(()).unwrap());
//! handler.process_response(&outcome);
//! handler.finish();
//! scope.close();
//!
//! assert_eq!(exporter.finished().len(), 1);
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod export;
pub mod metrics;
pub mod trace;

pub use client::RequestHandler;
#[cfg(feature = "layer")]
pub use client::TraceLayer;
pub use config::{Sampler, TracerOptions};
pub use context::{Context, FutureExt, Scope};
pub use error::TraceError;
pub use export::{ChannelExporter, FinishedSpan, InMemoryExporter, NoopExporter, SpanExporter};
pub use trace::{
    Outcome, SamplingDecision, Span, SpanBuilder, SpanContext, SpanId, TagValue, TraceId, Tracer,
    global_tracer, set_global_tracer,
};
