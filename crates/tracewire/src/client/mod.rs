//! HTTP client integration: the per-request handler, trace-context
//! propagation, and the optional Tower middleware.

pub mod handler;
#[cfg(feature = "layer")]
pub mod layer;
pub mod propagation;

pub use handler::RequestHandler;
#[cfg(feature = "layer")]
pub use layer::{TraceLayer, TraceService, TracedResponseFuture};
pub use propagation::{TRACEPARENT, extract, inject};
