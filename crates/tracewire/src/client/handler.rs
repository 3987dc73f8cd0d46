//! # Request Handler
//!
//! Per-request façade binding one outbound HTTP request to its span.
//!
//! The call-site obtains a handler before transport I/O begins, sends the
//! (header-augmented) request the handler yields, reports the outcome,
//! and finishes. The handler owns the span for the request's lifetime;
//! dropping it finishes the span too, so an early return, a panic, or a
//! cancelled future cannot leak an unfinished span.

use http::{Request, Response};
use tracing::{debug, warn};

use crate::context::{Context, Scope};
use crate::metrics;
use crate::trace::{Span, Tracer};

use super::propagation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerState {
    Started,
    Succeeded,
    Failed,
    Finished,
}

/// Binds one outbound request to its span and activation scope.
///
/// ```rust
/// use std::sync::Arc;
/// use tracewire::{InMemoryExporter, RequestHandler, Tracer, TracerOptions};
///
/// let tracer = Tracer::new(
///     TracerOptions::default(),
///     Arc::new(InMemoryExporter::new()),
/// ).unwrap();
///
/// let request = http::Request::builder()
///     .method("GET")
///     .uri("/orders/42")
///     .body(())
///     .unwrap();
///
/// let mut handler = RequestHandler::start(&tracer, request);
/// let scope = handler.activate();
/// let request = handler.request().unwrap();
/// // send `request`, collect the outcome ...
/// let outcome: Result<http::Response<()>, std::io::Error> =
///     Ok(http::Response::builder().status(200).body(()).unwrap());
/// handler.process_response(&outcome);
/// handler.finish();
/// scope.close();
/// ```
pub struct RequestHandler<B> {
    span: Span,
    context: Context,
    request: Option<Request<B>>,
    state: HandlerState,
    activated: bool,
}

impl<B> RequestHandler<B> {
    /// Starts a span for `request` as a child of the current context's
    /// active span, takes the sampling decision, and injects the
    /// `traceparent` header into the request.
    pub fn start(tracer: &Tracer, request: Request<B>) -> Self {
        let (mut handler, request) = Self::start_detached(tracer, request);
        handler.request = Some(request);
        handler
    }

    /// Like [`RequestHandler::start`], but hands the request straight
    /// back instead of carrying it. Intended for middleware that needs
    /// the request immediately (the Tower layer uses this).
    pub fn start_detached(tracer: &Tracer, mut request: Request<B>) -> (Self, Request<B>) {
        let path = request.uri().path().to_string();
        let mut builder = tracer
            .span_builder(path.clone())
            .tag("component", tracer.options().component.as_str())
            .tag("http.method", request.method().as_str())
            .tag("path", path)
            .tag("http.version", format!("{:?}", request.version()));

        let ambient = Context::current();
        if let Some(active) = ambient.span() {
            builder = builder.child_of(active);
        }

        let span = builder.start();
        span.take_sampling_decision();

        if tracer.options().propagation {
            propagation::inject(span.context(), request.headers_mut());
        }

        metrics::request_metrics().record_started();

        let handler = Self {
            context: ambient.with_span(span.clone()),
            span,
            request: None,
            state: HandlerState::Started,
            activated: false,
        };
        (handler, request)
    }

    /// The span bound to this request.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// The context holding this request's span as the active span; carry
    /// it across async boundaries with
    /// [`FutureExt::with_context`](crate::FutureExt::with_context).
    pub fn context(&self) -> Context {
        self.context.clone()
    }

    /// Makes this request's context ambient for the calling thread.
    ///
    /// Close (or drop) the returned scope in the same guaranteed-release
    /// block that finishes the handler; it restores the context that was
    /// ambient before the request started.
    pub fn activate(&mut self) -> Scope {
        if self.activated {
            warn!(span = %self.span.context().span_id, "request handler activated twice");
        }
        self.activated = true;
        self.context.clone().attach()
    }

    /// Takes the header-augmented request for sending.
    ///
    /// At most once: the request representation moves to the transport.
    /// A second call (or any call on a detached handler) logs a warning
    /// and yields `None`.
    pub fn request(&mut self) -> Option<Request<B>> {
        if self.request.is_none() {
            warn!(span = %self.span.context().span_id, "request already taken");
        }
        self.request.take()
    }

    /// Reports the transport outcome on the span.
    ///
    /// The outcome is only borrowed, so a transport error stays with the
    /// caller and propagates unchanged after tagging. Success tags the
    /// response status; non-2xx statuses and errors mark the span failed.
    pub fn process_response<B2, E>(&mut self, outcome: &Result<Response<B2>, E>)
    where
        E: std::error::Error,
    {
        if self.state != HandlerState::Started {
            warn!(
                span = %self.span.context().span_id,
                state = ?self.state,
                "response reported out of order"
            );
            return;
        }
        match outcome {
            Ok(response) => {
                let status = response.status();
                self.span.set_tag("status", i64::from(status.as_u16()));
                if status.is_success() {
                    self.span.succeed();
                    self.state = HandlerState::Succeeded;
                    metrics::request_metrics().record_succeeded();
                } else {
                    self.span
                        .fail_with("http", format!("server responded {status}"));
                    self.state = HandlerState::Failed;
                    metrics::request_metrics().record_failed();
                }
            }
            Err(error) => {
                self.span.fail(error);
                self.state = HandlerState::Failed;
                metrics::request_metrics().record_failed();
            }
        }
    }

    /// Sets the span's end time and publishes it.
    ///
    /// Idempotent: a second call (or the drop guard after an explicit
    /// finish) changes nothing.
    pub fn finish(&mut self) {
        if self.state == HandlerState::Finished {
            debug!(span = %self.span.context().span_id, "handler already finished");
            return;
        }
        self.state = HandlerState::Finished;
        self.span.finish();
    }
}

impl<B> Drop for RequestHandler<B> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<B> std::fmt::Debug for RequestHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("span", &self.span)
            .field("state", &self.state)
            .field("request_taken", &self.request.is_none())
            .finish()
    }
}
