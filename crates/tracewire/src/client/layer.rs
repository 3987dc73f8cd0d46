//! Tower middleware wrapping HTTP client stacks with a span per request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use http::{Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::context::Context;
use crate::trace::Tracer;

use super::handler::RequestHandler;

/// Tower layer that traces every request through the wrapped service.
///
/// Each call starts a [`RequestHandler`], injects the `traceparent`
/// header, and finishes the span when the response future resolves. The
/// request-time [`Context`] rides inside the returned future and is
/// re-attached on every poll, so the span parentage survives polls on
/// unrelated executor threads.
#[derive(Debug, Clone)]
pub struct TraceLayer {
    tracer: Tracer,
}

impl TraceLayer {
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService {
            inner,
            tracer: self.tracer.clone(),
        }
    }
}

/// Service produced by [`TraceLayer`].
#[derive(Debug, Clone)]
pub struct TraceService<S> {
    inner: S,
    tracer: Tracer,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TraceService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: std::error::Error,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = TracedResponseFuture<S::Future, ReqBody>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let (handler, request) = RequestHandler::start_detached(&self.tracer, request);
        let context = handler.context();

        let future = {
            let _scope = context.clone().attach();
            self.inner.call(request)
        };

        TracedResponseFuture {
            inner: future,
            handler: Some(handler),
            context,
        }
    }
}

pin_project! {
    /// Response future that reports the outcome and finishes the span.
    ///
    /// Dropping the future before completion (cancellation) still
    /// finishes the span through the handler's drop guard.
    pub struct TracedResponseFuture<F, B> {
        #[pin]
        inner: F,
        handler: Option<RequestHandler<B>>,
        context: Context,
    }
}

impl<F, B, ResBody, E> Future for TracedResponseFuture<F, B>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    E: std::error::Error,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _scope = this.context.clone().attach();

        match this.inner.poll(cx) {
            Poll::Ready(result) => {
                if let Some(mut handler) = this.handler.take() {
                    handler.process_response(&result);
                    handler.finish();
                }
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
