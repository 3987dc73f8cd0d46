//! Explicit context propagation across asynchronous boundaries.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use pin_project_lite::pin_project;

use super::Context;

pin_project! {
    /// Future wrapper that attaches a [`Context`] around every poll.
    pub struct WithContext<F> {
        #[pin]
        inner: F,
        context: Context,
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _scope = this.context.clone().attach();
        this.inner.poll(cx)
    }
}

/// Carries a [`Context`] across a suspension boundary.
///
/// Ambient storage is thread-scoped, so a completion polled on an
/// unrelated worker thread would otherwise not see the context that was
/// active at request-issue time. The wrapped future re-attaches the
/// captured context on whichever thread polls it and detaches it when the
/// poll returns.
pub trait FutureExt: Sized {
    /// Attaches the given context around every poll of `self`.
    fn with_context(self, context: Context) -> WithContext<Self>;

    /// Attaches the context that is current at call time.
    fn in_current_context(self) -> WithContext<Self> {
        self.with_context(Context::current())
    }
}

impl<F: Future> FutureExt for F {
    fn with_context(self, context: Context) -> WithContext<Self> {
        WithContext {
            inner: self,
            context,
        }
    }
}
