//! # Execution Context
//!
//! An immutable, propagatable bag of typed values associated with one
//! logical execution (a request, a callback chain). The context carries
//! the currently active span; scoped activation makes it ambient for the
//! calling thread, and [`FutureExt`] carries it explicitly across async
//! suspension points.

mod future;
mod storage;

pub use future::{FutureExt, WithContext};
pub use storage::Scope;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::trace::Span;

/// An immutable bag of typed entries.
///
/// `Context` is never mutated in place: `with_*` operations layer one
/// entry and return a new context, so a context handed across a
/// suspension point stays valid. Cloning is cheap; the entry map is
/// shared.
#[derive(Clone, Default)]
pub struct Context {
    entries: Option<Arc<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ambient context of the calling thread, or an empty context
    /// when none has been attached.
    pub fn current() -> Self {
        storage::current()
    }

    /// Returns a new context with `value` layered on top of `self`,
    /// replacing any previous entry of the same type.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let mut entries = self.entries.as_deref().cloned().unwrap_or_default();
        entries.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            entries: Some(Arc::new(entries)),
        }
    }

    /// Looks up the entry of type `T`, if any.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.entries
            .as_ref()?
            .get(&TypeId::of::<T>())?
            .downcast_ref()
    }

    /// Returns a new context carrying `span` as the active span.
    pub fn with_span(&self, span: Span) -> Self {
        self.with_value(ActiveSpan(span))
    }

    /// The active span, if one is set.
    pub fn span(&self) -> Option<&Span> {
        self.get::<ActiveSpan>().map(|active| &active.0)
    }

    /// Makes this context ambient for the calling thread until the
    /// returned [`Scope`] is closed.
    pub fn attach(self) -> Scope {
        storage::attach(self)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.as_ref().map_or(0, |e| e.len()))
            .field("span", &self.span().map(Span::context))
            .finish()
    }
}

struct ActiveSpan(Span);
