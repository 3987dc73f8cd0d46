//! Thread-scoped storage for the ambient [`Context`].
//!
//! Contexts are attached as a per-thread stack, so concurrent executions
//! can never observe each other's active span. Closing a [`Scope`]
//! restores the context that was ambient when it was opened.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use tracing::warn;

use super::Context;

thread_local! {
    static STACK: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

struct Entry {
    context: Context,
    id: u64,
}

pub(super) fn current() -> Context {
    STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|entry| entry.context.clone())
            .unwrap_or_default()
    })
}

pub(super) fn attach(context: Context) -> Scope {
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    STACK.with(|stack| stack.borrow_mut().push(Entry { context, id }));
    Scope {
        id,
        closed: false,
        _not_send: PhantomData,
    }
}

/// One activation of a [`Context`].
///
/// Closing the scope (or dropping it) restores the previously ambient
/// context. Scopes are bound to the thread that opened them and must be
/// closed there; use
/// [`FutureExt::with_context`](super::FutureExt::with_context) to carry a
/// context across executor threads instead.
#[must_use = "dropping the scope immediately restores the previous context"]
pub struct Scope {
    id: u64,
    closed: bool,
    // Thread-bound: closing on another thread would pop a foreign stack.
    _not_send: PhantomData<*const ()>,
}

impl Scope {
    /// Restores the context that was ambient when this scope was opened.
    ///
    /// Closing out of order is a usage error, not a fatal one: every
    /// scope opened after this one is popped as well, so the stack always
    /// recovers to the most recent still-open ancestor. Closing an
    /// already-closed scope is a logged no-op.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.iter().rposition(|entry| entry.id == self.id) {
                Some(position) => {
                    if position != stack.len() - 1 {
                        warn!(
                            abandoned = stack.len() - 1 - position,
                            "context scope closed out of order"
                        );
                    }
                    stack.truncate(position);
                }
                None => warn!("context scope was already closed"),
            }
        });
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.release();
    }
}
