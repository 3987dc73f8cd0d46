//! # Span Export
//!
//! Finished spans leave the tracing layer through a [`SpanExporter`].
//! Exporters only ever observe frozen spans: [`Span::finish`](crate::Span::finish)
//! snapshots the span after the last tag write and hands the snapshot
//! over by value.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tracing::warn;

use crate::trace::{Outcome, SpanId, TagValue, TraceId};

/// Immutable record of a finished span.
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub name: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub tags: HashMap<String, TagValue>,
    pub outcome: Outcome,
    pub started_at: SystemTime,
    pub duration: Duration,
}

/// Consumer of finished spans.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: FinishedSpan);
}

/// Exporter that discards every span.
#[derive(Debug, Default)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: FinishedSpan) {}
}

/// Buffers finished spans in memory, for tests and local inspection.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    spans: Mutex<Vec<FinishedSpan>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything exported so far.
    pub fn finished(&self) -> Vec<FinishedSpan> {
        self.lock().clone()
    }

    /// Drains the buffer.
    pub fn take(&self) -> Vec<FinishedSpan> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FinishedSpan>> {
        self.spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: FinishedSpan) {
        self.lock().push(span);
    }
}

/// Streams finished spans to a collector task over an unbounded channel.
///
/// Export never blocks the request path; when the collector has gone
/// away, spans are dropped with a warning.
#[derive(Debug)]
pub struct ChannelExporter {
    sender: mpsc::UnboundedSender<FinishedSpan>,
}

impl ChannelExporter {
    /// Returns the exporter and the receiving end for the collector.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FinishedSpan>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl SpanExporter for ChannelExporter {
    fn export(&self, span: FinishedSpan) {
        if let Err(rejected) = self.sender.send(span) {
            warn!(span = %rejected.0.span_id, "collector gone, dropping finished span");
        }
    }
}
