//! # Span
//!
//! A span is one timed, tagged unit of traced work. Spans are created by
//! a [`SpanBuilder`](super::SpanBuilder), mutated only by their owning
//! request handler, and frozen by [`Span::finish`], which publishes them
//! to the exporter when the trace is sampled in.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use tracing::debug;

use crate::config::Sampler;
use crate::export::{FinishedSpan, SpanExporter};
use crate::metrics;

use super::id::{SpanId, TraceId};

/// Identity of a span within its trace.
///
/// This is trace linkage only, never ownership: a parent is referenced by
/// its ids, so finished parents are not kept alive by their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    /// Sampling flag as known when this context was captured or received
    /// over the wire. `false` while the decision is still pending.
    pub sampled: bool,
}

/// A tag value attached to a span.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Float(value)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

/// Final disposition of a span.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// In flight, or finished without a reported outcome.
    Running,
    Succeeded,
    Failed { kind: String, message: String },
}

/// Whether a trace's data is retained for export or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
    Retain,
    Drop,
}

struct SpanState {
    tags: HashMap<String, TagValue>,
    outcome: Outcome,
    started_at: SystemTime,
    start: Instant,
    duration: Option<Duration>,
    sampling: Option<SamplingDecision>,
    finished: bool,
}

/// A mutable record of one traced operation.
///
/// The handle is cheap to clone so a [`Context`](crate::Context) can
/// carry it; mutation belongs to the owning request handler, and
/// collaborators holding a clone only read. Once finished the span is
/// frozen: late tag writes and repeated finishes are logged no-ops.
#[derive(Clone)]
pub struct Span {
    name: Arc<str>,
    trace_id: TraceId,
    span_id: SpanId,
    parent: Option<SpanContext>,
    sampler: Sampler,
    exporter: Arc<dyn SpanExporter>,
    state: Arc<Mutex<SpanState>>,
}

impl Span {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        trace_id: TraceId,
        span_id: SpanId,
        parent: Option<SpanContext>,
        inherited: Option<SamplingDecision>,
        tags: HashMap<String, TagValue>,
        sampler: Sampler,
        exporter: Arc<dyn SpanExporter>,
    ) -> Self {
        Self {
            name: name.into(),
            trace_id,
            span_id,
            parent,
            sampler,
            exporter,
            state: Arc::new(Mutex::new(SpanState {
                tags,
                outcome: Outcome::Running,
                started_at: SystemTime::now(),
                start: Instant::now(),
                duration: None,
                sampling: inherited,
                finished: false,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This span's identity. The `sampled` flag reflects the decision
    /// taken so far; a pending decision reads as not sampled.
    pub fn context(&self) -> SpanContext {
        SpanContext {
            trace_id: self.trace_id,
            span_id: self.span_id,
            sampled: matches!(self.lock().sampling, Some(SamplingDecision::Retain)),
        }
    }

    /// The parent's identity, when this span is not a trace root.
    pub fn parent(&self) -> Option<SpanContext> {
        self.parent
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// The span's outcome as reported so far.
    pub fn outcome(&self) -> Outcome {
        self.lock().outcome.clone()
    }

    /// Reads a single tag.
    pub fn tag(&self, key: &str) -> Option<TagValue> {
        self.lock().tags.get(key).cloned()
    }

    /// Adds or overwrites a tag; the last write for a key wins. Writes
    /// against a finished span are dropped.
    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<TagValue>) {
        let mut state = self.lock();
        if state.finished {
            debug!(span = %self.span_id, "dropping tag write on finished span");
            return;
        }
        state.tags.insert(key.into(), value.into());
    }

    /// Marks the outcome succeeded, unless a failure was already
    /// recorded.
    pub fn succeed(&self) {
        let mut state = self.lock();
        if state.finished {
            debug!(span = %self.span_id, "dropping outcome write on finished span");
            return;
        }
        if state.outcome == Outcome::Running {
            state.outcome = Outcome::Succeeded;
        }
    }

    /// Records `error` on the span and marks the outcome failed.
    ///
    /// The error is only observed: tags are derived from it and the value
    /// stays with the caller, untouched.
    pub fn fail<E>(&self, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let kind = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("error")
            .to_string();
        self.fail_with(kind, error.to_string());
    }

    /// Records a failure with an explicit kind, for failures that are not
    /// represented as an error value (an HTTP 5xx, for instance).
    pub fn fail_with(&self, kind: impl Into<String>, message: impl Into<String>) {
        let kind = kind.into();
        let message = message.into();
        let mut state = self.lock();
        if state.finished {
            debug!(span = %self.span_id, "dropping failure report on finished span");
            return;
        }
        state.tags.insert("error".to_string(), TagValue::Bool(true));
        state
            .tags
            .insert("error.kind".to_string(), TagValue::Str(kind.clone()));
        state
            .tags
            .insert("error.message".to_string(), TagValue::Str(message.clone()));
        state.outcome = Outcome::Failed { kind, message };
    }

    /// Decides once whether this span's data is retained downstream.
    ///
    /// Idempotent: the first call fixes the decision, later calls return
    /// it. Children created under a decided parent inherit the parent's
    /// decision, so a sampled-in parent never has sampled-out children.
    pub fn take_sampling_decision(&self) -> SamplingDecision {
        let mut state = self.lock();
        if let Some(decision) = state.sampling {
            return decision;
        }
        let decision = self.sampler.decide(self.trace_id);
        state.sampling = Some(decision);
        decision
    }

    /// Sets the end time, freezes the span, and publishes it to the
    /// exporter when the trace is sampled in.
    ///
    /// Finishing twice is a logged no-op: one duration is recorded, and
    /// nothing is exported twice. The exporter observes the span only
    /// after every tag write has completed.
    pub fn finish(&self) {
        let snapshot = {
            let mut state = self.lock();
            if state.finished {
                debug!(span = %self.span_id, "span already finished");
                return;
            }
            state.finished = true;
            let duration = state.start.elapsed();
            state.duration = Some(duration);

            let sampler = &self.sampler;
            let trace_id = self.trace_id;
            let decision = *state
                .sampling
                .get_or_insert_with(|| sampler.decide(trace_id));
            if decision == SamplingDecision::Drop {
                metrics::request_metrics().record_sampled_out();
                return;
            }

            FinishedSpan {
                name: self.name.to_string(),
                trace_id: self.trace_id,
                span_id: self.span_id,
                parent_span_id: self.parent.map(|parent| parent.span_id),
                tags: state.tags.clone(),
                outcome: state.outcome.clone(),
                started_at: state.started_at,
                duration,
            }
        };
        self.exporter.export(snapshot);
    }

    fn lock(&self) -> MutexGuard<'_, SpanState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name)
            .field("trace_id", &self.trace_id)
            .field("span_id", &self.span_id)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::Sampler;
    use crate::export::InMemoryExporter;

    use super::super::id::{SpanId, TraceId};
    use super::*;

    fn span_with(exporter: Arc<InMemoryExporter>, sampler: Sampler) -> Span {
        Span::new(
            "test".to_string(),
            TraceId::generate(),
            SpanId::generate(),
            None,
            None,
            HashMap::new(),
            sampler,
            exporter,
        )
    }

    #[test]
    fn test_last_tag_write_wins() {
        let span = span_with(Arc::new(InMemoryExporter::new()), Sampler::Always);
        span.set_tag("key", "first");
        span.set_tag("key", "second");
        assert_eq!(span.tag("key"), Some(TagValue::Str("second".to_string())));
    }

    #[test]
    fn test_tag_writes_after_finish_are_dropped() {
        let exporter = Arc::new(InMemoryExporter::new());
        let span = span_with(exporter.clone(), Sampler::Always);
        span.finish();
        span.set_tag("late", true);

        let finished = exporter.finished();
        assert_eq!(finished.len(), 1);
        assert!(!finished[0].tags.contains_key("late"));
        assert_eq!(span.tag("late"), None);
    }

    #[test]
    fn test_double_finish_exports_once() {
        let exporter = Arc::new(InMemoryExporter::new());
        let span = span_with(exporter.clone(), Sampler::Always);
        span.finish();
        span.finish();
        assert!(span.is_finished());
        assert_eq!(exporter.finished().len(), 1);
    }

    #[test]
    fn test_fail_records_error_tags() {
        let span = span_with(Arc::new(InMemoryExporter::new()), Sampler::Always);
        let error = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline exceeded");
        span.fail(&error);

        assert_eq!(span.tag("error"), Some(TagValue::Bool(true)));
        assert_eq!(span.tag("error.kind"), Some(TagValue::Str("Error".to_string())));
        assert_eq!(
            span.tag("error.message"),
            Some(TagValue::Str("deadline exceeded".to_string()))
        );
        match span.outcome() {
            Outcome::Failed { kind, .. } => assert_eq!(kind, "Error"),
            other => panic!("expected failed outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_sampled_out_span_is_not_exported() {
        let exporter = Arc::new(InMemoryExporter::new());
        let span = span_with(exporter.clone(), Sampler::Never);
        assert_eq!(span.take_sampling_decision(), SamplingDecision::Drop);
        span.finish();
        assert!(exporter.finished().is_empty());
    }

    #[test]
    fn test_sampling_decision_is_idempotent() {
        let span = span_with(Arc::new(InMemoryExporter::new()), Sampler::Ratio(0.5));
        let first = span.take_sampling_decision();
        for _ in 0..8 {
            assert_eq!(span.take_sampling_decision(), first);
        }
    }

    #[test]
    fn test_succeed_does_not_overwrite_failure() {
        let span = span_with(Arc::new(InMemoryExporter::new()), Sampler::Always);
        span.fail_with("http", "server responded 503");
        span.succeed();
        assert!(matches!(span.outcome(), Outcome::Failed { .. }));
    }
}
