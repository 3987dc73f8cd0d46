//! Span construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Sampler;
use crate::export::SpanExporter;

use super::id::{SpanId, TraceId};
use super::span::{SamplingDecision, Span, SpanContext, TagValue};

/// Builds a [`Span`], resolving parent linkage and initial tags.
///
/// The builder is a single-owner value: every method consumes it and
/// returns it, so builder state is never shared or aliased.
#[must_use]
pub struct SpanBuilder {
    name: String,
    tags: HashMap<String, TagValue>,
    parent: Option<Parent>,
    sampler: Sampler,
    exporter: Arc<dyn SpanExporter>,
}

enum Parent {
    /// Live local parent; carries its sampling decision.
    Local {
        context: SpanContext,
        decision: SamplingDecision,
    },
    /// Parent received over the wire; the sampled flag is all we know.
    Remote(SpanContext),
}

impl SpanBuilder {
    pub(crate) fn new(
        name: impl Into<String>,
        sampler: Sampler,
        exporter: Arc<dyn SpanExporter>,
    ) -> Self {
        Self {
            name: name.into(),
            tags: HashMap::new(),
            parent: None,
            sampler,
            exporter,
        }
    }

    /// Adds a tag; the last write for a key wins, silently.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Parents the new span on a live local span.
    ///
    /// The parent's sampling decision is taken now (if still pending) and
    /// inherited, keeping the decision consistent along the ancestry.
    pub fn child_of(mut self, parent: &Span) -> Self {
        let decision = parent.take_sampling_decision();
        self.parent = Some(Parent::Local {
            context: parent.context(),
            decision,
        });
        self
    }

    /// Parents the new span on a context extracted from the wire.
    pub fn child_of_remote(mut self, parent: SpanContext) -> Self {
        self.parent = Some(Parent::Remote(parent));
        self
    }

    /// Allocates the span: status running, started now.
    ///
    /// Roots get a fresh trace id; children join the parent's trace and
    /// inherit its sampling decision.
    pub fn start(self) -> Span {
        let (parent, inherited) = match self.parent {
            Some(Parent::Local { context, decision }) => (Some(context), Some(decision)),
            Some(Parent::Remote(context)) => {
                let decision = if context.sampled {
                    SamplingDecision::Retain
                } else {
                    SamplingDecision::Drop
                };
                (Some(context), Some(decision))
            }
            None => (None, None),
        };
        let trace_id = parent
            .map(|parent| parent.trace_id)
            .unwrap_or_else(TraceId::generate);

        Span::new(
            self.name,
            trace_id,
            SpanId::generate(),
            parent,
            inherited,
            self.tags,
            self.sampler,
            self.exporter,
        )
    }
}
