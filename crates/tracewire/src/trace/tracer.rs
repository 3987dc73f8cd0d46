//! The tracer: one sampling policy plus one exporter, the factory every
//! span goes through.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::warn;

use crate::config::{Sampler, TracerOptions};
use crate::error::TraceError;
use crate::export::{NoopExporter, SpanExporter};

use super::builder::SpanBuilder;

static GLOBAL: OnceCell<Tracer> = OnceCell::new();

/// Factory for spans bound to one exporter and sampling policy.
///
/// Cloning is cheap; clones share the exporter and options.
#[derive(Clone)]
pub struct Tracer {
    options: Arc<TracerOptions>,
    exporter: Arc<dyn SpanExporter>,
}

impl Tracer {
    /// Creates a tracer after validating the options.
    pub fn new(options: TracerOptions, exporter: Arc<dyn SpanExporter>) -> Result<Self, TraceError> {
        options.sampler.validate()?;
        Ok(Self {
            options: Arc::new(options),
            exporter,
        })
    }

    /// A tracer that samples nothing and exports nowhere.
    pub fn noop() -> Self {
        Self {
            options: Arc::new(TracerOptions {
                sampler: Sampler::Never,
                ..TracerOptions::default()
            }),
            exporter: Arc::new(NoopExporter),
        }
    }

    /// Starts building a span with the given operation name.
    pub fn span_builder(&self, name: impl Into<String>) -> SpanBuilder {
        SpanBuilder::new(name, self.options.sampler.clone(), self.exporter.clone())
    }

    pub fn options(&self) -> &TracerOptions {
        &self.options
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Installs the process-wide default tracer. The first installation wins;
/// later calls are ignored with a warning.
pub fn set_global_tracer(tracer: Tracer) {
    if GLOBAL.set(tracer).is_err() {
        warn!("global tracer already installed, ignoring");
    }
}

/// The process-wide default tracer.
///
/// Until [`set_global_tracer`] runs this is a no-op tracer, so call-sites
/// can trace unconditionally without configuration.
pub fn global_tracer() -> Tracer {
    GLOBAL.get_or_init(Tracer::noop).clone()
}
