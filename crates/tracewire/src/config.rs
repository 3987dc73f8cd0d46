//! Tracer configuration.

use crate::error::TraceError;
use crate::trace::{SamplingDecision, TraceId};

/// Sampling policy applied to new trace roots.
///
/// The decision is taken once per trace; spans created under a decided
/// ancestor inherit that decision rather than consulting the sampler
/// again.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampler {
    /// Retain every trace.
    Always,
    /// Drop every trace.
    Never,
    /// Retain roughly the given fraction of traces. The verdict is
    /// derived deterministically from the trace id, so every span of one
    /// trace agrees regardless of where the decision is taken.
    Ratio(f64),
}

impl Sampler {
    pub(crate) fn validate(&self) -> Result<(), TraceError> {
        if let Sampler::Ratio(ratio) = self
            && !(0.0..=1.0).contains(ratio)
        {
            return Err(TraceError::Config(format!(
                "sampling ratio {ratio} outside 0.0..=1.0"
            )));
        }
        Ok(())
    }

    pub(crate) fn decide(&self, trace_id: TraceId) -> SamplingDecision {
        match self {
            Sampler::Always => SamplingDecision::Retain,
            Sampler::Never => SamplingDecision::Drop,
            Sampler::Ratio(ratio) if *ratio <= 0.0 => SamplingDecision::Drop,
            Sampler::Ratio(ratio) if *ratio >= 1.0 => SamplingDecision::Retain,
            Sampler::Ratio(ratio) => {
                let threshold = (ratio * u64::MAX as f64) as u64;
                if (trace_id.to_u128() as u64) < threshold {
                    SamplingDecision::Retain
                } else {
                    SamplingDecision::Drop
                }
            }
        }
    }
}

/// Configuration options for a [`Tracer`](crate::Tracer).
///
/// ```rust
/// use tracewire::{Sampler, TracerOptions};
///
/// let options = TracerOptions {
///     component: "reqwest".to_string(),
///     sampler: Sampler::Ratio(0.25),
///     ..Default::default()
/// };
/// # let _ = options;
/// ```
#[derive(Debug, Clone)]
pub struct TracerOptions {
    /// Value of the `component` tag stamped on every request span.
    pub component: String,
    /// Sampling policy for traces rooted by this tracer.
    pub sampler: Sampler,
    /// Whether outbound requests get a `traceparent` header injected.
    pub propagation: bool,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self {
            component: "http.client".to_string(),
            sampler: Sampler::Always,
            propagation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_validation() {
        assert!(Sampler::Ratio(0.5).validate().is_ok());
        assert!(Sampler::Ratio(0.0).validate().is_ok());
        assert!(Sampler::Ratio(1.0).validate().is_ok());
        assert!(Sampler::Ratio(1.5).validate().is_err());
        assert!(Sampler::Ratio(-0.1).validate().is_err());
    }

    #[test]
    fn test_fixed_samplers() {
        let id = TraceId::generate();
        assert_eq!(Sampler::Always.decide(id), SamplingDecision::Retain);
        assert_eq!(Sampler::Never.decide(id), SamplingDecision::Drop);
        assert_eq!(Sampler::Ratio(1.0).decide(id), SamplingDecision::Retain);
        assert_eq!(Sampler::Ratio(0.0).decide(id), SamplingDecision::Drop);
    }

    #[test]
    fn test_ratio_is_deterministic_per_trace() {
        let sampler = Sampler::Ratio(0.5);
        for _ in 0..64 {
            let id = TraceId::generate();
            let first = sampler.decide(id);
            assert_eq!(first, sampler.decide(id));
        }
    }
}
