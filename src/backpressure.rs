//! Backpressure on request intake.
//!
//! The router stops taking new submissions while too many decoded responses
//! are waiting to be handed back to callers. This keeps undelivered replies
//! from piling up when requests are produced faster than results are
//! consumed. There is no credit or windowing scheme on top of it.
//!
//! # Configuration
//!
//! - `capacity`: response queue capacity (default: 256)
//! - `divisor`: intake pauses above `capacity / divisor` queued responses (default: 10)

use crate::config::PipelineConfig;

/// Decides whether the router may accept another submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntakeGate {
    /// Highest response queue occupancy at which intake stays open.
    threshold: usize,
}

impl IntakeGate {
    /// Gate for a response queue of `capacity` slots.
    pub fn new(capacity: usize, divisor: usize) -> Self {
        Self {
            threshold: capacity / divisor.max(1),
        }
    }

    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Intake is open while occupancy does not exceed the threshold.
    #[inline]
    pub fn is_open(&self, occupancy: usize) -> bool {
        occupancy <= self.threshold
    }
}

impl From<&PipelineConfig> for IntakeGate {
    fn from(config: &PipelineConfig) -> Self {
        Self::new(config.response_capacity, config.backpressure_divisor)
    }
}
