//! Adaptive sampling
//!
//! Decides how many repetitions of a benchmark are enough. See
//! [`adaptive`] for the state machine and [`stats`] for the interval math.

pub mod adaptive;
pub mod stats;

pub use adaptive::{
    AdaptiveSampler, ConvergenceCheck, IterationFailure, SamplerConfig, SamplerPhase,
    SamplingOutcome, SignalSamples, StopReason,
};
pub use stats::{
    normal_quantile, z_score, ConfidenceState, SampleSet, SampleSummary,
    MIN_SAMPLES_FOR_CONFIDENCE,
};
