//! Sweep Engine Library
//!
//! Measurement and aggregation core for driving external benchmark
//! executables, with and without an instrumentation wrapper, across a set of
//! rebuilt target configurations.
//!
//! # Components
//!
//! - [`extract`]: reads numeric signals out of free-form process output
//!   (last match wins, units normalized to seconds)
//! - [`runner`]: runs one command in a benchmark directory and restores the
//!   previous working directory afterwards
//! - [`sampler`]: warm-up then measuring loop with confidence-interval early stop
//! - [`sweep`]: rebuilds the target per configuration point, skipping failed builds
//! - [`aggregate`]: folds session means into a keyed table and renders it
//! - [`matrix`]: the benchmark table everything above iterates over
//!
//! # Flow
//!
//! ```text
//! ConfigurationSweep ─→ AdaptiveSampler (per benchmark × size) ─→ SampleRunner
//!         │                        │                                  │
//!         │                        └── MetricExtractor per run ←──────┘
//!         └──────────────→ ResultTable ─→ Report
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod aggregate;
pub mod error;
pub mod extract;
pub mod matrix;
pub mod runner;
pub mod sampler;
pub mod sweep;

pub use aggregate::{Report, ReportFormat, ResultKey, ResultTable, RunHeader, NATIVE};
pub use error::{EngineError, EngineResult};
pub use extract::{
    ExtractionPattern, MetricDimension, MetricExtractor, ProfilerSignal, TrackedSignal, UnitPolicy,
};
pub use matrix::{BenchmarkEntry, BenchmarkMatrix, BenchmarkSpec, ProblemSize, RUNTIME_SIGNAL};
pub use runner::{CommandExecutor, InstrumentationMode, SampleRunner, ShellExecutor};
pub use sampler::{AdaptiveSampler, SamplerConfig, SamplingOutcome, StopReason};
pub use sweep::{
    CmakeBuilder, ConfigurationPoint, ConfigurationSweep, PrebuiltTarget, SweepReport,
    TargetBuilder,
};
