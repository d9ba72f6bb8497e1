//! Build-configuration sweep
//!
//! - [`config_point`]: the parameter sets and how they map to CMake definitions
//! - [`builder`]: the `TargetBuilder` seam and its CMake implementation
//! - [`runner`]: the skip-on-failure loop over points

pub mod builder;
pub mod config_point;
pub mod runner;

pub use builder::{BuildStep, BuildStepResult, CmakeBuilder, TargetBuilder};
pub use config_point::{
    default_points, validate_points, BuildType, ConfigurationPoint, HashAlgorithm,
};
pub use runner::{CompletedPoint, ConfigurationSweep, PrebuiltTarget, SkippedPoint, SweepReport};
