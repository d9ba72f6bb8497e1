//! ompsweep
//!
//! Drives the profiler's evaluation suite: a baseline pass over every
//! benchmark and problem size, then one rebuild and profiled pass per
//! configuration point, folded into a single report.

#![allow(clippy::uninlined_format_args)]

pub mod cli;
pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, SweepConfig};
pub use orchestrator::{Orchestrator, RunOptions, SweepRun};
