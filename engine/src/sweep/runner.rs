//! Configuration sweep
//!
//! Walks an ordered list of configuration points, rebuilding the target for
//! each one and handing successful builds to a measurement callback. A failed
//! configure or compile skips that point and the sweep moves on; only a fatal
//! error from the callback stops it.

use crate::error::EngineResult;
use crate::sweep::builder::{BuildStep, BuildStepResult, TargetBuilder};
use crate::sweep::config_point::ConfigurationPoint;
use std::time::Duration;
use tracing::{error, info};

/// A point whose build succeeded and whose measurements ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPoint {
    pub label: String,
    pub build_time: Duration,
}

/// A point left out of the results because its build failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPoint {
    pub label: String,
    pub step: BuildStep,
    pub exit_code: Option<i32>,
    /// Tail of the failing step's diagnostics
    pub excerpt: String,
}

impl std::fmt::Display for SkippedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{}: {} failed (exit {})", self.label, self.step, code),
            None => write!(f, "{}: {} failed", self.label, self.step),
        }
    }
}

/// Which points ran and which were skipped, in sweep order
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub completed: Vec<CompletedPoint>,
    pub skipped: Vec<SkippedPoint>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn was_skipped(&self, label: &str) -> bool {
        self.skipped.iter().any(|s| s.label == label)
    }
}

/// Target that is already built; every step succeeds without doing anything
#[derive(Debug, Clone, Copy, Default)]
pub struct PrebuiltTarget;

impl TargetBuilder for PrebuiltTarget {
    fn configure(&self, _point: &ConfigurationPoint) -> BuildStepResult {
        BuildStepResult::succeeded(BuildStep::Configure)
    }

    fn compile(&self, _point: &ConfigurationPoint) -> BuildStepResult {
        BuildStepResult::succeeded(BuildStep::Compile)
    }
}

/// Rebuilds the target once per configuration point
pub struct ConfigurationSweep<B> {
    builder: B,
}

impl<B: TargetBuilder> ConfigurationSweep<B> {
    pub fn new(builder: B) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Configure then compile one point
    pub fn rebuild(&self, point: &ConfigurationPoint) -> Result<Duration, SkippedPoint> {
        info!(point = %point.label, "Rebuilding target");
        let configure = self.builder.configure(point);
        if !configure.success {
            return Err(Self::skip(point, &configure));
        }
        let compile = self.builder.compile(point);
        if !compile.success {
            return Err(Self::skip(point, &compile));
        }
        Ok(configure.duration + compile.duration)
    }

    fn skip(point: &ConfigurationPoint, result: &BuildStepResult) -> SkippedPoint {
        let skipped = SkippedPoint {
            label: point.label.clone(),
            step: result.step,
            exit_code: result.exit_code,
            excerpt: result.excerpt(),
        };
        error!(
            point = %point.label,
            step = %result.step,
            exit_code = ?result.exit_code,
            output_tail = %skipped.excerpt,
            "Build failed, skipping configuration point"
        );
        skipped
    }

    /// Rebuild each point in order and call `measure` after every successful
    /// build. An error from `measure` aborts the sweep.
    pub fn run<F>(&self, points: &[ConfigurationPoint], mut measure: F) -> EngineResult<SweepReport>
    where
        F: FnMut(&ConfigurationPoint) -> EngineResult<()>,
    {
        let mut report = SweepReport::default();
        for (i, point) in points.iter().enumerate() {
            info!(
                point = %point.label,
                index = i + 1,
                total = points.len(),
                "Configuration point"
            );
            match self.rebuild(point) {
                Ok(build_time) => {
                    measure(point)?;
                    report.completed.push(CompletedPoint {
                        label: point.label.clone(),
                        build_time,
                    });
                }
                Err(skipped) => report.skipped.push(skipped),
            }
        }
        info!(
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            "Sweep finished"
        );
        Ok(report)
    }
}
