//! Extraction patterns and tracked signals
//!
//! # Grammar
//!
//! A textual pattern is a regular expression with:
//!
//! - group 1: the number, parsed as `f64` (`1.5`, `42`, `3e-4`)
//! - group 2: the unit token, required when the unit policy is `auto`
//!
//! The empty pattern is a sentinel: the signal is the wall-clock duration the
//! runner measured around the process, and the output text is never consulted.

use crate::error::{EngineError, EngineResult};
use crate::extract::units::UnitPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Report table a signal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricDimension {
    /// Benchmark run time, with and without the instrumentation wrapper
    ExecutionTime,
    /// Hash rate and hashing overhead reported by the profiler
    HashThroughput,
    /// Hash collision counts
    Collisions,
    /// Host/device transfer rate
    TransferThroughput,
    /// Accuracy of predicted transfer behaviour
    PredictionAccuracy,
    /// Detected inefficient data-movement patterns
    AntiPatterns,
}

impl MetricDimension {
    pub const ALL: [MetricDimension; 6] = [
        Self::ExecutionTime,
        Self::HashThroughput,
        Self::Collisions,
        Self::TransferThroughput,
        Self::PredictionAccuracy,
        Self::AntiPatterns,
    ];

    /// Table heading
    pub fn title(&self) -> &'static str {
        match self {
            Self::ExecutionTime => "Execution Time Overhead",
            Self::HashThroughput => "Hash Throughput",
            Self::Collisions => "Hash Collisions",
            Self::TransferThroughput => "Transfer Throughput",
            Self::PredictionAccuracy => "Prediction Accuracy",
            Self::AntiPatterns => "Detected Anti-Patterns",
        }
    }
}

impl std::fmt::Display for MetricDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExecutionTime => write!(f, "execution-time"),
            Self::HashThroughput => write!(f, "hash-throughput"),
            Self::Collisions => write!(f, "collisions"),
            Self::TransferThroughput => write!(f, "transfer-throughput"),
            Self::PredictionAccuracy => write!(f, "prediction-accuracy"),
            Self::AntiPatterns => write!(f, "anti-patterns"),
        }
    }
}

/// A compiled extraction pattern
#[derive(Debug, Clone)]
pub enum ExtractionPattern {
    /// Use the caller-measured wall-clock time
    WallClock,
    /// Read the value out of the process output
    Text { regex: Regex, unit: UnitPolicy },
}

impl ExtractionPattern {
    /// Compile a pattern string for `signal` under a unit policy.
    ///
    /// An empty string yields [`ExtractionPattern::WallClock`].
    pub fn compile(signal: &str, pattern: &str, unit: UnitPolicy) -> EngineResult<Self> {
        if pattern.is_empty() {
            return Ok(Self::WallClock);
        }

        let regex = Regex::new(pattern).map_err(|source| EngineError::InvalidPattern {
            signal: signal.to_string(),
            source,
        })?;
        Self::from_regex(signal, regex, unit)
    }

    /// Wrap an already compiled regex, checking its capture groups
    pub fn from_regex(signal: &str, regex: Regex, unit: UnitPolicy) -> EngineResult<Self> {
        // captures_len counts the implicit whole-match group
        let groups = regex.captures_len() - 1;
        if groups < 1 {
            return Err(EngineError::pattern_shape(
                signal,
                "pattern must capture the numeric value in group 1",
            ));
        }
        if unit.captures_unit() && groups < 2 {
            return Err(EngineError::pattern_shape(
                signal,
                "auto unit policy needs the unit token captured in group 2",
            ));
        }
        Ok(Self::Text { regex, unit })
    }

    pub fn is_wall_clock(&self) -> bool {
        matches!(self, Self::WallClock)
    }

    /// Source text of the pattern (empty for wall-clock)
    pub fn as_str(&self) -> &str {
        match self {
            Self::WallClock => "",
            Self::Text { regex, .. } => regex.as_str(),
        }
    }

    pub fn unit(&self) -> UnitPolicy {
        match self {
            Self::WallClock => UnitPolicy::default(),
            Self::Text { unit, .. } => *unit,
        }
    }
}

/// A named signal followed across every run of a sampling session
#[derive(Debug, Clone)]
pub struct TrackedSignal {
    /// Signal identifier, unique within a session
    pub name: String,
    /// Report table this signal is folded into
    pub dimension: MetricDimension,
    /// How to read it from one run
    pub pattern: ExtractionPattern,
}

impl TrackedSignal {
    pub fn new(
        name: impl Into<String>,
        dimension: MetricDimension,
        pattern: ExtractionPattern,
    ) -> Self {
        Self {
            name: name.into(),
            dimension,
            pattern,
        }
    }

    /// Compile a signal from its textual definition
    pub fn compile(
        name: impl Into<String>,
        dimension: MetricDimension,
        pattern: &str,
        unit: UnitPolicy,
    ) -> EngineResult<Self> {
        let name = name.into();
        let pattern = ExtractionPattern::compile(&name, pattern, unit)?;
        Ok(Self::new(name, dimension, pattern))
    }

    /// Wall-clock execution time signal
    pub fn wall_clock(name: impl Into<String>) -> Self {
        Self::new(
            name,
            MetricDimension::ExecutionTime,
            ExtractionPattern::WallClock,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::units::TimeUnit;

    #[test]
    fn test_empty_pattern_is_wall_clock() {
        let pattern = ExtractionPattern::compile("time", "", UnitPolicy::Auto).unwrap();
        assert!(pattern.is_wall_clock());
        assert_eq!(pattern.as_str(), "");
    }

    #[test]
    fn test_pattern_needs_value_group() {
        let err = ExtractionPattern::compile("t", r"Compute time", UnitPolicy::default());
        assert!(matches!(err, Err(EngineError::PatternShape { .. })));
    }

    #[test]
    fn test_auto_pattern_needs_unit_group() {
        let err = ExtractionPattern::compile("t", r"time:\s*([\d.]+)", UnitPolicy::Auto);
        assert!(matches!(err, Err(EngineError::PatternShape { .. })));

        let ok = ExtractionPattern::compile("t", r"time:\s*([\d.]+)\s*(\S+)", UnitPolicy::Auto);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invalid_regex_reports_signal() {
        let err = ExtractionPattern::compile("broken", r"time:\s*([\d.]+", UnitPolicy::Raw)
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_tracked_signal_compile() {
        let signal = TrackedSignal::compile(
            "lud",
            MetricDimension::ExecutionTime,
            r"Time consumed\(ms\):\s*([\d.]+)",
            UnitPolicy::Fixed(TimeUnit::Milliseconds),
        )
        .unwrap();
        assert_eq!(signal.name, "lud");
        assert_eq!(
            signal.pattern.unit(),
            UnitPolicy::Fixed(TimeUnit::Milliseconds)
        );
    }

    #[test]
    fn test_dimension_order_is_report_order() {
        let mut dims = MetricDimension::ALL.to_vec();
        dims.reverse();
        dims.sort();
        assert_eq!(dims, MetricDimension::ALL.to_vec());
    }
}
