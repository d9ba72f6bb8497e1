//! Metric extraction from free-form process output
//!
//! When a pattern matches more than once, the last match wins: summary lines
//! printed at exit override earlier diagnostic lines of the same shape, and
//! the instrumentation wrapper's report follows the benchmark's own output.

use crate::extract::pattern::{ExtractionPattern, TrackedSignal};
use crate::extract::units::{normalize_with_token, UnitPolicy};
use std::time::Duration;
use tracing::warn;

/// Characters of output quoted in miss diagnostics
const MISS_EXCERPT_CHARS: usize = 400;

/// Why a pattern produced no value for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// Pattern did not match anywhere in the output
    NoMatch,
    /// The captured value is not a number
    UnparsableNumber(String),
    /// Auto unit policy but the unit group did not participate in the match
    MissingUnit,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no match"),
            Self::UnparsableNumber(text) => write!(f, "captured '{}' is not a number", text),
            Self::MissingUnit => write!(f, "unit token not captured"),
        }
    }
}

/// Outcome of applying one pattern to one run
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Canonicalized value (seconds for time units)
    Value(f64),
    /// Observation dropped for this run
    Miss(MissReason),
}

impl Extraction {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Miss(_) => None,
        }
    }
}

/// Applies extraction patterns to captured output
pub struct MetricExtractor;

impl MetricExtractor {
    /// Extract one value from `output`.
    ///
    /// `wall_clock` is the duration measured around the process invocation;
    /// it is the result for the empty (wall-clock) pattern and ignored
    /// otherwise.
    pub fn extract(pattern: &ExtractionPattern, output: &str, wall_clock: Duration) -> Extraction {
        let (regex, unit) = match pattern {
            ExtractionPattern::WallClock => return Extraction::Value(wall_clock.as_secs_f64()),
            ExtractionPattern::Text { regex, unit } => (regex, *unit),
        };

        let Some(captures) = regex.captures_iter(output).last() else {
            return Extraction::Miss(MissReason::NoMatch);
        };

        let Some(number) = captures.get(1) else {
            return Extraction::Miss(MissReason::NoMatch);
        };
        let value = match number.as_str().trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                return Extraction::Miss(MissReason::UnparsableNumber(
                    number.as_str().to_string(),
                ))
            }
        };

        match unit {
            UnitPolicy::Fixed(time_unit) => Extraction::Value(time_unit.to_seconds(value)),
            UnitPolicy::Raw => Extraction::Value(value),
            UnitPolicy::Auto => match captures.get(2) {
                Some(token) => Extraction::Value(normalize_with_token(value, token.as_str().trim())),
                None => Extraction::Miss(MissReason::MissingUnit),
            },
        }
    }

    /// Extract every tracked signal from one run, logging misses.
    ///
    /// The result is index-aligned with `signals`.
    pub fn extract_signals(
        signals: &[TrackedSignal],
        output: &str,
        wall_clock: Duration,
    ) -> Vec<Option<f64>> {
        signals
            .iter()
            .map(|signal| match Self::extract(&signal.pattern, output, wall_clock) {
                Extraction::Value(v) => Some(v),
                Extraction::Miss(reason) => {
                    warn!(
                        signal = %signal.name,
                        pattern = signal.pattern.as_str(),
                        %reason,
                        output_tail = %output_excerpt(output, MISS_EXCERPT_CHARS),
                        "Extraction miss, observation dropped"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Last `max_chars` characters of `output`, for diagnostics
pub fn output_excerpt(output: &str, max_chars: usize) -> String {
    let count = output.chars().count();
    if count <= max_chars {
        return output.to_string();
    }
    let tail: String = output.chars().skip(count - max_chars).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::pattern::MetricDimension;
    use crate::extract::units::TimeUnit;

    fn text(pattern: &str, unit: UnitPolicy) -> ExtractionPattern {
        ExtractionPattern::compile("test", pattern, unit).unwrap()
    }

    #[test]
    fn test_last_match_wins() {
        let pattern = text(r"Compute time:\s*([\d.]+)", UnitPolicy::default());
        let output = "Compute time: 1.0\nwarming up\nCompute time: 2.5\n";
        assert_eq!(
            MetricExtractor::extract(&pattern, output, Duration::ZERO),
            Extraction::Value(2.5)
        );
    }

    #[test]
    fn test_fixed_millisecond_policy() {
        let pattern = text(
            r"Time consumed\(ms\):\s*([\d.]+)",
            UnitPolicy::Fixed(TimeUnit::Milliseconds),
        );
        let output = "Time consumed(ms): 1500.000000\n";
        assert_eq!(
            MetricExtractor::extract(&pattern, output, Duration::ZERO).value(),
            Some(1.5)
        );
    }

    #[test]
    fn test_auto_units_convert_time_and_pass_rates_through() {
        let pattern = text(
            r"execution time\s+([\d.]+)\s*([A-Za-zµμ/%]+)",
            UnitPolicy::Auto,
        );
        let out = "  execution time     2000000µs\n";
        assert_eq!(
            MetricExtractor::extract(&pattern, out, Duration::ZERO).value(),
            Some(2.0)
        );

        let rate = text(r"avg hash rate\s+([\d.]+)\s*(\S+)", UnitPolicy::Auto);
        let out = "  avg hash rate     12.345GB/s\n";
        assert_eq!(
            MetricExtractor::extract(&rate, out, Duration::ZERO).value(),
            Some(12.345)
        );
    }

    #[test]
    fn test_auto_optional_unit_group_missing() {
        let pattern = text(r"time\s+([\d.]+)(ms)?", UnitPolicy::Auto);
        assert_eq!(
            MetricExtractor::extract(&pattern, "time 12", Duration::ZERO),
            Extraction::Miss(MissReason::MissingUnit)
        );
    }

    #[test]
    fn test_wall_clock_ignores_output() {
        let pattern = ExtractionPattern::WallClock;
        let wall = Duration::from_millis(1250);
        for output in ["", "Compute time: 99.0", "garbage\n\n"] {
            assert_eq!(
                MetricExtractor::extract(&pattern, output, wall),
                Extraction::Value(1.25)
            );
        }
    }

    #[test]
    fn test_no_match_and_unparsable() {
        let pattern = text(r"Runtime:\s*([\d.]+)", UnitPolicy::default());
        assert_eq!(
            MetricExtractor::extract(&pattern, "Segmentation fault", Duration::ZERO),
            Extraction::Miss(MissReason::NoMatch)
        );

        let sloppy = text(r"Runtime:\s*(\S+)", UnitPolicy::default());
        assert_eq!(
            MetricExtractor::extract(&sloppy, "Runtime: 1.2.3", Duration::ZERO),
            Extraction::Miss(MissReason::UnparsableNumber("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_extract_signals_is_index_aligned() {
        let signals = vec![
            TrackedSignal::compile(
                "runtime",
                MetricDimension::ExecutionTime,
                r"Runtime:\s*([\d.]+)",
                UnitPolicy::default(),
            )
            .unwrap(),
            TrackedSignal::compile(
                "collisions",
                MetricDimension::Collisions,
                r"Found (\d+) collisions",
                UnitPolicy::Raw,
            )
            .unwrap(),
            TrackedSignal::wall_clock("wall"),
        ];

        let values = MetricExtractor::extract_signals(
            &signals,
            "Runtime: 0.75\n",
            Duration::from_secs(2),
        );
        assert_eq!(values, vec![Some(0.75), None, Some(2.0)]);
    }

    #[test]
    fn test_output_excerpt_keeps_tail() {
        assert_eq!(output_excerpt("short", 10), "short");
        assert_eq!(output_excerpt("abcdefghij", 3), "...hij");
        // multi-byte characters stay intact
        assert_eq!(output_excerpt("1µs2µs", 3), "...2µs");
    }
}
