//! Unit tokens and canonicalization
//!
//! Time values are always canonicalized to seconds. Anything else (rates,
//! counts, percentages) passes through untouched.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Time units recognized in benchmark and profiler output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Recognize a unit token, ignoring case. Both the micro sign (U+00B5)
    /// and the Greek mu (U+03BC) are accepted, along with the ASCII `us`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "s" => Some(Self::Seconds),
            "ms" => Some(Self::Milliseconds),
            "µs" | "μs" | "us" => Some(Self::Microseconds),
            "ns" => Some(Self::Nanoseconds),
            _ => None,
        }
    }

    /// Number of this unit in one second
    pub fn per_second(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Milliseconds => 1_000.0,
            Self::Microseconds => 1_000_000.0,
            Self::Nanoseconds => 1_000_000_000.0,
        }
    }

    /// Convert a value in this unit to seconds.
    ///
    /// Divides rather than multiplying by the reciprocal so that values such
    /// as 1500 ms land exactly on 1.5 s.
    pub fn to_seconds(&self, value: f64) -> f64 {
        match self {
            Self::Seconds => value,
            _ => value / self.per_second(),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "µs",
            Self::Nanoseconds => "ns",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// How the captured number of a pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitPolicy {
    /// Every match is in this time unit; converted to seconds
    Fixed(TimeUnit),
    /// The pattern captures the unit as its second group
    Auto,
    /// Counts and rates; never converted
    Raw,
}

impl UnitPolicy {
    /// Whether patterns under this policy need a second capture group
    pub fn captures_unit(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl Default for UnitPolicy {
    fn default() -> Self {
        Self::Fixed(TimeUnit::Seconds)
    }
}

impl FromStr for UnitPolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        let token = s.trim();
        match token.to_ascii_lowercase().as_str() {
            "auto" => return Ok(Self::Auto),
            "raw" | "count" => return Ok(Self::Raw),
            _ => {}
        }
        TimeUnit::from_token(token)
            .map(Self::Fixed)
            .ok_or_else(|| EngineError::UnknownUnit {
                token: token.to_string(),
            })
    }
}

impl TryFrom<String> for UnitPolicy {
    type Error = EngineError;

    fn try_from(value: String) -> EngineResult<Self> {
        value.parse()
    }
}

impl From<UnitPolicy> for String {
    fn from(policy: UnitPolicy) -> Self {
        policy.to_string()
    }
}

impl std::fmt::Display for UnitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(unit) => write!(f, "{}", unit),
            Self::Auto => write!(f, "auto"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// Canonicalize a value captured together with a unit token.
///
/// Time tokens convert to seconds, every other token is opaque and the value
/// passes through unconverted.
pub fn normalize_with_token(value: f64, token: &str) -> f64 {
    match TimeUnit::from_token(token) {
        Some(unit) => unit.to_seconds(value),
        None => value,
    }
}
