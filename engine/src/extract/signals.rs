//! Profiler report signals
//!
//! Lines the instrumentation wrapper prints to stderr at program exit. Which
//! of them appear depends on the options the profiler was built with.

use crate::extract::pattern::{ExtractionPattern, MetricDimension, TrackedSignal};
use crate::extract::units::UnitPolicy;
use regex::Regex;
use std::sync::LazyLock;

// Durations are printed as `<value><unit>` with up to five significant digits,
// which may switch to exponent notation for very long runs.
static EXECUTION_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"execution time\s+([0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)\s*(ns|µs|μs|us|ms|s)\b")
        .unwrap()
});

static ANALYSIS_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"analysis time\s+([0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)\s*(ns|µs|μs|us|ms|s)\b")
        .unwrap()
});

static HASH_OVERHEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"hash overhead\s+([0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)\s*(ns|µs|μs|us|ms|s)\b")
        .unwrap()
});

static HASH_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"avg hash rate\s+([0-9]*\.?[0-9]+)\s*([A-Za-z]+/s)").unwrap());

static COLLISIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Found (\d+) collisions for \d+ unique keys").unwrap());

static COLLISION_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"collision rate of ([0-9]*\.?[0-9]+)%").unwrap());

static TRANSFER_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"avg transfer rate\s+([0-9]*\.?[0-9]+)\s*([A-Za-z]+/s)").unwrap());

static DUPLICATE_TRANSFERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Found (\d+) potential duplicate data transfer\(s\)").unwrap()
});

static ROUND_TRIP_TRANSFERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Found (\d+) potential round trip data transfer\(s\)").unwrap()
});

static REPEATED_ALLOCATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Found (\d+) potential repeated device memory allocation\(s\)").unwrap()
});

static UNUSED_ALLOCATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Found (\d+) potential unused device memory allocation\(s\)").unwrap()
});

static UNUSED_TRANSFERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Found (\d+) potential unused data transfer\(s\)").unwrap()
});

/// A line of the profiler's exit report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilerSignal {
    ExecutionTime,
    AnalysisTime,
    HashOverhead,
    HashRate,
    Collisions,
    CollisionRate,
    TransferRate,
    DuplicateTransfers,
    RoundTripTransfers,
    RepeatedAllocations,
    UnusedAllocations,
    UnusedTransfers,
}

impl ProfilerSignal {
    pub const ALL: [ProfilerSignal; 12] = [
        Self::ExecutionTime,
        Self::AnalysisTime,
        Self::HashOverhead,
        Self::HashRate,
        Self::Collisions,
        Self::CollisionRate,
        Self::TransferRate,
        Self::DuplicateTransfers,
        Self::RoundTripTransfers,
        Self::RepeatedAllocations,
        Self::UnusedAllocations,
        Self::UnusedTransfers,
    ];

    /// Signals every profiler build reports
    pub const ALWAYS: [ProfilerSignal; 7] = [
        Self::ExecutionTime,
        Self::AnalysisTime,
        Self::DuplicateTransfers,
        Self::RoundTripTransfers,
        Self::RepeatedAllocations,
        Self::UnusedAllocations,
        Self::UnusedTransfers,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExecutionTime => "execution_time",
            Self::AnalysisTime => "analysis_time",
            Self::HashOverhead => "hash_overhead",
            Self::HashRate => "hash_rate",
            Self::Collisions => "collisions",
            Self::CollisionRate => "collision_rate",
            Self::TransferRate => "transfer_rate",
            Self::DuplicateTransfers => "duplicate_transfers",
            Self::RoundTripTransfers => "round_trip_transfers",
            Self::RepeatedAllocations => "repeated_allocations",
            Self::UnusedAllocations => "unused_allocations",
            Self::UnusedTransfers => "unused_transfers",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn dimension(&self) -> MetricDimension {
        match self {
            Self::ExecutionTime | Self::AnalysisTime => MetricDimension::ExecutionTime,
            Self::HashOverhead | Self::HashRate => MetricDimension::HashThroughput,
            Self::Collisions | Self::CollisionRate => MetricDimension::Collisions,
            Self::TransferRate => MetricDimension::TransferThroughput,
            Self::DuplicateTransfers
            | Self::RoundTripTransfers
            | Self::RepeatedAllocations
            | Self::UnusedAllocations
            | Self::UnusedTransfers => MetricDimension::AntiPatterns,
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            Self::ExecutionTime => &EXECUTION_TIME,
            Self::AnalysisTime => &ANALYSIS_TIME,
            Self::HashOverhead => &HASH_OVERHEAD,
            Self::HashRate => &HASH_RATE,
            Self::Collisions => &COLLISIONS,
            Self::CollisionRate => &COLLISION_RATE,
            Self::TransferRate => &TRANSFER_RATE,
            Self::DuplicateTransfers => &DUPLICATE_TRANSFERS,
            Self::RoundTripTransfers => &ROUND_TRIP_TRANSFERS,
            Self::RepeatedAllocations => &REPEATED_ALLOCATIONS,
            Self::UnusedAllocations => &UNUSED_ALLOCATIONS,
            Self::UnusedTransfers => &UNUSED_TRANSFERS,
        }
    }

    fn unit(&self) -> UnitPolicy {
        match self {
            Self::ExecutionTime
            | Self::AnalysisTime
            | Self::HashOverhead
            | Self::HashRate
            | Self::TransferRate => UnitPolicy::Auto,
            _ => UnitPolicy::Raw,
        }
    }

    /// Tracked signal reading this line
    pub fn tracked(&self) -> TrackedSignal {
        TrackedSignal::new(
            self.name(),
            self.dimension(),
            ExtractionPattern::Text {
                regex: self.regex().clone(),
                unit: self.unit(),
            },
        )
    }
}

impl std::fmt::Display for ProfilerSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
