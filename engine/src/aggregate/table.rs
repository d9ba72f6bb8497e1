//! Result table
//!
//! Flat map from an explicit composite key to the summary of one sampling
//! session. A key that was never recorded and a session that produced no
//! observations both read back as "no value"; nothing is auto-created on read.

use crate::extract::MetricDimension;
use crate::matrix::ProblemSize;
use crate::runner::InstrumentationMode;
use crate::sampler::SampleSummary;
use std::collections::HashMap;

/// Configuration label baseline sessions are recorded under
pub const NATIVE: &str = "native";

/// Coordinates of one aggregated cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub dimension: MetricDimension,
    pub signal: String,
    pub configuration: String,
    pub benchmark: String,
    pub size: ProblemSize,
    pub mode: InstrumentationMode,
}

impl ResultKey {
    pub fn new(
        dimension: MetricDimension,
        signal: impl Into<String>,
        configuration: impl Into<String>,
        benchmark: impl Into<String>,
        size: ProblemSize,
        mode: InstrumentationMode,
    ) -> Self {
        Self {
            dimension,
            signal: signal.into(),
            configuration: configuration.into(),
            benchmark: benchmark.into(),
            size,
            mode,
        }
    }
}

/// Summaries of every sampling session in a run
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    cells: HashMap<ResultKey, SampleSummary>,
    configurations: Vec<String>,
    benchmarks: Vec<String>,
    signals: Vec<(MetricDimension, String)>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration so it gets rows even if nothing is recorded for it
    pub fn declare_configuration(&mut self, label: &str) {
        push_unique(&mut self.configurations, label.to_string());
    }

    /// Register a benchmark so it gets rows even if nothing is recorded for it
    pub fn declare_benchmark(&mut self, name: &str) {
        push_unique(&mut self.benchmarks, name.to_string());
    }

    /// Store a session summary, replacing any earlier one under the same key
    pub fn record(&mut self, key: ResultKey, summary: SampleSummary) {
        self.declare_configuration(&key.configuration);
        self.declare_benchmark(&key.benchmark);
        push_unique(&mut self.signals, (key.dimension, key.signal.clone()));
        self.cells.insert(key, summary);
    }

    pub fn summary(&self, key: &ResultKey) -> Option<&SampleSummary> {
        self.cells.get(key)
    }

    /// Mean for `key`; `None` when absent or when the session had no samples
    pub fn mean(&self, key: &ResultKey) -> Option<f64> {
        self.cells.get(key).and_then(|s| s.mean)
    }

    /// Configurations in first-seen order
    pub fn configurations(&self) -> &[String] {
        &self.configurations
    }

    /// Benchmarks in first-seen order
    pub fn benchmarks(&self) -> &[String] {
        &self.benchmarks
    }

    /// Signals recorded for a dimension, in first-seen order
    pub fn signals(&self, dimension: MetricDimension) -> Vec<&str> {
        self.signals
            .iter()
            .filter(|(d, _)| *d == dimension)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Dimensions with at least one recorded signal, in table order
    pub fn dimensions(&self) -> Vec<MetricDimension> {
        MetricDimension::ALL
            .into_iter()
            .filter(|d| self.signals.iter().any(|(sd, _)| sd == d))
            .collect()
    }

    /// Whether anything was recorded under a configuration
    pub fn has_cells(&self, configuration: &str) -> bool {
        self.cells.keys().any(|k| k.configuration == configuration)
    }

    /// Recorded cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
