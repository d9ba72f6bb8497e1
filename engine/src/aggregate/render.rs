//! Report rendering
//!
//! Turns a [`ResultTable`] into column tables, one family per metric dimension:
//!
//! - execution time per configuration, `(np)` from the native baseline next to
//!   `(p)` from the profiled run
//! - overhead ratio `p / np` per configuration
//! - every other signal as rows of `(configuration, benchmark)` by problem size
//!
//! Missing cells print as `nan`.

use crate::aggregate::table::{ResultKey, ResultTable, NATIVE};
use crate::extract::MetricDimension;
use crate::matrix::{ProblemSize, RUNTIME_SIGNAL};
use crate::runner::InstrumentationMode;
use crate::sweep::SkippedPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Width of a fixed-format column
pub const CELL_WIDTH: usize = 15;

/// Output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Space-padded columns
    #[default]
    Fixed,
    /// Tab-separated values
    Tsv,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "table" => Ok(Self::Fixed),
            "tsv" | "tab" => Ok(Self::Tsv),
            other => Err(format!("unknown report format '{}' (expected fixed or tsv)", other)),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Tsv => write!(f, "tsv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Value(Option<f64>),
}

impl Cell {
    fn fixed(&self) -> String {
        match self {
            Self::Text(text) => format!("{:<width$}", text, width = CELL_WIDTH),
            Self::Value(Some(v)) => format!("{:<width$.6}", v, width = CELL_WIDTH),
            Self::Value(None) => format!("{:<width$}", "nan", width = CELL_WIDTH),
        }
    }

    fn tsv(&self) -> String {
        match self {
            Self::Text(text) => text.replace('\t', " "),
            Self::Value(Some(v)) => format!("{:.6}", v),
            Self::Value(None) => "nan".to_string(),
        }
    }
}

/// A titled grid of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn render(&self, format: ReportFormat) -> String {
        let mut out = String::new();
        match format {
            ReportFormat::Fixed => {
                let header = self
                    .headers
                    .iter()
                    .map(|h| format!("{:<width$}", h, width = CELL_WIDTH))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&self.title);
                out.push('\n');
                out.push_str(&header);
                out.push('\n');
                out.push_str(&"-".repeat(header.len()));
                out.push('\n');
                for row in &self.rows {
                    let line: Vec<String> = row.iter().map(Cell::fixed).collect();
                    out.push_str(&line.join(" "));
                    out.push('\n');
                }
            }
            ReportFormat::Tsv => {
                out.push_str(&format!("# {}\n", self.title));
                out.push_str(&self.headers.join("\t"));
                out.push('\n');
                for row in &self.rows {
                    let line: Vec<String> = row.iter().map(Cell::tsv).collect();
                    out.push_str(&line.join("\t"));
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Identity of one run
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

impl RunHeader {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}

impl Default for RunHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything printed at the end of a run
#[derive(Debug, Clone)]
pub struct Report {
    pub header: RunHeader,
    pub tables: Vec<Table>,
    pub skipped: Vec<SkippedPoint>,
}

impl Report {
    /// Lay out every table the results support
    pub fn build(header: RunHeader, results: &ResultTable, skipped: &[SkippedPoint]) -> Self {
        let mut profiled: Vec<&str> = results
            .configurations()
            .iter()
            .map(String::as_str)
            .filter(|c| *c != NATIVE)
            .collect();
        if profiled.is_empty() {
            profiled.push(NATIVE);
        }

        let mut tables = Vec::new();
        for config in &profiled {
            tables.push(execution_time_table(results, config));
        }
        for config in &profiled {
            if *config != NATIVE {
                tables.push(overhead_table(results, config));
            }
        }
        for dimension in results.dimensions() {
            for signal in results.signals(dimension) {
                if dimension == MetricDimension::ExecutionTime && signal == RUNTIME_SIGNAL {
                    continue;
                }
                tables.push(signal_table(results, dimension, signal));
            }
        }

        Self {
            header,
            tables,
            skipped: skipped.to_vec(),
        }
    }

    pub fn render(&self, format: ReportFormat) -> String {
        let mut out = String::new();
        let prefix = match format {
            ReportFormat::Fixed => "",
            ReportFormat::Tsv => "# ",
        };
        out.push_str(&format!("{}Run {}\n", prefix, self.header.run_id));
        out.push_str(&format!(
            "{}Started {}\n\n",
            prefix,
            self.header.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        for table in &self.tables {
            out.push_str(&table.render(format));
            out.push('\n');
        }
        if !self.skipped.is_empty() {
            out.push_str(&format!("{}Skipped configurations:\n", prefix));
            for skipped in &self.skipped {
                out.push_str(&format!("{}  {}\n", prefix, skipped));
            }
        }
        out
    }
}

fn runtime_key(config: &str, benchmark: &str, size: ProblemSize, mode: InstrumentationMode) -> ResultKey {
    ResultKey::new(
        MetricDimension::ExecutionTime,
        RUNTIME_SIGNAL,
        config,
        benchmark,
        size,
        mode,
    )
}

fn baseline_mean(results: &ResultTable, benchmark: &str, size: ProblemSize) -> Option<f64> {
    results.mean(&runtime_key(NATIVE, benchmark, size, InstrumentationMode::Baseline))
}

fn profiled_mean(results: &ResultTable, config: &str, benchmark: &str, size: ProblemSize) -> Option<f64> {
    results.mean(&runtime_key(config, benchmark, size, InstrumentationMode::Profiled))
}

/// `Program Name | Small (np) | Small (p) | ...` for one configuration
pub fn execution_time_table(results: &ResultTable, config: &str) -> Table {
    let mut headers = vec!["Program Name".to_string()];
    for size in ProblemSize::ALL {
        headers.push(format!("{} (np)", size.label()));
        headers.push(format!("{} (p)", size.label()));
    }

    let rows = results
        .benchmarks()
        .iter()
        .map(|bench| {
            let mut row = vec![Cell::Text(bench.clone())];
            for size in ProblemSize::ALL {
                row.push(Cell::Value(baseline_mean(results, bench, size)));
                row.push(Cell::Value(profiled_mean(results, config, bench, size)));
            }
            row
        })
        .collect();

    Table {
        title: format!("{}: {}", MetricDimension::ExecutionTime.title(), config),
        headers,
        rows,
    }
}

/// Profiled over baseline run time for one configuration
pub fn overhead_table(results: &ResultTable, config: &str) -> Table {
    let mut headers = vec!["Program Name".to_string()];
    headers.extend(ProblemSize::ALL.iter().map(|s| s.label().to_string()));

    let rows = results
        .benchmarks()
        .iter()
        .map(|bench| {
            let mut row = vec![Cell::Text(bench.clone())];
            for size in ProblemSize::ALL {
                let ratio = match (
                    baseline_mean(results, bench, size),
                    profiled_mean(results, config, bench, size),
                ) {
                    (Some(np), Some(p)) if np != 0.0 => Some(p / np),
                    _ => None,
                };
                row.push(Cell::Value(ratio));
            }
            row
        })
        .collect();

    Table {
        title: format!("Overhead Ratio (p / np): {}", config),
        headers,
        rows,
    }
}

/// Rows of `(configuration, benchmark)` for one signal.
///
/// A configuration appears if it recorded this signal, or if it recorded
/// nothing at all (a skipped build shows up as a block of `nan`).
pub fn signal_table(results: &ResultTable, dimension: MetricDimension, signal: &str) -> Table {
    let mut headers = vec!["Configuration".to_string(), "Program Name".to_string()];
    headers.extend(ProblemSize::ALL.iter().map(|s| s.label().to_string()));

    let key = |config: &str, bench: &str, size: ProblemSize| {
        let mode = if config == NATIVE {
            InstrumentationMode::Baseline
        } else {
            InstrumentationMode::Profiled
        };
        ResultKey::new(dimension, signal, config, bench, size, mode)
    };

    let mut rows = Vec::new();
    for config in results.configurations() {
        let has_signal = results.benchmarks().iter().any(|b| {
            ProblemSize::ALL
                .into_iter()
                .any(|s| results.summary(&key(config.as_str(), b.as_str(), s)).is_some())
        });
        if !has_signal && results.has_cells(config) {
            continue;
        }
        for bench in results.benchmarks() {
            let mut row = vec![Cell::Text(config.clone()), Cell::Text(bench.clone())];
            for size in ProblemSize::ALL {
                row.push(Cell::Value(results.mean(&key(config.as_str(), bench.as_str(), size))));
            }
            rows.push(row);
        }
    }

    Table {
        title: format!("{}: {}", dimension.title(), signal),
        headers,
        rows,
    }
}
