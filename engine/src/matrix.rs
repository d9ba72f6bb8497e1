//! Benchmark matrix
//!
//! The fixed table of benchmarks a sweep measures. Each entry names a working
//! directory, one shell command per problem size and the patterns that read
//! its own timing lines. The matrix is built once and handed to whoever needs
//! it; nothing here is global.
//!
//! ```toml
//! [[benchmarks]]
//! name = "lud"
//! directory = "src/lud"            # relative to the eval directory
//! commands = ["./lud -s 2000", "./lud -s 4000", "./lud -s 8000"]
//! patterns = ['Time consumed\(ms\):\s*([\d.]+)']
//! unit = "ms"
//!
//! [[benchmarks]]
//! name = "nw"
//! directory = "src/nw"
//! commands = ["./nw 512 10 2", "./nw 2048 10 2", "./nw 8192 10 2"]
//! patterns = [
//!     'Total time:\s*([\d.]+)',
//!     { name = "wall", pattern = "" },
//! ]
//! ```

use crate::error::{EngineError, EngineResult};
use crate::extract::{MetricDimension, TrackedSignal, UnitPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Name given to a benchmark's first pattern when none is set
pub const RUNTIME_SIGNAL: &str = "runtime";

/// Problem-size tier, one command each
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSize {
    Small,
    Medium,
    Large,
}

impl ProblemSize {
    pub const ALL: [ProblemSize; 3] = [Self::Small, Self::Medium, Self::Large];

    pub fn index(&self) -> usize {
        match self {
            Self::Small => 0,
            Self::Medium => 1,
            Self::Large => 2,
        }
    }

    /// Column label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }
}

impl std::fmt::Display for ProblemSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

/// One pattern as written in the matrix file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    /// Bare regex; named and unit-typed from its benchmark
    Plain(String),
    Named {
        name: String,
        pattern: String,
        #[serde(default)]
        dimension: Option<MetricDimension>,
        #[serde(default)]
        unit: Option<UnitPolicy>,
    },
}

/// One benchmark as written in the matrix file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub name: String,
    pub directory: PathBuf,
    pub commands: Vec<String>,
    pub patterns: Vec<PatternEntry>,
    #[serde(default)]
    pub unit: UnitPolicy,
}

#[derive(Debug, Deserialize)]
struct MatrixFile {
    #[serde(default)]
    benchmarks: Vec<BenchmarkEntry>,
}

/// A validated benchmark definition
#[derive(Debug, Clone)]
pub struct BenchmarkSpec {
    pub name: String,
    /// Absolute, or relative to the process's directory at run time
    pub directory: PathBuf,
    /// Indexed by [`ProblemSize::index`]
    pub commands: [String; 3],
    /// Own output signals; the first is the benchmark's run time
    pub signals: Vec<TrackedSignal>,
    /// Policy applied to patterns that do not set their own
    pub unit: UnitPolicy,
}

impl BenchmarkSpec {
    /// Validate an entry and compile its patterns; relative directories are
    /// joined onto `base`
    pub fn from_entry(entry: BenchmarkEntry, base: &Path) -> EngineResult<Self> {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::invalid_benchmark(
                entry.name,
                "name must not be empty",
            ));
        }

        let commands: [String; 3] = entry.commands.try_into().map_err(|given: Vec<String>| {
            EngineError::invalid_benchmark(
                &name,
                format!("expected 3 commands (small, medium, large), got {}", given.len()),
            )
        })?;
        if let Some(size) = ProblemSize::ALL
            .into_iter()
            .find(|s| commands[s.index()].trim().is_empty())
        {
            return Err(EngineError::invalid_benchmark(
                &name,
                format!("{} command is empty", size),
            ));
        }

        if entry.patterns.is_empty() {
            return Err(EngineError::invalid_benchmark(
                &name,
                "at least one extraction pattern is required",
            ));
        }

        let mut signals = Vec::with_capacity(entry.patterns.len());
        let mut seen = HashSet::new();
        for (i, pattern) in entry.patterns.into_iter().enumerate() {
            let signal = match pattern {
                PatternEntry::Plain(pattern) => TrackedSignal::compile(
                    default_signal_name(i),
                    MetricDimension::ExecutionTime,
                    &pattern,
                    entry.unit,
                )?,
                PatternEntry::Named {
                    name: signal_name,
                    pattern,
                    dimension,
                    unit,
                } => TrackedSignal::compile(
                    signal_name,
                    dimension.unwrap_or(MetricDimension::ExecutionTime),
                    &pattern,
                    unit.unwrap_or(entry.unit),
                )?,
            };
            // the first signal is recorded as the run time whatever its name
            if i > 0 && signal.name == RUNTIME_SIGNAL {
                return Err(EngineError::invalid_benchmark(
                    &name,
                    format!("'{}' is reserved for the first pattern", RUNTIME_SIGNAL),
                ));
            }
            if !seen.insert(signal.name.clone()) {
                return Err(EngineError::invalid_benchmark(
                    &name,
                    format!("signal '{}' is defined twice", signal.name),
                ));
            }
            signals.push(signal);
        }

        let directory = if entry.directory.is_absolute() {
            entry.directory
        } else {
            base.join(entry.directory)
        };

        Ok(Self {
            name,
            directory,
            commands,
            signals,
            unit: entry.unit,
        })
    }

    pub fn command(&self, size: ProblemSize) -> &str {
        &self.commands[size.index()]
    }

    /// Signal whose mean fills the execution-time tables
    pub fn runtime_signal(&self) -> &TrackedSignal {
        // non-empty by construction
        &self.signals[0]
    }
}

fn default_signal_name(index: usize) -> String {
    if index == 0 {
        RUNTIME_SIGNAL.to_string()
    } else {
        format!("signal_{}", index)
    }
}

/// Ordered, validated set of benchmarks
#[derive(Debug, Clone, Default)]
pub struct BenchmarkMatrix {
    benchmarks: Vec<BenchmarkSpec>,
}

impl BenchmarkMatrix {
    /// Validate entries in order; benchmark names must be unique
    pub fn from_entries(entries: Vec<BenchmarkEntry>, base: &Path) -> EngineResult<Self> {
        let mut benchmarks: Vec<BenchmarkSpec> = Vec::with_capacity(entries.len());
        for entry in entries {
            let spec = BenchmarkSpec::from_entry(entry, base)?;
            if benchmarks.iter().any(|b| b.name == spec.name) {
                return Err(EngineError::invalid_benchmark(
                    spec.name,
                    "benchmark name is used twice",
                ));
            }
            benchmarks.push(spec);
        }
        Ok(Self { benchmarks })
    }

    /// Parse a matrix from TOML text
    pub fn from_toml_str(content: &str, base: &Path) -> EngineResult<Self> {
        let file: MatrixFile = toml::from_str(content)?;
        Self::from_entries(file.benchmarks, base)
    }

    /// Load a matrix file; relative directories resolve against the file's parent
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::MatrixRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&content, base)
    }

    /// The stock OpenMP offload benchmark suite, rooted at `eval_dir`
    pub fn builtin(eval_dir: &Path) -> EngineResult<Self> {
        Self::from_entries(builtin_entries(), eval_dir)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BenchmarkSpec> {
        self.benchmarks.iter()
    }

    pub fn len(&self) -> usize {
        self.benchmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.benchmarks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BenchmarkSpec> {
        self.benchmarks.iter().find(|b| b.name == name)
    }

    /// Keep only the named benchmarks, in matrix order.
    ///
    /// An empty filter keeps everything. Unknown names are an error.
    pub fn retain_named(self, names: &[String]) -> EngineResult<Self> {
        if names.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(EngineError::invalid_benchmark(
                unknown.clone(),
                "not in the benchmark matrix",
            ));
        }
        let benchmarks = self
            .benchmarks
            .into_iter()
            .filter(|b| names.contains(&b.name))
            .collect();
        Ok(Self { benchmarks })
    }
}

fn entry(
    name: &str,
    directory: &str,
    commands: [&str; 3],
    pattern: &str,
    unit: UnitPolicy,
) -> BenchmarkEntry {
    BenchmarkEntry {
        name: name.to_string(),
        directory: PathBuf::from(directory),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        patterns: vec![PatternEntry::Plain(pattern.to_string())],
        unit,
    }
}

fn builtin_entries() -> Vec<BenchmarkEntry> {
    use crate::extract::TimeUnit::{Milliseconds, Seconds};
    let s = UnitPolicy::Fixed(Seconds);
    let ms = UnitPolicy::Fixed(Milliseconds);

    const COMPUTE: &str = r"Compute time:\s*([\d.]+)";
    const TOTAL: &str = r"Total time:\s*([\d.]+)";
    const PROGRAM: &str = r"Total Program Time:\s*([\d.]+)";
    const RUNTIME: &str = r"Runtime:\s*([\d.]+)";
    const MINIFE_YAML: &str = "&& cat $(ls -t miniFE.*.yaml | head -n 1)";

    let minife = |bin_dir: &str, name: &str| {
        let cmd = |dims: &str| format!("./miniFE.x {} {}", dims, MINIFE_YAML);
        BenchmarkEntry {
            name: name.to_string(),
            directory: PathBuf::from(format!("src/miniFE/{}", bin_dir)),
            commands: vec![
                cmd("-nx 66 -ny 64 -nz 64"),
                cmd("-nx 132 -ny 128 -nz 128"),
                cmd("-nx 264 -ny 256 -nz 256"),
            ],
            patterns: vec![PatternEntry::Plain(PROGRAM.to_string())],
            unit: s,
        }
    };

    vec![
        entry(
            "bfs",
            "src/bfs",
            [
                "./bfs_offload 4 ../../data/bfs/graph4096.txt",
                "./bfs_offload 4 ../../data/bfs/graph65536.txt",
                "./bfs_offload 4 ../../data/bfs/graph1MW_6.txt",
            ],
            COMPUTE,
            s,
        ),
        entry(
            "bfs (fix)",
            "src/bfs",
            [
                "./bfs_offload_fix 4 ../../data/bfs/graph4096.txt",
                "./bfs_offload_fix 4 ../../data/bfs/graph65536.txt",
                "./bfs_offload_fix 4 ../../data/bfs/graph1MW_6.txt",
            ],
            COMPUTE,
            s,
        ),
        entry(
            "cfd",
            "src/cfd",
            [
                "./euler3d_cpu_offload ../../data/cfd/fvcorr.domn.097K",
                "./euler3d_cpu_offload ../../data/cfd/fvcorr.domn.193K",
                "./euler3d_cpu_offload ../../data/cfd/missile.domn.0.2M",
            ],
            COMPUTE,
            s,
        ),
        entry(
            "hotspot",
            "src/hotspot",
            [
                "./hotspot_offload 64 64 2 4 ../../data/hotspot/temp_64 ../../data/hotspot/power_64 output.out",
                "./hotspot_offload 512 512 2 4 ../../data/hotspot/temp_512 ../../data/hotspot/power_512 output.out",
                "./hotspot_offload 1024 1024 2 4 ../../data/hotspot/temp_1024 ../../data/hotspot/power_1024 output.out",
            ],
            TOTAL,
            s,
        ),
        entry(
            "lud",
            "src/lud",
            [
                "./omp/lud_omp_offload -s 2000",
                "./omp/lud_omp_offload -s 4000",
                "./omp/lud_omp_offload -s 8000",
            ],
            r"Time consumed\(ms\):\s*([\d.]+)",
            ms,
        ),
        entry(
            "nw",
            "src/nw",
            [
                "./needle_offload 512 10 2",
                "./needle_offload 2048 10 2",
                "./needle_offload 8192 10 2",
            ],
            TOTAL,
            s,
        ),
        minife("src-openmp45-opt", "minife"),
        minife("src-openmp45-opt-fix", "minife (fix)"),
        entry(
            "rsbench",
            "src/RSBench",
            [
                "./rsbench -m event -s small",
                "./rsbench -m event -s large -l 4250000",
                "./rsbench -m event -s large",
            ],
            RUNTIME,
            s,
        ),
        entry(
            "rsbench (fix)",
            "src/RSBench",
            [
                "./rsbench_fix -m event -s small",
                "./rsbench_fix -m event -s large -l 4250000",
                "./rsbench_fix -m event -s large",
            ],
            RUNTIME,
            s,
        ),
        entry(
            "xsbench",
            "src/XSBench",
            [
                "./XSBench -m event -s small",
                "./XSBench -m event -g 1413",
                "./XSBench -m event -s large",
            ],
            RUNTIME,
            s,
        ),
        entry(
            "xsbench (fix)",
            "src/XSBench",
            [
                "./XSBench_fix -m event -s small",
                "./XSBench_fix -m event -g 1413",
                "./XSBench_fix -m event -s large",
            ],
            RUNTIME,
            s,
        ),
    ]
}
