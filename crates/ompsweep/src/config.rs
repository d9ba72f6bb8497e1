//! Sweep configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `OMPSWEEP_*` environment variables, then command-line flags (applied by
//! the CLI).
//!
//! ```toml
//! eval_dir = "/opt/ompdataperf/eval"
//!
//! [sampler]
//! warmup_count = 2
//! max_repetitions = 30
//! confidence = 0.95
//!
//! [profiler]
//! command = "/opt/ompdataperf/build/ompdataprof"
//!
//! [target]
//! source_dir = "/opt/ompdataperf"
//! build_dir = "/opt/ompdataperf/build"
//! jobs = 16
//! fresh = true
//!
//! [report]
//! format = "tsv"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use sweep_engine::matrix::BenchmarkEntry;
use sweep_engine::sampler::SamplerConfig;
use sweep_engine::sweep::{default_points, validate_points, CmakeBuilder, ConfigurationPoint};
use sweep_engine::{BenchmarkMatrix, EngineError, ReportFormat};
use thiserror::Error;
use tracing::warn;

/// Profiler binary name inside the build directory
pub const PROFILER_BINARY: &str = "ompdataprof";

pub const ENV_PROFILER: &str = "OMPSWEEP_PROFILER";
pub const ENV_EVAL_DIR: &str = "OMPSWEEP_EVAL_DIR";
pub const ENV_REPETITIONS: &str = "OMPSWEEP_REPETITIONS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot determine the eval directory: {0}")]
    EvalDir(#[source] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// `[profiler]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfilerSection {
    /// Wrapper command; defaults to the binary in the target's build directory
    pub command: Option<String>,
}

/// `[target]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetSection {
    /// Profiler source tree; defaults to the eval directory's parent
    pub source_dir: Option<PathBuf>,
    /// Build tree; defaults to `<source_dir>/build`
    pub build_dir: Option<PathBuf>,
    pub cmake: String,
    pub jobs: Option<usize>,
    /// Remove the build tree before each configure
    pub fresh: bool,
    /// Extra configure arguments, shell-quoted
    pub extra_args: String,
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            source_dir: None,
            build_dir: None,
            cmake: "cmake".to_string(),
            jobs: None,
            fresh: false,
            extra_args: String::new(),
        }
    }
}

/// `[report]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub format: ReportFormat,
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Root the benchmark directories hang off; defaults to the current directory
    pub eval_dir: Option<PathBuf>,
    pub sampler: SamplerConfig,
    pub profiler: ProfilerSection,
    pub target: TargetSection,
    pub report: ReportSection,
    /// Benchmark matrix; the built-in suite when empty
    pub benchmarks: Vec<BenchmarkEntry>,
    /// Sweep points; the built-in list when empty
    pub configurations: Vec<ConfigurationPoint>,
}

impl SweepConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a config file; relative paths in it resolve against its directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.anchor_paths(base);
        Ok(config)
    }

    fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        anchor(&mut self.eval_dir);
        anchor(&mut self.target.source_dir);
        anchor(&mut self.target.build_dir);
    }

    /// Apply `OMPSWEEP_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(command) = lookup(ENV_PROFILER) {
            self.profiler.command = Some(command);
        }
        if let Some(dir) = lookup(ENV_EVAL_DIR) {
            self.eval_dir = Some(PathBuf::from(dir));
        }
        if let Some(reps) = lookup(ENV_REPETITIONS) {
            match reps.parse() {
                Ok(n) => self.sampler.max_repetitions = n,
                Err(_) => warn!(var = ENV_REPETITIONS, value = %reps, "Ignoring non-numeric override"),
            }
        }
    }

    pub fn eval_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.eval_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(ConfigError::EvalDir),
        }
    }

    pub fn source_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.target.source_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.eval_dir()?.join("..")),
        }
    }

    pub fn build_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.target.build_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.source_dir()?.join("build")),
        }
    }

    /// Instrumentation wrapper prefixed to profiled runs
    pub fn profiler_command(&self) -> Result<String, ConfigError> {
        match &self.profiler.command {
            Some(command) => Ok(command.clone()),
            None => Ok(self.build_dir()?.join(PROFILER_BINARY).display().to_string()),
        }
    }

    pub fn matrix(&self) -> Result<BenchmarkMatrix, ConfigError> {
        let eval_dir = self.eval_dir()?;
        let matrix = if self.benchmarks.is_empty() {
            BenchmarkMatrix::builtin(&eval_dir)?
        } else {
            BenchmarkMatrix::from_entries(self.benchmarks.clone(), &eval_dir)?
        };
        Ok(matrix)
    }

    pub fn points(&self) -> Result<Vec<ConfigurationPoint>, ConfigError> {
        let points = if self.configurations.is_empty() {
            default_points()
        } else {
            self.configurations.clone()
        };
        validate_points(&points)?;
        Ok(points)
    }

    pub fn builder(&self) -> Result<CmakeBuilder, ConfigError> {
        let builder = CmakeBuilder::new(self.source_dir()?, self.build_dir()?)
            .with_program(self.target.cmake.clone())
            .with_jobs(self.target.jobs)
            .with_fresh(self.target.fresh)
            .with_extra_args(&self.target.extra_args)?;
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::default();
        assert_eq!(config.sampler.warmup_count, 2);
        assert_eq!(config.sampler.max_repetitions, 30);
        assert_eq!(config.sampler.confidence, 0.0);
        assert_eq!(config.report.format, ReportFormat::Fixed);
        assert_eq!(config.target.cmake, "cmake");
        assert_eq!(config.points().unwrap().len(), 10);
    }

    #[test]
    fn test_default_paths_follow_eval_dir() {
        let config = SweepConfig {
            eval_dir: Some(PathBuf::from("/opt/prof/eval")),
            ..Default::default()
        };
        assert_eq!(config.build_dir().unwrap(), PathBuf::from("/opt/prof/eval/../build"));
        assert_eq!(
            config.profiler_command().unwrap(),
            "/opt/prof/eval/../build/ompdataprof"
        );
        let matrix = config.matrix().unwrap();
        assert_eq!(
            matrix.get("bfs").unwrap().directory,
            PathBuf::from("/opt/prof/eval/src/bfs")
        );
    }

    #[test]
    fn test_parse_sections() {
        let toml_str = r#"
eval_dir = "/eval"

[sampler]
confidence = 0.95

[profiler]
command = "valgrind --tool=none"

[target]
jobs = 8
fresh = true

[report]
format = "tsv"

[[configurations]]
label = "xxh3"
measure_hashing_overhead = true
"#;
        let config = SweepConfig::from_toml_str(toml_str, Path::new("sweep.toml")).unwrap();
        assert_eq!(config.sampler.confidence, 0.95);
        assert_eq!(config.sampler.warmup_count, 2);
        assert_eq!(config.profiler_command().unwrap(), "valgrind --tool=none");
        assert_eq!(config.target.jobs, Some(8));
        assert!(config.target.fresh);
        assert_eq!(config.report.format, ReportFormat::Tsv);
        let points = config.points().unwrap();
        assert_eq!(points.len(), 1);
        assert!(points[0].measure_hashing_overhead);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PROFILER, "/usr/local/bin/ompdataprof"),
            (ENV_EVAL_DIR, "/data/eval"),
            (ENV_REPETITIONS, "12"),
        ]
        .into_iter()
        .collect();
        let mut config = SweepConfig::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.profiler_command().unwrap(), "/usr/local/bin/ompdataprof");
        assert_eq!(config.eval_dir().unwrap(), PathBuf::from("/data/eval"));
        assert_eq!(config.sampler.max_repetitions, 12);
    }

    #[test]
    fn test_bad_repetition_override_is_ignored() {
        let mut config = SweepConfig::default();
        config.apply_env_from(|k| (k == ENV_REPETITIONS).then(|| "lots".to_string()));
        assert_eq!(config.sampler.max_repetitions, 30);
    }

    #[test]
    fn test_from_file_anchors_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        std::fs::write(
            &path,
            r#"
eval_dir = "eval"

[target]
source_dir = "/abs/src"
"#,
        )
        .unwrap();
        let config = SweepConfig::from_file(&path).unwrap();
        assert_eq!(config.eval_dir().unwrap(), dir.path().join("eval"));
        assert_eq!(config.source_dir().unwrap(), PathBuf::from("/abs/src"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = SweepConfig::from_toml_str("[sampler\n", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_invalid_matrix_surfaces_engine_error() {
        let toml_str = r#"
[[benchmarks]]
name = "short"
directory = "x"
commands = ["./a"]
patterns = ['t:\s*([\d.]+)']
"#;
        let config = SweepConfig::from_toml_str(toml_str, Path::new("c.toml")).unwrap();
        assert!(matches!(config.matrix(), Err(ConfigError::Engine(_))));
    }
}
