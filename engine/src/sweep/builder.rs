//! Rebuilding the instrumented target
//!
//! Configure and compile are separate steps so a sweep can tell which one
//! broke. Both report through exit status; neither ever returns an error.

use crate::error::{EngineError, EngineResult};
use crate::extract::output_excerpt;
use crate::sweep::config_point::ConfigurationPoint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Characters of build output kept in a failure record
pub const BUILD_EXCERPT_CHARS: usize = 2000;

/// Phase of a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStep {
    Configure,
    Compile,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configure => write!(f, "configure"),
            Self::Compile => write!(f, "compile"),
        }
    }
}

/// Outcome of one build step
#[derive(Debug, Clone)]
pub struct BuildStepResult {
    pub step: BuildStep,
    pub success: bool,
    /// `None` when the process never started or was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl BuildStepResult {
    pub fn succeeded(step: BuildStep) -> Self {
        Self {
            step,
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn failed(step: BuildStep, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            step,
            success: false,
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// Tail of the step's diagnostics
    pub fn excerpt(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        output_excerpt(text, BUILD_EXCERPT_CHARS)
    }
}

/// Something that can rebuild the instrumented target for a configuration point
pub trait TargetBuilder {
    /// Generate the build tree for `point`
    fn configure(&self, point: &ConfigurationPoint) -> BuildStepResult;

    /// Compile the configured build tree
    fn compile(&self, point: &ConfigurationPoint) -> BuildStepResult;
}

impl<T: TargetBuilder + ?Sized> TargetBuilder for &T {
    fn configure(&self, point: &ConfigurationPoint) -> BuildStepResult {
        (**self).configure(point)
    }

    fn compile(&self, point: &ConfigurationPoint) -> BuildStepResult {
        (**self).compile(point)
    }
}

/// Out-of-source CMake build: `cmake -S <src> -B <build> -D...` then
/// `cmake --build <build> -j N`
#[derive(Debug, Clone)]
pub struct CmakeBuilder {
    program: String,
    source_dir: PathBuf,
    build_dir: PathBuf,
    jobs: Option<usize>,
    fresh: bool,
    extra_args: Vec<String>,
}

impl CmakeBuilder {
    pub fn new(source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "cmake".to_string(),
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            jobs: None,
            fresh: false,
            extra_args: Vec::new(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Delete the build directory before every configure
    pub fn with_fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    /// Extra configure arguments, split with shell quoting rules
    pub fn with_extra_args(mut self, args: &str) -> EngineResult<Self> {
        self.extra_args = shlex::split(args).ok_or_else(|| {
            EngineError::invalid_configuration("cmake", format!("cannot split arguments: {}", args))
        })?;
        Ok(self)
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Arguments for the configure step
    pub fn configure_args(&self, point: &ConfigurationPoint) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            self.source_dir.display().to_string(),
            "-B".to_string(),
            self.build_dir.display().to_string(),
        ];
        args.extend(point.cmake_args());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Arguments for the compile step
    pub fn compile_args(&self) -> Vec<String> {
        let mut args = vec!["--build".to_string(), self.build_dir.display().to_string()];
        if let Some(jobs) = self.jobs {
            args.push("-j".to_string());
            args.push(jobs.to_string());
        }
        args
    }

    fn run(&self, step: BuildStep, args: &[String]) -> BuildStepResult {
        debug!(%step, program = %self.program, args = %args.join(" "), "Running build step");
        let start = Instant::now();
        let output = Command::new(&self.program).args(args).output();
        let duration = start.elapsed();

        match output {
            Ok(output) => BuildStepResult {
                step,
                success: output.status.success(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                duration,
            },
            Err(e) => {
                warn!(%step, program = %self.program, error = %e, "Failed to start build tool");
                BuildStepResult {
                    duration,
                    ..BuildStepResult::failed(
                        step,
                        None,
                        format!("Failed to run {}: {}", self.program, e),
                    )
                }
            }
        }
    }
}

impl TargetBuilder for CmakeBuilder {
    fn configure(&self, point: &ConfigurationPoint) -> BuildStepResult {
        if self.fresh {
            match std::fs::remove_dir_all(&self.build_dir) {
                Ok(()) => debug!(build_dir = %self.build_dir.display(), "Removed build directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return BuildStepResult::failed(
                        BuildStep::Configure,
                        None,
                        format!(
                            "Failed to remove build directory {}: {}",
                            self.build_dir.display(),
                            e
                        ),
                    );
                }
            }
        }
        self.run(BuildStep::Configure, &self.configure_args(point))
    }

    fn compile(&self, _point: &ConfigurationPoint) -> BuildStepResult {
        self.run(BuildStep::Compile, &self.compile_args())
    }
}
