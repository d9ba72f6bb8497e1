//! Single benchmark invocation
//!
//! Runs `<instrumentation-prefix> <benchmark-command>` once inside the
//! benchmark's working directory, timing it and capturing combined output.
//! A failed invocation is never retried; it is reported to the caller as a
//! missing observation.

use crate::error::EngineResult;
use crate::extract::output_excerpt;
use crate::runner::executor::CommandExecutor;
use crate::runner::guard::DirGuard;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Characters of output kept for a failed invocation
const FAILURE_EXCERPT_CHARS: usize = 400;

/// Whether the instrumentation wrapper is prefixed to the command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentationMode {
    /// Benchmark runs on its own
    Baseline,
    /// Benchmark runs under the profiler
    Profiled,
}

impl InstrumentationMode {
    /// Column tag used in reports
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Baseline => "np",
            Self::Profiled => "p",
        }
    }
}

impl std::fmt::Display for InstrumentationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Profiled => write!(f, "profiled"),
        }
    }
}

/// Output and timing of a completed invocation
#[derive(Debug, Clone)]
pub struct RunCapture {
    /// stdout followed by stderr
    pub output: String,
    /// Wall-clock time around the process
    pub wall_clock: Duration,
}

/// Why an invocation yielded no observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// Could not change into the benchmark directory
    Directory { message: String },
    /// Process could not be started
    Spawn { message: String },
    /// Process ran but exited unsuccessfully
    Exit {
        exit_code: Option<i32>,
        output_tail: String,
    },
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory { message } => write!(f, "cannot enter directory: {}", message),
            Self::Spawn { message } => write!(f, "failed to start: {}", message),
            Self::Exit {
                exit_code: Some(code),
                ..
            } => write!(f, "exited with status {}", code),
            Self::Exit {
                exit_code: None, ..
            } => write!(f, "terminated by signal"),
        }
    }
}

/// Result of one invocation
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunCapture),
    Failed(RunFailure),
}

/// Runs benchmark commands, optionally behind an instrumentation wrapper
pub struct SampleRunner<E> {
    executor: E,
    profiler_prefix: String,
}

impl<E: CommandExecutor> SampleRunner<E> {
    /// Create a runner with no instrumentation wrapper configured
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            profiler_prefix: String::new(),
        }
    }

    /// Set the command prefix used in [`InstrumentationMode::Profiled`]
    pub fn with_profiler(mut self, prefix: impl Into<String>) -> Self {
        self.profiler_prefix = prefix.into();
        self
    }

    pub fn profiler_prefix(&self) -> &str {
        &self.profiler_prefix
    }

    /// Full command line for a mode
    pub fn command_line(&self, command: &str, mode: InstrumentationMode) -> String {
        let prefix = match mode {
            InstrumentationMode::Baseline => "",
            InstrumentationMode::Profiled => self.profiler_prefix.as_str(),
        };
        format!("{} {}", prefix, command).trim().to_string()
    }

    /// Run `command` once in `directory`.
    ///
    /// Recoverable failures come back as [`RunOutcome::Failed`]. The only
    /// error is failing to restore the previous working directory.
    pub fn run(
        &self,
        directory: &Path,
        command: &str,
        mode: InstrumentationMode,
    ) -> EngineResult<RunOutcome> {
        let command_line = self.command_line(command, mode);

        let guard = match DirGuard::enter(directory) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(
                    directory = %directory.display(),
                    command = %command_line,
                    error = %e,
                    "Cannot enter benchmark directory"
                );
                return Ok(RunOutcome::Failed(RunFailure::Directory {
                    message: e.to_string(),
                }));
            }
        };

        debug!(command = %command_line, directory = %directory.display(), "Running");
        let start = Instant::now();
        let result = self.executor.execute(&command_line);
        let wall_clock = start.elapsed();

        guard.restore()?;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %command_line, error = %e, "Failed to start benchmark");
                return Ok(RunOutcome::Failed(RunFailure::Spawn {
                    message: e.to_string(),
                }));
            }
        };

        let text = output.combined();
        if !output.success {
            let output_tail = output_excerpt(&text, FAILURE_EXCERPT_CHARS);
            warn!(
                command = %command_line,
                exit_code = ?output.exit_code,
                output_tail = %output_tail,
                "Benchmark exited unsuccessfully, observation dropped"
            );
            return Ok(RunOutcome::Failed(RunFailure::Exit {
                exit_code: output.exit_code,
                output_tail,
            }));
        }

        Ok(RunOutcome::Completed(RunCapture {
            output: text,
            wall_clock,
        }))
    }
}
