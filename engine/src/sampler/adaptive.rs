//! Adaptive sampling loop
//!
//! ```text
//! WARMUP ──→ MEASURING ──┬──→ CONVERGED  (every signal's margin < confidence)
//!                        └──→ EXHAUSTED  (max_repetitions reached)
//! ```
//!
//! Warm-up runs are executed and thrown away. During measurement every tracked
//! signal is extracted from every run. Once the first tracked signal holds at
//! least [`MIN_SAMPLES_FOR_CONFIDENCE`] observations, each iteration evaluates
//! every signal's margin of error and the loop stops as soon as all of them
//! are below the threshold in the same check.
//!
//! The threshold is the confidence level itself (`margin < 0.95` for a 95%
//! level), not a tolerance derived from it. Two sessions with the same
//! settings may therefore run different numbers of repetitions.

use crate::error::{EngineError, EngineResult};
use crate::extract::{MetricDimension, MetricExtractor, TrackedSignal};
use crate::runner::{CommandExecutor, InstrumentationMode, RunFailure, RunOutcome, SampleRunner};
use crate::sampler::stats::{z_score, ConfidenceState, SampleSet, MIN_SAMPLES_FOR_CONFIDENCE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Runs executed and discarded before measuring
    pub warmup_count: usize,
    /// Upper bound on measuring-phase runs
    pub max_repetitions: usize,
    /// Confidence level in [0, 1); 0 disables early stopping
    pub confidence: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            warmup_count: 2,
            max_repetitions: 30,
            confidence: 0.0,
        }
    }
}

impl SamplerConfig {
    /// Fixed repetition count, no early stop
    pub fn fixed(warmup_count: usize, max_repetitions: usize) -> Self {
        Self {
            warmup_count,
            max_repetitions,
            confidence: 0.0,
        }
    }

    pub fn early_stop_enabled(&self) -> bool {
        self.confidence > 0.0
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(0.0..1.0).contains(&self.confidence) {
            return Err(EngineError::InvalidSampler {
                message: format!("confidence must be in [0, 1), got {}", self.confidence),
            });
        }
        if self.max_repetitions == 0 {
            return Err(EngineError::InvalidSampler {
                message: "max_repetitions must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Where the sampling state machine is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerPhase {
    Warmup,
    Measuring,
    Converged,
    Exhausted,
}

impl std::fmt::Display for SamplerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warmup => write!(f, "warmup"),
            Self::Measuring => write!(f, "measuring"),
            Self::Converged => write!(f, "converged"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Why the measuring phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All signals met the early-stop rule at this measuring iteration (1-based)
    Converged { iteration: usize },
    /// `max_repetitions` ran without convergence
    Exhausted,
}

impl StopReason {
    pub fn phase(&self) -> SamplerPhase {
        match self {
            Self::Converged { .. } => SamplerPhase::Converged,
            Self::Exhausted => SamplerPhase::Exhausted,
        }
    }
}

/// One evaluation of the early-stop rule
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceCheck {
    /// Measuring iteration (1-based) the check ran after
    pub iteration: usize,
    /// Per-signal margin of error, `None` while a signal lacks samples
    pub margins: Vec<Option<f64>>,
    /// Per-signal rule outcome
    pub satisfied: Vec<bool>,
}

impl ConvergenceCheck {
    pub fn all_satisfied(&self) -> bool {
        !self.satisfied.is_empty() && self.satisfied.iter().all(|s| *s)
    }
}

/// An iteration that produced no observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationFailure {
    pub phase: SamplerPhase,
    /// 1-based within its phase
    pub iteration: usize,
    pub failure: RunFailure,
}

/// Samples gathered for one tracked signal
#[derive(Debug, Clone)]
pub struct SignalSamples {
    pub name: String,
    pub dimension: MetricDimension,
    pub samples: SampleSet,
    /// Completed runs where the pattern did not yield a value
    pub misses: usize,
}

/// Everything a sampling session produced
#[derive(Debug, Clone)]
pub struct SamplingOutcome {
    /// Index-aligned with the tracked signal list
    pub signals: Vec<SignalSamples>,
    /// Total process invocations, warm-up included
    pub invocations: usize,
    pub stop: StopReason,
    pub failures: Vec<IterationFailure>,
    pub checks: Vec<ConvergenceCheck>,
}

impl SamplingOutcome {
    /// Mean of each signal, index-aligned with the tracked list
    pub fn means(&self) -> Vec<Option<f64>> {
        self.signals.iter().map(|s| s.samples.mean()).collect()
    }

    pub fn signal(&self, name: &str) -> Option<&SignalSamples> {
        self.signals.iter().find(|s| s.name == name)
    }

    /// Measuring-phase iterations that ran
    pub fn measuring_iterations(&self, warmup_count: usize) -> usize {
        self.invocations.saturating_sub(warmup_count)
    }
}

/// Repeats one benchmark command until its signals are stable or the budget runs out
pub struct AdaptiveSampler<'r, E> {
    runner: &'r SampleRunner<E>,
    config: SamplerConfig,
    z: Option<f64>,
}

impl<'r, E: CommandExecutor> AdaptiveSampler<'r, E> {
    pub fn new(runner: &'r SampleRunner<E>, config: SamplerConfig) -> EngineResult<Self> {
        config.validate()?;
        // z-score is fixed for the sampler's lifetime
        let z = config
            .early_stop_enabled()
            .then(|| z_score(config.confidence));
        Ok(Self { runner, config, z })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// z-score in effect, `None` when early stopping is off
    pub fn z(&self) -> Option<f64> {
        self.z
    }

    /// Run one sampling session.
    ///
    /// Only a failure to restore the working directory is returned as an
    /// error; everything else is recorded in the outcome.
    pub fn sample(
        &self,
        directory: &Path,
        command: &str,
        mode: InstrumentationMode,
        signals: &[TrackedSignal],
    ) -> EngineResult<SamplingOutcome> {
        let mut collected: Vec<SignalSamples> = signals
            .iter()
            .map(|s| SignalSamples {
                name: s.name.clone(),
                dimension: s.dimension,
                samples: SampleSet::new(),
                misses: 0,
            })
            .collect();
        let mut failures = Vec::new();
        let mut checks = Vec::new();
        let mut invocations = 0;

        let mut phase = SamplerPhase::Warmup;
        for iteration in 1..=self.config.warmup_count {
            invocations += 1;
            debug!(%phase, iteration, total = self.config.warmup_count, command, "Warm-up run");
            if let RunOutcome::Failed(failure) = self.runner.run(directory, command, mode)? {
                failures.push(IterationFailure {
                    phase,
                    iteration,
                    failure,
                });
            }
        }

        phase = SamplerPhase::Measuring;
        let mut stop = StopReason::Exhausted;
        for iteration in 1..=self.config.max_repetitions {
            invocations += 1;
            debug!(%phase, iteration, total = self.config.max_repetitions, command, "Measuring run");

            match self.runner.run(directory, command, mode)? {
                RunOutcome::Completed(capture) => {
                    let values =
                        MetricExtractor::extract_signals(signals, &capture.output, capture.wall_clock);
                    for (slot, value) in collected.iter_mut().zip(values) {
                        match value {
                            Some(v) => slot.samples.push(v),
                            None => slot.misses += 1,
                        }
                    }
                }
                RunOutcome::Failed(failure) => failures.push(IterationFailure {
                    phase,
                    iteration,
                    failure,
                }),
            }

            if let Some(check) = self.check_convergence(iteration, &collected) {
                let done = check.all_satisfied();
                checks.push(check);
                if done {
                    stop = StopReason::Converged { iteration };
                    break;
                }
            }
        }

        phase = stop.phase();
        let counts: Vec<usize> = collected.iter().map(|s| s.samples.len()).collect();
        info!(
            command,
            %mode,
            %phase,
            invocations,
            failures = failures.len(),
            samples = ?counts,
            "Sampling session finished"
        );

        Ok(SamplingOutcome {
            signals: collected,
            invocations,
            stop,
            failures,
            checks,
        })
    }

    /// Evaluate the early-stop rule, or `None` when no check is due yet
    fn check_convergence(
        &self,
        iteration: usize,
        collected: &[SignalSamples],
    ) -> Option<ConvergenceCheck> {
        let z = self.z?;
        let first = collected.first()?;
        if first.samples.len() < MIN_SAMPLES_FOR_CONFIDENCE {
            return None;
        }

        let mut margins = Vec::with_capacity(collected.len());
        let mut satisfied = Vec::with_capacity(collected.len());
        for signal in collected {
            let state = (signal.samples.len() >= MIN_SAMPLES_FOR_CONFIDENCE)
                .then(|| ConfidenceState::compute(&signal.samples, z))
                .flatten();
            margins.push(state.map(|s| s.margin));
            satisfied.push(state.is_some_and(|s| s.margin < self.config.confidence));
        }

        debug!(iteration, ?margins, ?satisfied, "Convergence check");
        Some(ConvergenceCheck {
            iteration,
            margins,
            satisfied,
        })
    }
}
