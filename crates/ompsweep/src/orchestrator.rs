//! End-to-end measurement run
//!
//! One baseline pass over the matrix without the profiler, then every
//! configuration point is rebuilt and the matrix is profiled against it.
//! Everything lands in a single [`ResultTable`].

use std::collections::HashSet;
use sweep_engine::aggregate::{ResultKey, ResultTable, NATIVE};
use sweep_engine::matrix::{BenchmarkMatrix, BenchmarkSpec, ProblemSize, RUNTIME_SIGNAL};
use sweep_engine::runner::{CommandExecutor, InstrumentationMode, SampleRunner};
use sweep_engine::sampler::{AdaptiveSampler, SamplerConfig, StopReason};
use sweep_engine::sweep::{ConfigurationPoint, ConfigurationSweep, SweepReport, TargetBuilder};
use sweep_engine::{EngineResult, MetricDimension, TrackedSignal};
use tracing::{info, warn};

/// Label of the single point used when profiling an existing build
pub const CURRENT_POINT: &str = "current";

/// The point profiled when rebuilding is disabled
pub fn current_point() -> ConfigurationPoint {
    ConfigurationPoint::release(CURRENT_POINT)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave the `native` cells empty instead of running uninstrumented
    pub skip_baseline: bool,
}

/// One finished sampling session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub benchmark: String,
    pub size: ProblemSize,
    pub configuration: String,
    pub mode: InstrumentationMode,
    pub invocations: usize,
    pub failures: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone, Default)]
pub struct SweepRun {
    pub results: ResultTable,
    pub sweep: SweepReport,
    pub sessions: Vec<SessionRecord>,
}

impl SweepRun {
    pub fn converged_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| matches!(s.stop, StopReason::Converged { .. }))
            .count()
    }
}

/// Signals sampled under the profiler: the benchmark's own, then whatever
/// the point's build reports. Later duplicates of a name are dropped.
pub fn profiled_signals(spec: &BenchmarkSpec, point: &ConfigurationPoint) -> Vec<TrackedSignal> {
    let mut seen = HashSet::new();
    let mut signals = Vec::with_capacity(spec.signals.len());
    for signal in spec.signals.iter().cloned().chain(point.tracked_signals()) {
        if seen.insert(signal.name.clone()) {
            signals.push(signal);
        } else {
            warn!(
                benchmark = %spec.name,
                configuration = %point.label,
                signal = %signal.name,
                "Duplicate signal name, keeping the first definition"
            );
        }
    }
    signals
}

/// Drives the baseline pass and the configuration sweep over one matrix
pub struct Orchestrator<'a, E, B> {
    matrix: &'a BenchmarkMatrix,
    sampler: AdaptiveSampler<'a, E>,
    sweep: ConfigurationSweep<B>,
}

impl<'a, E: CommandExecutor, B: TargetBuilder> Orchestrator<'a, E, B> {
    pub fn new(
        matrix: &'a BenchmarkMatrix,
        runner: &'a SampleRunner<E>,
        sampler: SamplerConfig,
        builder: B,
    ) -> EngineResult<Self> {
        Ok(Self {
            matrix,
            sampler: AdaptiveSampler::new(runner, sampler)?,
            sweep: ConfigurationSweep::new(builder),
        })
    }

    pub fn run(&self, points: &[ConfigurationPoint], options: RunOptions) -> EngineResult<SweepRun> {
        let mut results = ResultTable::new();
        let mut sessions = Vec::new();
        for spec in self.matrix.iter() {
            results.declare_benchmark(&spec.name);
        }
        for point in points {
            results.declare_configuration(&point.label);
        }

        info!(
            benchmarks = self.matrix.len(),
            configurations = points.len(),
            skip_baseline = options.skip_baseline,
            "Starting sweep"
        );

        if options.skip_baseline {
            info!("Baseline pass skipped");
        } else {
            for spec in self.matrix.iter() {
                for size in ProblemSize::ALL {
                    let record = self.session(
                        spec,
                        size,
                        NATIVE,
                        InstrumentationMode::Baseline,
                        &spec.signals,
                        &mut results,
                    )?;
                    sessions.push(record);
                }
            }
        }

        let sweep = self.sweep.run(points, |point| {
            for spec in self.matrix.iter() {
                let signals = profiled_signals(spec, point);
                for size in ProblemSize::ALL {
                    let record = self.session(
                        spec,
                        size,
                        &point.label,
                        InstrumentationMode::Profiled,
                        &signals,
                        &mut results,
                    )?;
                    sessions.push(record);
                }
            }
            Ok(())
        })?;

        let run = SweepRun {
            results,
            sweep,
            sessions,
        };
        info!(
            sessions = run.sessions.len(),
            converged = run.converged_sessions(),
            skipped = run.sweep.skipped.len(),
            "Run finished"
        );
        Ok(run)
    }

    fn session(
        &self,
        spec: &BenchmarkSpec,
        size: ProblemSize,
        configuration: &str,
        mode: InstrumentationMode,
        signals: &[TrackedSignal],
        results: &mut ResultTable,
    ) -> EngineResult<SessionRecord> {
        info!(benchmark = %spec.name, %size, configuration, %mode, "Sampling");
        let outcome = self
            .sampler
            .sample(&spec.directory, spec.command(size), mode, signals)?;

        for (index, (signal, collected)) in signals.iter().zip(&outcome.signals).enumerate() {
            // the first signal is the benchmark's run time whatever it is called
            let (dimension, name) = if index == 0 {
                (MetricDimension::ExecutionTime, RUNTIME_SIGNAL.to_string())
            } else {
                (signal.dimension, signal.name.clone())
            };
            if collected.samples.is_empty() {
                warn!(
                    benchmark = %spec.name,
                    %size,
                    configuration,
                    signal = %name,
                    misses = collected.misses,
                    "No observations, cell left empty"
                );
            }
            results.record(
                ResultKey::new(dimension, name, configuration, spec.name.as_str(), size, mode),
                collected.samples.summary_at(self.sampler.z()),
            );
        }

        if outcome.stop == StopReason::Exhausted && self.sampler.z().is_some() {
            info!(
                benchmark = %spec.name,
                %size,
                configuration,
                "Repetition cap reached before convergence"
            );
        }

        Ok(SessionRecord {
            benchmark: spec.name.clone(),
            size,
            configuration: configuration.to_string(),
            mode,
            invocations: outcome.invocations,
            failures: outcome.failures.len(),
            stop: outcome.stop,
        })
    }
}
