//! Sweep to report, with a mocked build backend and scripted processes.

use mockall::{mock, Sequence};
use std::cell::Cell;
use std::io;
use std::path::PathBuf;
use sweep_engine::aggregate::{Cell as ReportCell, Report, ResultKey, ResultTable, RunHeader, NATIVE};
use sweep_engine::runner::{CommandExecutor, InstrumentationMode, ProcessOutput, SampleRunner};
use sweep_engine::sampler::{AdaptiveSampler, SamplerConfig};
use sweep_engine::sweep::{BuildStep, BuildStepResult, ConfigurationPoint, ConfigurationSweep, TargetBuilder};
use sweep_engine::{MetricDimension, ProblemSize, ReportFormat, RUNTIME_SIGNAL};

mock! {
    Builder {}

    impl TargetBuilder for Builder {
        fn configure(&self, point: &ConfigurationPoint) -> BuildStepResult;
        fn compile(&self, point: &ConfigurationPoint) -> BuildStepResult;
    }
}

/// Prints a fixed benchmark line plus a profiler report when wrapped
struct FakeBenchmark {
    calls: Cell<usize>,
}

impl CommandExecutor for FakeBenchmark {
    fn execute(&self, command_line: &str) -> io::Result<ProcessOutput> {
        self.calls.set(self.calls.get() + 1);
        let mut out = ProcessOutput::ok("Compute time: 2.0\n");
        if command_line.starts_with("prof ") {
            out.stdout = "Compute time: 3.0\n".to_string();
            out.stderr = "Found 6 potential unused data transfer(s).\n".to_string();
        }
        Ok(out)
    }
}

fn here() -> PathBuf {
    std::env::current_dir().unwrap()
}

fn runtime_key(config: &str, mode: InstrumentationMode) -> ResultKey {
    ResultKey::new(
        MetricDimension::ExecutionTime,
        RUNTIME_SIGNAL,
        config,
        "bench",
        ProblemSize::Small,
        mode,
    )
}

#[test]
fn test_failed_build_leaves_nan_cells_and_sweep_continues() {
    let mut builder = MockBuilder::new();
    let mut seq = Sequence::new();
    builder
        .expect_configure()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| BuildStepResult::succeeded(BuildStep::Configure));
    builder
        .expect_compile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| BuildStepResult::succeeded(BuildStep::Compile));
    builder
        .expect_configure()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| BuildStepResult::failed(BuildStep::Configure, Some(1), "CMake Error at CMakeLists.txt:12"));
    builder
        .expect_configure()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| BuildStepResult::succeeded(BuildStep::Configure));
    builder
        .expect_compile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| BuildStepResult::succeeded(BuildStep::Compile));

    let executor = FakeBenchmark { calls: Cell::new(0) };
    let runner = SampleRunner::new(&executor).with_profiler("prof");
    let sampler = AdaptiveSampler::new(&runner, SamplerConfig::fixed(1, 3)).unwrap();
    let runtime = sweep_engine::TrackedSignal::compile(
        RUNTIME_SIGNAL,
        MetricDimension::ExecutionTime,
        r"Compute time:\s*([\d.]+)",
        Default::default(),
    )
    .unwrap();

    let mut results = ResultTable::new();
    results.declare_benchmark("bench");

    let baseline = sampler
        .sample(&here(), "./bench", InstrumentationMode::Baseline, &[runtime.clone()])
        .unwrap();
    results.record(
        runtime_key(NATIVE, InstrumentationMode::Baseline),
        baseline.signals[0].samples.summary(),
    );

    let points = vec![
        ConfigurationPoint::release("release"),
        ConfigurationPoint::release("broken").with_collision_checking(),
        ConfigurationPoint::release("transfer-rate").with_transfer_rate(),
    ];
    for point in &points {
        results.declare_configuration(&point.label);
    }

    let sweep = ConfigurationSweep::new(builder);
    let report = sweep
        .run(&points, |point| {
            let mut signals = vec![runtime.clone()];
            signals.extend(point.tracked_signals());
            let outcome = sampler.sample(&here(), "./bench", InstrumentationMode::Profiled, &signals)?;
            for (signal, collected) in signals.iter().zip(&outcome.signals) {
                results.record(
                    ResultKey::new(
                        signal.dimension,
                        signal.name.clone(),
                        point.label.clone(),
                        "bench",
                        ProblemSize::Small,
                        InstrumentationMode::Profiled,
                    ),
                    collected.samples.summary(),
                );
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(report.completed.len(), 2);
    assert!(report.was_skipped("broken"));
    assert_eq!(report.skipped[0].step, BuildStep::Configure);
    // baseline + two profiled points, 4 invocations each
    assert_eq!(executor.calls.get(), 12);

    assert_eq!(results.mean(&runtime_key(NATIVE, InstrumentationMode::Baseline)), Some(2.0));
    assert_eq!(results.mean(&runtime_key("release", InstrumentationMode::Profiled)), Some(3.0));
    assert_eq!(results.mean(&runtime_key("broken", InstrumentationMode::Profiled)), None);

    let rendered = Report::build(RunHeader::new(), &results, &report.skipped);
    let broken = rendered
        .tables
        .iter()
        .find(|t| t.title == "Execution Time Overhead: broken")
        .unwrap();
    assert_eq!(broken.rows[0][1], ReportCell::Value(Some(2.0)));
    assert_eq!(broken.rows[0][2], ReportCell::Value(None));

    let text = rendered.render(ReportFormat::Fixed);
    assert!(text.contains("Detected Anti-Patterns: unused_transfers"));
    assert!(text.contains("broken: configure failed (exit 1)"));
    assert!(text.contains("nan"));

    let tsv = rendered.render(ReportFormat::Tsv);
    assert!(tsv.contains("bench\t2.000000\t3.000000\tnan\tnan\tnan\tnan"));
}

#[test]
fn test_user_dimension_signal_gets_its_own_table() {
    let matrix = sweep_engine::BenchmarkMatrix::from_toml_str(
        r#"
[[benchmarks]]
name = "bench"
directory = "."
commands = ["./bench", "./bench", "./bench"]
patterns = [
    'Compute time:\s*([\d.]+)',
    { name = "hit_rate", pattern = 'prediction hit rate\s*([\d.]+)%', dimension = "prediction-accuracy", unit = "raw" },
]
"#,
        &here(),
    )
    .unwrap();
    let spec = matrix.get("bench").unwrap();
    assert_eq!(spec.signals[1].dimension, MetricDimension::PredictionAccuracy);

    struct Predictor;
    impl CommandExecutor for Predictor {
        fn execute(&self, _command_line: &str) -> io::Result<ProcessOutput> {
            Ok(ProcessOutput::ok("Compute time: 1.0\nprediction hit rate 87.5%\n"))
        }
    }
    let runner = SampleRunner::new(Predictor);
    let sampler = AdaptiveSampler::new(&runner, SamplerConfig::fixed(0, 2)).unwrap();
    let outcome = sampler
        .sample(&spec.directory, spec.command(ProblemSize::Large), InstrumentationMode::Profiled, &spec.signals)
        .unwrap();

    let mut results = ResultTable::new();
    let collected = outcome.signal("hit_rate").unwrap();
    results.record(
        ResultKey::new(
            collected.dimension,
            collected.name.clone(),
            "release",
            "bench",
            ProblemSize::Large,
            InstrumentationMode::Profiled,
        ),
        collected.samples.summary(),
    );

    let report = Report::build(RunHeader::new(), &results, &[]);
    let table = report
        .tables
        .iter()
        .find(|t| t.title == "Prediction Accuracy: hit_rate")
        .unwrap();
    assert_eq!(table.rows[0][4], ReportCell::Value(Some(87.5)));
    assert!(report
        .render(ReportFormat::Tsv)
        .contains("release\tbench\tnan\tnan\t87.500000"));
}
