//! Command-line surface

use crate::config::SweepConfig;
use crate::orchestrator::{current_point, Orchestrator, RunOptions};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sweep_engine::extract::{Extraction, ExtractionPattern, MetricExtractor, UnitPolicy};
use sweep_engine::runner::{SampleRunner, ShellExecutor};
use sweep_engine::sweep::{PrebuiltTarget, TargetBuilder};
use sweep_engine::{Report, ReportFormat, RunHeader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmark sweep driver for the OpenMP data-transfer profiler", long_about = None)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Baseline pass, then rebuild and profile every configuration point
    Run(RunArgs),
    /// Print the benchmark matrix and configuration points
    List {
        /// Sweep configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Apply an extraction pattern to a saved output file
    Extract {
        /// Captured benchmark or profiler output
        file: PathBuf,

        /// Regex whose first group is the number
        #[arg(long)]
        pattern: String,

        /// s, ms, us, ns, auto or raw
        #[arg(long, default_value = "s")]
        unit: UnitPolicy,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Sweep configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report layout: fixed or tsv
    #[arg(long)]
    pub format: Option<ReportFormat>,

    /// Warm-up runs per session
    #[arg(long)]
    pub warmup: Option<usize>,

    /// Measuring runs per session
    #[arg(long)]
    pub max_repetitions: Option<usize>,

    /// Confidence level for early stopping; 0 disables it
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Only run the named benchmark (repeatable)
    #[arg(long = "benchmark", value_name = "NAME")]
    pub benchmarks: Vec<String>,

    /// Skip the uninstrumented pass
    #[arg(long)]
    pub skip_baseline: bool,

    /// Profile the existing build as a single `current` point
    #[arg(long)]
    pub no_build: bool,

    /// Instrumentation wrapper command
    #[arg(long)]
    pub profiler: Option<String>,

    /// Root of the benchmark sources
    #[arg(long)]
    pub eval_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Layer flags over a loaded configuration
    pub fn apply(&self, config: &mut SweepConfig) {
        if let Some(format) = self.format {
            config.report.format = format;
        }
        if let Some(warmup) = self.warmup {
            config.sampler.warmup_count = warmup;
        }
        if let Some(reps) = self.max_repetitions {
            config.sampler.max_repetitions = reps;
        }
        if let Some(confidence) = self.confidence {
            config.sampler.confidence = confidence;
        }
        if let Some(profiler) = &self.profiler {
            config.profiler.command = Some(profiler.clone());
        }
        if let Some(dir) = &self.eval_dir {
            config.eval_dir = Some(dir.clone());
        }
    }
}

/// File, then environment
pub fn load_config(path: Option<&Path>) -> Result<SweepConfig> {
    let mut config = match path {
        Some(path) => SweepConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SweepConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

pub fn execute(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Command::Run(args) => run(&args, out),
        Command::List { config } => list(config.as_deref(), out),
        Command::Extract {
            file,
            pattern,
            unit,
        } => extract(&file, &pattern, unit, out),
    }
}

fn run(args: &RunArgs, out: &mut dyn Write) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let matrix = config
        .matrix()
        .context("Invalid benchmark matrix")?
        .retain_named(&args.benchmarks)?;
    let profiler = config.profiler_command()?;
    let runner = SampleRunner::new(ShellExecutor::new()).with_profiler(profiler.as_str());

    let builder: Box<dyn TargetBuilder> = if args.no_build {
        Box::new(PrebuiltTarget)
    } else {
        Box::new(config.builder()?)
    };
    let points = if args.no_build {
        vec![current_point()]
    } else {
        config.points()?
    };

    info!(
        profiler = %profiler,
        benchmarks = matrix.len(),
        points = points.len(),
        warmup = config.sampler.warmup_count,
        max_repetitions = config.sampler.max_repetitions,
        confidence = config.sampler.confidence,
        "Run configured"
    );

    let header = RunHeader::new();
    let orchestrator = Orchestrator::new(&matrix, &runner, config.sampler, builder.as_ref())?;
    let outcome = orchestrator.run(
        &points,
        RunOptions {
            skip_baseline: args.skip_baseline,
        },
    )?;

    let report = Report::build(header, &outcome.results, &outcome.sweep.skipped);
    out.write_all(report.render(config.report.format).as_bytes())
        .context("Failed to write report")?;
    Ok(())
}

fn list(config: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let config = load_config(config)?;
    let matrix = config.matrix()?;
    let points = config.points()?;

    writeln!(out, "Benchmarks:")?;
    for spec in matrix.iter() {
        let signals: Vec<&str> = spec.signals.iter().map(|s| s.name.as_str()).collect();
        writeln!(
            out,
            "  {:<15} {} [{}]",
            spec.name,
            spec.directory.display(),
            signals.join(", ")
        )?;
        for (size, command) in sweep_engine::ProblemSize::ALL.iter().zip(&spec.commands) {
            writeln!(out, "    {:<8} {}", size.label(), command)?;
        }
    }
    writeln!(out, "Configurations:")?;
    for point in &points {
        writeln!(out, "  {:<15} {}", point.label, point.cmake_args().join(" "))?;
    }
    Ok(())
}

fn extract(file: &Path, pattern: &str, unit: UnitPolicy, out: &mut dyn Write) -> Result<()> {
    let output = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let pattern = ExtractionPattern::compile("extract", pattern, unit)?;
    if pattern.is_wall_clock() {
        bail!("An empty pattern means wall-clock time, which a saved file does not carry");
    }
    match MetricExtractor::extract(&pattern, &output, Duration::ZERO) {
        Extraction::Value(v) => writeln!(out, "{}", v)?,
        Extraction::Miss(reason) => bail!("No value extracted: {}", reason),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "ompsweep",
            "run",
            "--format",
            "tsv",
            "--confidence",
            "0.95",
            "--benchmark",
            "bfs",
            "--benchmark",
            "lud",
            "--no-build",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.format, Some(ReportFormat::Tsv));
        assert_eq!(args.confidence, Some(0.95));
        assert_eq!(args.benchmarks, vec!["bfs", "lud"]);
        assert!(args.no_build);
        assert!(!args.skip_baseline);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["ompsweep", "run", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = SweepConfig::default();
        let args = RunArgs {
            warmup: Some(0),
            max_repetitions: Some(5),
            profiler: Some("prof".to_string()),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.sampler.warmup_count, 0);
        assert_eq!(config.sampler.max_repetitions, 5);
        assert_eq!(config.sampler.confidence, 0.0);
        assert_eq!(config.profiler.command.as_deref(), Some("prof"));
    }

    #[test]
    fn test_extract_prints_converted_value() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.log");
        std::fs::write(&file, "Time consumed(ms): 12\nTime consumed(ms): 250\n").unwrap();

        let mut out = Vec::new();
        extract(
            &file,
            r"Time consumed\(ms\):\s*([\d.]+)",
            "ms".parse().unwrap(),
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "0.25");
    }

    #[test]
    fn test_extract_miss_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.log");
        std::fs::write(&file, "nothing here\n").unwrap();
        let mut out = Vec::new();
        let err = extract(&file, r"Compute time:\s*([\d.]+)", UnitPolicy::default(), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("no match"));
    }
}
