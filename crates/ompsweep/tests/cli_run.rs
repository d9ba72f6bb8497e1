//! `ompsweep` subcommands against shell-script benchmarks.

use clap::Parser;
use std::path::Path;
use ompsweep::cli::{execute, Cli};

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// eval/src/toy/toy.sh, a pass-through profiler, and a config naming both
fn fixture(root: &Path) -> std::path::PathBuf {
    let bench_dir = root.join("eval/src/toy");
    std::fs::create_dir_all(&bench_dir).unwrap();
    write_script(&bench_dir, "toy.sh", "echo \"Compute time: $1\"");
    write_script(
        root,
        "prof.sh",
        "\"$@\"\necho 'execution time 40ms' >&2\necho 'Found 2 potential unused data transfer(s).' >&2",
    );

    let config = root.join("sweep.toml");
    std::fs::write(
        &config,
        format!(
            r#"
eval_dir = "eval"

[profiler]
command = "{}"

[[benchmarks]]
name = "toy"
directory = "src/toy"
commands = ["./toy.sh 0.5", "./toy.sh 1.5", "./toy.sh 2.5"]
patterns = ['Compute time:\s*([\d.]+)']
"#,
            root.join("prof.sh").display()
        ),
    )
    .unwrap();
    config
}

fn run_cli(args: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(args)?;
    let mut out = Vec::new();
    execute(cli, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn test_run_without_rebuild_reports_current_point() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let config = config.display().to_string();
    let before = std::env::current_dir().unwrap();

    let report = run_cli(&[
        "ompsweep",
        "run",
        "--config",
        &config,
        "--no-build",
        "--warmup",
        "0",
        "--max-repetitions",
        "2",
        "--format",
        "tsv",
    ])
    .unwrap();

    assert_eq!(std::env::current_dir().unwrap(), before);
    assert!(report.starts_with("# Run "));
    assert!(report.contains("# Execution Time Overhead: current"));
    assert!(report.contains("toy\t0.500000\t0.500000\t1.500000\t1.500000\t2.500000\t2.500000"));
    assert!(report.contains("# Overhead Ratio (p / np): current"));
    assert!(report.contains("toy\t1.000000\t1.000000\t1.000000"));
    assert!(report.contains("unused_transfers"));
    assert!(report.contains("current\ttoy\t2.000000\t2.000000\t2.000000"));
    assert!(!report.contains("Skipped configurations"));
}

#[test]
fn test_run_rejects_unknown_benchmark_filter() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let config = config.display().to_string();

    let err = run_cli(&[
        "ompsweep",
        "run",
        "--config",
        &config,
        "--no-build",
        "--benchmark",
        "nosuch",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("nosuch"));
}

#[test]
fn test_list_prints_matrix_and_points() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let config = config.display().to_string();

    let listing = run_cli(&["ompsweep", "list", "--config", &config]).unwrap();
    assert!(listing.contains("Benchmarks:"));
    assert!(listing.contains("toy"));
    assert!(listing.contains("./toy.sh 1.5"));
    assert!(listing.contains("Configurations:"));
    assert!(listing.contains("collisions-xxh3"));
    assert!(listing.contains("-DHASH_FUNCTION=XXH3"));
}

#[test]
fn test_extract_reads_saved_output() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("prof.log");
    std::fs::write(&log, "==7== execution time 1.2s\n==7== execution time 900ms\n").unwrap();
    let log = log.display().to_string();

    let value = run_cli(&[
        "ompsweep",
        "extract",
        &log,
        "--pattern",
        r"execution time\s+([\d.]+)\s*(ms|s)",
        "--unit",
        "auto",
    ])
    .unwrap();
    assert_eq!(value.trim(), "0.9");
}
