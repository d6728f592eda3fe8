//! CLI entrypoint for the ffibench benchmark harness.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use ffibench_harness::driver::{self, MicrobenchConfig, RunConfig};
use ffibench_harness::inputs::{self, InputKind};
use ffibench_harness::report::{BenchReport, VerifyReport};
use ffibench_harness::shapes::{self, BridgeFixture};
use ffibench_harness::structured_log::{
    self, ArtifactIndex, LogEmitter, LogLevel, Outcome, RunKind,
};
use ffibench_harness::verify;

/// Benchmark and verification tooling for ffibench.
#[derive(Debug, Parser)]
#[command(name = "ffibench-harness")]
#[command(about = "Native/managed FFI boundary benchmark harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Time every call shape across a list of lengths.
    Run {
        /// Comma-separated call shapes, or `all`.
        #[arg(long, default_value = "all")]
        shapes: String,
        /// Comma-separated string lengths / element counts.
        #[arg(long, default_value = "0,8,16,32,64,128")]
        lengths: String,
        /// Sort input kind (`ascending`, `descending`, `random`).
        #[arg(long, default_value = "ascending")]
        input: String,
        /// Seed for random inputs (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        /// Warmup calls per shape and length.
        #[arg(long, default_value_t = 1_000)]
        warmup_iters: u64,
        /// Sample count.
        #[arg(long, default_value_t = 15)]
        samples: usize,
        /// Calls per sample.
        #[arg(long, default_value_t = 2_000)]
        iters: u64,
        /// Output JSON report path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Optional markdown report path.
        #[arg(long)]
        markdown: Option<PathBuf>,
        /// Optional structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Optional artifact index path (requires `--output`).
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Check the bridge's sorting and binding properties. Exits 1 on a
    /// violation.
    Verify {
        /// Root seed (decimal or 0x...).
        #[arg(long, default_value = "0xDEAD_BEEF")]
        seed: String,
        /// Check only this property.
        #[arg(long)]
        property: Option<String>,
        /// Output report path (markdown).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Optional structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Sort through the raw-address boundary with a comparator whose class
    /// lacks `compare(JJ)I`. The process terminates with the bridge's fatal
    /// exit status.
    BindFailure {
        /// Comparator class to bind against.
        #[arg(long, default_value = "benchmark/BrokenComparator")]
        class: String,
        /// Elements to sort.
        #[arg(long, default_value_t = 16)]
        elements: usize,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        /// Log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            shapes,
            lengths,
            input,
            seed,
            warmup_iters,
            samples,
            iters,
            output,
            markdown,
            log,
            artifact_index,
            timestamp,
        } => {
            let cfg = RunConfig {
                shapes: shapes::parse_shapes(&shapes)?,
                lengths: inputs::parse_lengths(&lengths)?,
                input: input.parse::<InputKind>()?,
                seed: parse_seed(&seed)?,
                bench: MicrobenchConfig {
                    warmup_iters,
                    sample_count: samples,
                    sample_iters: iters,
                },
            };
            let run_id = run_id();
            let mut emitter = match &log {
                Some(path) => Some(LogEmitter::to_file(path, RunKind::Bench, &run_id)?),
                None => None,
            };
            if let Some(emitter) = emitter.as_mut() {
                emitter.emit(LogLevel::Info, "run_start")?;
            }

            let started = Instant::now();
            let fixture = BridgeFixture::new();
            eprintln!(
                "Measuring {} shape(s) at lengths {:?} ({} input)",
                cfg.shapes.len(),
                cfg.lengths,
                cfg.input
            );
            let measurements = driver::run_with(&fixture, &cfg, emitter.as_mut())?;

            let report = BenchReport {
                title: "ffibench call-shape benchmark".to_string(),
                timestamp: timestamp.unwrap_or_else(structured_log::now_utc),
                input: cfg.input,
                seed: cfg.seed,
                config: cfg.bench,
                measurements,
                runtime: fixture.stats(),
            };

            let mut artifacts = Vec::new();
            match &output {
                Some(path) => {
                    std::fs::write(path, report.to_json())?;
                    eprintln!("Wrote JSON report to {}", path.display());
                    artifacts.push(path.clone());
                }
                None => println!("{}", report.to_json()),
            }
            if let Some(path) = &markdown {
                std::fs::write(path, report.to_markdown())?;
                eprintln!("Wrote markdown report to {}", path.display());
                artifacts.push(path.clone());
            }
            if let Some(index_path) = &artifact_index {
                if output.is_none() {
                    return Err("--artifact-index requires --output".into());
                }
                write_artifact_index(index_path, &run_id, &artifacts)?;
                eprintln!("Wrote artifact index to {}", index_path.display());
            }

            if let Some(mut emitter) = emitter {
                let refs = artifacts.iter().map(|p| p.display().to_string()).collect();
                let entry = emitter
                    .entry(LogLevel::Info, "run_end")
                    .with_outcome(Outcome::Pass)
                    .with_duration_ms(started.elapsed().as_millis() as u64)
                    .with_artifacts(refs);
                emitter.emit_entry(entry)?;
                emitter.flush()?;
            }
        }
        Command::Verify {
            seed,
            property,
            report,
            log,
        } => {
            let seed = parse_seed(&seed)?;
            let summary = match &property {
                Some(name) => {
                    verify::VerificationSummary::from_results(vec![verify::verify_one(name, seed)?])
                }
                None => verify::verify_all(seed),
            };

            if let Some(path) = &log {
                let mut emitter = LogEmitter::to_file(path, RunKind::Verify, &run_id())?;
                for r in &summary.results {
                    let (level, outcome) = if r.passed {
                        (LogLevel::Info, Outcome::Pass)
                    } else {
                        (LogLevel::Error, Outcome::Fail)
                    };
                    let entry = emitter
                        .entry(level, "property_checked")
                        .with_property(&r.property)
                        .with_outcome(outcome)
                        .with_details(serde_json::json!({ "detail": r.detail }));
                    emitter.emit_entry(entry)?;
                }
                emitter.flush()?;
            }

            for r in &summary.results {
                let status = if r.passed { "PASS" } else { "FAIL" };
                eprintln!("[{status}] {}: {}", r.property, r.detail);
            }

            let verify_report = VerifyReport {
                title: "ffibench bridge properties".to_string(),
                timestamp: structured_log::now_utc(),
                seed,
                summary,
            };
            if let Some(path) = &report {
                std::fs::write(path, verify_report.to_markdown())?;
                eprintln!("Wrote report to {}", path.display());
            }

            verify_report.summary.ensure_passed()?;
            eprintln!("OK: {} properties verified", verify_report.summary.passed);
        }
        Command::BindFailure { class, elements } => {
            let fixture = BridgeFixture::new();
            let len = i32::try_from(elements)?;
            let mut data: Vec<i32> = (0..len).rev().collect();
            eprintln!("Sorting {elements} elements with comparator class {class}");
            shapes::sort_through_boundary(&fixture, &class, &mut data)?;
            // Reached only when the class does implement the comparator.
            eprintln!("Sort completed; {class} is a valid comparator");
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = structured_log::validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{} validation error(s) in {} line(s) of {}",
                    errors.len(),
                    lines,
                    log.display()
                )
                .into());
            }
            eprintln!("OK: {lines} valid line(s) in {}", log.display());
        }
    }

    Ok(())
}

fn write_artifact_index(
    path: &Path,
    run_id: &str,
    artifacts: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut index = ArtifactIndex::new(run_id);
    for artifact in artifacts {
        let kind = match artifact.extension().and_then(|e| e.to_str()) {
            Some("md") => "markdown_report",
            _ => "json_report",
        };
        index.add_file(artifact, kind)?;
    }
    std::fs::write(path, index.to_json()?)?;
    Ok(())
}

fn run_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    format!("{millis}-{}", std::process::id())
}

fn parse_seed(raw: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let s = raw.trim();
    let seed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        let hex = hex.replace('_', "");
        u64::from_str_radix(&hex, 16)?
    } else {
        let dec = s.replace('_', "");
        dec.parse::<u64>()?
    };
    Ok(seed)
}
