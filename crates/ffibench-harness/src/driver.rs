//! Microbenchmark driver: times each call shape over a list of lengths.
//!
//! Every (shape, length) pair gets a warmup phase, then `sample_count`
//! samples of `sample_iters` calls each. A sample records the mean ns/op of
//! its batch; the reported percentiles are over samples.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::inputs::{DEFAULT_LENGTHS, DEFAULT_SEED, InputKind};
use crate::shapes::{BridgeFixture, CallShape, PreparedCall};
use crate::structured_log::{LogEmitter, LogLevel, Outcome};

/// Microbenchmark sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrobenchConfig {
    pub warmup_iters: u64,
    pub sample_count: usize,
    pub sample_iters: u64,
}

impl Default for MicrobenchConfig {
    fn default() -> Self {
        Self {
            warmup_iters: 1_000,
            sample_count: 15,
            sample_iters: 2_000,
        }
    }
}

/// What to measure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub shapes: Vec<CallShape>,
    pub lengths: Vec<usize>,
    pub input: InputKind,
    pub seed: u64,
    pub bench: MicrobenchConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shapes: CallShape::ALL.to_vec(),
            lengths: DEFAULT_LENGTHS.to_vec(),
            input: InputKind::Ascending,
            seed: DEFAULT_SEED,
            bench: MicrobenchConfig::default(),
        }
    }
}

impl RunConfig {
    /// Lengths measured for `shape`. Shapes whose cost does not depend on a
    /// length are measured once, at 0.
    #[must_use]
    pub fn lengths_for(&self, shape: CallShape) -> Vec<usize> {
        if shape.takes_length() {
            self.lengths.clone()
        } else {
            vec![0]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub p50_ns_op: f64,
    pub p95_ns_op: f64,
    pub p99_ns_op: f64,
    pub mean_ns_op: f64,
}

/// Timing of one shape at one length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub shape: CallShape,
    pub length: usize,
    pub input: InputKind,
    pub stats: LatencyStats,
    pub ops_per_ms: f64,
    /// Managed comparator calls per operation; absent for native shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_calls_per_op: Option<f64>,
}

/// Measure one shape at one length.
pub fn measure(
    fixture: &BridgeFixture,
    shape: CallShape,
    length: usize,
    input: InputKind,
    seed: u64,
    cfg: MicrobenchConfig,
) -> Result<Measurement, HarnessError> {
    if cfg.sample_count == 0 || cfg.sample_iters == 0 {
        return Err(HarnessError::invalid(
            "sample count and iterations per sample must be positive",
        ));
    }
    let mut call = PreparedCall::new(fixture, shape, length, input, seed)?;

    for _ in 0..cfg.warmup_iters {
        call.call()?;
    }

    // One counted call after warmup, so the first-use binding is excluded.
    let bridge_calls_per_op = if shape.is_bridged() {
        let before = fixture.stats().invocations;
        call.call()?;
        Some((fixture.stats().invocations - before) as f64)
    } else {
        None
    };

    let mut samples = Vec::with_capacity(cfg.sample_count);
    for _ in 0..cfg.sample_count {
        let start = Instant::now();
        for _ in 0..cfg.sample_iters {
            call.call()?;
        }
        let dur = start.elapsed().max(Duration::from_nanos(1));
        samples.push(dur.as_nanos() as f64 / cfg.sample_iters as f64);
    }

    let stats = stats_from_samples(samples);
    Ok(Measurement {
        shape,
        length,
        input,
        ops_per_ms: ops_per_ms(stats.mean_ns_op),
        stats,
        bridge_calls_per_op,
    })
}

/// Measure every configured (shape, length) pair against one fixture.
///
/// Each measurement is logged as a `measurement` event when `log` is given.
pub fn run(
    cfg: &RunConfig,
    log: Option<&mut LogEmitter>,
) -> Result<Vec<Measurement>, HarnessError> {
    let fixture = BridgeFixture::new();
    run_with(&fixture, cfg, log)
}

/// [`run`] against a caller-provided fixture.
pub fn run_with(
    fixture: &BridgeFixture,
    cfg: &RunConfig,
    mut log: Option<&mut LogEmitter>,
) -> Result<Vec<Measurement>, HarnessError> {
    if cfg.shapes.is_empty() || cfg.lengths.is_empty() {
        return Err(HarnessError::invalid("nothing to measure"));
    }
    let mut out = Vec::new();
    for &shape in &cfg.shapes {
        for length in cfg.lengths_for(shape) {
            let started = Instant::now();
            let measurement = match measure(fixture, shape, length, cfg.input, cfg.seed, cfg.bench)
            {
                Ok(m) => m,
                Err(err) => {
                    if let Some(log) = log.as_deref_mut() {
                        let entry = log
                            .entry(LogLevel::Error, "measurement_failed")
                            .with_shape(shape, length)
                            .with_input(cfg.input.as_str())
                            .with_outcome(Outcome::Error)
                            .with_details(serde_json::json!({ "error": err.to_string() }));
                        log.emit_entry(entry)?;
                    }
                    return Err(err);
                }
            };
            if let Some(log) = log.as_deref_mut() {
                let mut entry = log
                    .entry(LogLevel::Info, "measurement")
                    .with_shape(shape, length)
                    .with_input(cfg.input.as_str())
                    .with_timing(measurement.stats.mean_ns_op, measurement.ops_per_ms)
                    .with_outcome(Outcome::Pass)
                    .with_duration_ms(started.elapsed().as_millis() as u64);
                if let Some(calls) = measurement.bridge_calls_per_op {
                    entry = entry.with_bridge_calls(calls);
                }
                log.emit_entry(entry)?;
            }
            out.push(measurement);
        }
    }
    Ok(out)
}

/// Operations per millisecond for a mean latency in ns.
#[must_use]
pub fn ops_per_ms(mean_ns_op: f64) -> f64 {
    if mean_ns_op > 0.0 {
        1_000_000.0 / mean_ns_op
    } else {
        0.0
    }
}

#[must_use]
pub fn stats_from_samples(mut samples: Vec<f64>) -> LatencyStats {
    if samples.is_empty() {
        return LatencyStats {
            samples: 0,
            p50_ns_op: 0.0,
            p95_ns_op: 0.0,
            p99_ns_op: 0.0,
            mean_ns_op: 0.0,
        };
    }
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    LatencyStats {
        samples: samples.len(),
        p50_ns_op: percentile_f64_sorted(&samples, 0.50),
        p95_ns_op: percentile_f64_sorted(&samples, 0.95),
        p99_ns_op: percentile_f64_sorted(&samples, 0.99),
        mean_ns_op: mean,
    }
}

fn percentile_f64_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p));
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
