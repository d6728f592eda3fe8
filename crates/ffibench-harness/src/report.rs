//! Report generation for benchmark and verification runs.

use serde::{Deserialize, Serialize};

use ffibench_bridge::sim::SimStats;

use crate::driver::{Measurement, MicrobenchConfig};
use crate::inputs::InputKind;
use crate::verify::VerificationSummary;

/// Results of a `run`, with the runtime counters at the end of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchReport {
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub input: InputKind,
    pub seed: u64,
    pub config: MicrobenchConfig,
    pub measurements: Vec<Measurement>,
    pub runtime: SimStats,
}

impl BenchReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Input: {} (seed {:#x})\n", self.input, self.seed));
        out.push_str(&format!(
            "- Samples: {} x {} iterations (warmup {})\n",
            self.config.sample_count, self.config.sample_iters, self.config.warmup_iters
        ));
        out.push_str(&format!(
            "- Global references created: {} (live {})\n\n",
            self.runtime.global_refs_created, self.runtime.live_global_refs
        ));

        out.push_str("| Shape | Length | p50 ns/op | p95 ns/op | mean ns/op | ops/ms | bridge calls/op |\n");
        out.push_str("|-------|-------:|----------:|----------:|-----------:|-------:|----------------:|\n");
        for m in &self.measurements {
            let calls = m
                .bridge_calls_per_op
                .map_or_else(|| "-".to_string(), |c| format!("{c:.0}"));
            out.push_str(&format!(
                "| {} | {} | {:.1} | {:.1} | {:.1} | {:.1} | {} |\n",
                m.shape,
                m.length,
                m.stats.p50_ns_op,
                m.stats.p95_ns_op,
                m.stats.mean_ns_op,
                m.ops_per_ms,
                calls
            ));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Results of a `verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub title: String,
    pub timestamp: String,
    pub seed: u64,
    pub summary: VerificationSummary,
}

impl VerifyReport {
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Seed: {:#x}\n", self.seed));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Property | Status | Detail |\n");
        out.push_str("|----------|--------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("| {} | {} | {} |\n", r.property, status, r.detail));
        }
        out
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stats_from_samples;
    use crate::shapes::CallShape;
    use crate::verify::PropertyResult;

    fn sample_report() -> BenchReport {
        BenchReport {
            title: "ffibench".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            input: InputKind::Ascending,
            seed: 0xDEAD_BEEF,
            config: MicrobenchConfig::default(),
            measurements: vec![
                Measurement {
                    shape: CallShape::Noop,
                    length: 0,
                    input: InputKind::Ascending,
                    stats: stats_from_samples(vec![2.0, 3.0]),
                    ops_per_ms: 400_000.0,
                    bridge_calls_per_op: None,
                },
                Measurement {
                    shape: CallShape::QsortStatic,
                    length: 8,
                    input: InputKind::Ascending,
                    stats: stats_from_samples(vec![900.0]),
                    ops_per_ms: 1_111.1,
                    bridge_calls_per_op: Some(28.0),
                },
            ],
            runtime: SimStats::default(),
        }
    }

    #[test]
    fn markdown_has_one_row_per_measurement() {
        let md = sample_report().to_markdown();
        assert!(md.starts_with("# ffibench\n"));
        assert!(md.contains("| noop | 0 |"));
        assert!(md.contains("| qsort_static | 8 |"));
        assert!(md.contains("| 28 |"));
        assert!(md.contains("seed 0xdeadbeef"));
    }

    #[test]
    fn json_round_trips_shape_names() {
        let json = sample_report().to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["measurements"][1]["shape"], "qsort_static");
        assert!(parsed["measurements"][0].get("bridge_calls_per_op").is_none());
    }

    #[test]
    fn verify_markdown_marks_failures() {
        let report = VerifyReport {
            title: "verify".into(),
            timestamp: "t".into(),
            seed: 1,
            summary: VerificationSummary::from_results(vec![PropertyResult {
                property: "sort_correctness".into(),
                passed: false,
                detail: "unsorted".into(),
            }]),
        };
        assert!(report.to_markdown().contains("| sort_correctness | FAIL | unsorted |"));
    }
}
