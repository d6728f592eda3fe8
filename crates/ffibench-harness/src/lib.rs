//! Benchmark driver and property verifier for ffibench.
//!
//! This crate provides:
//! - Call shapes: every exported entry point, prepared for repeated calls
//! - Input generation: ascending, descending and seeded random sort inputs
//! - Driver: warmup + sampled timing per shape and length
//! - Verification: the bridge's sorting and binding properties
//! - Report generation: JSON and markdown reports, JSONL structured logs

pub mod driver;
pub mod error;
pub mod inputs;
pub mod report;
pub mod shapes;
pub mod structured_log;
pub mod verify;

pub use driver::{Measurement, MicrobenchConfig, RunConfig};
pub use error::HarnessError;
pub use report::{BenchReport, VerifyReport};
pub use shapes::{BridgeFixture, CallShape, PreparedCall};
pub use verify::VerificationSummary;
