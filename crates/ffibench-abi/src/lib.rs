// All extern "C" ABI exports accept raw pointers from C or JVM callers, under
// the contracts documented on each module.
#![allow(clippy::missing_safety_doc)]
//! # ffibench-abi
//!
//! Exported boundary of the ffibench native library.
//!
//! This crate produces a `cdylib` exposing one `extern "C"` symbol per
//! benchmark call shape, plus (with the `jni` feature) the JNI natives of the
//! Java benchmark classes. Each export is a thin adapter over
//! `ffibench-core` (algorithms) and `ffibench-bridge` (managed callbacks).
//!
//! # Architecture
//!
//! ```text
//! C caller   -> ffi_benchmark_* (this crate) -> core impl -> return
//! JVM caller -> Java_* (jni_abi)             -> bridge engine -> core sort
//!                                                    \-> managed comparator (per comparison)
//! ```
//!
//! Bridge failures at a JNI export terminate the process with a diagnostic
//! line on stderr; see `ffibench_bridge::fatal`.

#[macro_use]
mod macros;

pub mod call_shapes_abi;
pub mod qsort_abi;
pub mod sysinfo_abi;

#[cfg(feature = "jni")]
pub mod jni_abi;

pub mod util;
