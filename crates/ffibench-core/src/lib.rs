//! # ffibench-core
//!
//! Safe building blocks for the ffibench native library.
//!
//! Everything here operates on borrowed slices; the raw-pointer entry points
//! live in `ffibench-abi` and the managed-runtime bridge in `ffibench-bridge`.
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod sort;
pub mod string;
pub mod token;

pub use token::ElementToken;
