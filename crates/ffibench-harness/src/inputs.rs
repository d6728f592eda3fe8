//! Benchmark input generation.
//!
//! Buffers are rebuilt from a pristine copy before every sort, so each
//! measured sort sees the same input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Lengths measured when none are given.
pub const DEFAULT_LENGTHS: [usize; 6] = [0, 8, 16, 32, 64, 128];

pub const DEFAULT_SEED: u64 = 0xDEAD_BEEF;

/// Shape of a sort input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// `0..n`.
    Ascending,
    /// `n-1..=0`.
    Descending,
    /// Seeded permutation of `0..n`.
    Random,
}

impl InputKind {
    pub const ALL: [Self; 3] = [Self::Ascending, Self::Descending, Self::Random];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "sorted" => Ok(Self::Ascending),
            "descending" | "reversed" => Ok(Self::Descending),
            "random" | "xorshift" => Ok(Self::Random),
            other => Err(HarnessError::invalid(format!("unknown input kind `{other}`"))),
        }
    }
}

/// Deterministic xorshift64* generator.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// A zero seed is replaced, since xorshift never leaves zero.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `0..bound`. `bound` must be non-zero.
    pub fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Build an input of `len` elements.
#[must_use]
pub fn generate(kind: InputKind, len: usize, seed: u64) -> Vec<i32> {
    let top = i32::try_from(len).unwrap_or(i32::MAX);
    match kind {
        InputKind::Ascending => (0..top).collect(),
        InputKind::Descending => (0..top).rev().collect(),
        InputKind::Random => {
            let mut rng = XorShift64::new(seed);
            let mut out: Vec<i32> = (0..top).collect();
            // Fisher-Yates.
            for i in (1..out.len()).rev() {
                out.swap(i, rng.below(i + 1));
            }
            out
        }
    }
}

/// Parse a comma-separated list of lengths, e.g. `0,8,16`.
pub fn parse_lengths(raw: &str) -> Result<Vec<usize>, HarnessError> {
    let lengths = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|err| HarnessError::invalid(format!("length `{s}`: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if lengths.is_empty() {
        return Err(HarnessError::invalid("no lengths given"));
    }
    Ok(lengths)
}
