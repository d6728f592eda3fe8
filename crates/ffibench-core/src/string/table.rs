//! Fixed-length string table backing the string-returning call shape.
//!
//! Every length maps to one NUL-terminated string whose i-th byte is
//! `b'A' + i % 26`. Strings are built on first request and live for the rest
//! of the process, so native callers may hand out raw pointers to them.
//! Lengths are capped at [`MAX_LENGTH`], which bounds the table at about
//! 8 MiB even if every length is requested.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// Byte at position `i` of every generated string.
#[must_use]
pub const fn pattern_byte(i: usize) -> u8 {
    b'A' + (i % 26) as u8
}

/// Longest string the table hands out. Longer requests get this length.
pub const MAX_LENGTH: usize = 4096;

/// Process-lifetime cache of generated strings, keyed by length.
#[derive(Debug, Default)]
pub struct StringTable {
    entries: RwLock<BTreeMap<usize, &'static [u8]>>,
}

impl StringTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// The string of `length` characters (at most [`MAX_LENGTH`]), NUL
    /// terminator included.
    pub fn get(&self, length: usize) -> &'static [u8] {
        let length = length.min(MAX_LENGTH);
        if let Some(cached) = self.entries.read().get(&length) {
            return *cached;
        }
        let mut entries = self.entries.write();
        *entries.entry(length).or_insert_with(|| generate(length))
    }

    /// Number of distinct lengths generated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The table shared by every native entry point.
#[must_use]
pub fn global() -> &'static StringTable {
    static TABLE: StringTable = StringTable::new();
    &TABLE
}

fn generate(length: usize) -> &'static [u8] {
    let mut bytes: Vec<u8> = (0..length).map(pattern_byte).collect();
    bytes.push(0);
    Box::leak(bytes.into_boxed_slice())
}
