//! NUL-terminated byte strings.

/// Length of the C string held in `s`: bytes before the first NUL, or the
/// whole slice when no NUL is present.
#[must_use]
pub fn strlen(s: &[u8]) -> usize {
    s.iter().position(|&b| b == 0).unwrap_or(s.len())
}
