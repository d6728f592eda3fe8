//! Shared internal utilities for ABI adapters.

use std::ffi::c_char;

/// Scan a C string with an optional hard bound.
///
/// Returns `(len, terminated)` where:
/// - `len` is the byte length before the first NUL or before the bound.
/// - `terminated` indicates whether a NUL byte was observed.
///
/// A null `ptr` scans as `(0, false)`.
///
/// # Safety
///
/// Unless null, `ptr` must be valid to read up to the discovered length (and
/// bound when given).
pub unsafe fn scan_c_string(ptr: *const c_char, bound: Option<usize>) -> (usize, bool) {
    if ptr.is_null() {
        return (0, false);
    }
    match bound {
        Some(limit) => {
            for i in 0..limit {
                if unsafe { *ptr.add(i) } == 0 {
                    return (i, true);
                }
            }
            (limit, false)
        }
        None => {
            let mut i = 0usize;
            while unsafe { *ptr.add(i) } != 0 {
                i += 1;
            }
            (i, true)
        }
    }
}

/// Clamp a C `int` length request to `usize`; negatives become zero.
#[must_use]
pub fn clamp_length(length: i32) -> usize {
    usize::try_from(length).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_unbounded_stops_at_nul() {
        let s = b"bench\0mark\0";
        assert_eq!(unsafe { scan_c_string(s.as_ptr().cast(), None) }, (5, true));
    }

    #[test]
    fn scan_bounded_reports_missing_terminator() {
        let s = b"abcdef";
        assert_eq!(
            unsafe { scan_c_string(s.as_ptr().cast(), Some(4)) },
            (4, false)
        );
        assert_eq!(
            unsafe { scan_c_string(s.as_ptr().cast(), Some(0)) },
            (0, false)
        );
    }

    #[test]
    fn scan_null_is_empty() {
        assert_eq!(
            unsafe { scan_c_string(std::ptr::null(), None) },
            (0, false)
        );
    }

    #[test]
    fn negative_lengths_clamp_to_zero() {
        assert_eq!(clamp_length(-1), 0);
        assert_eq!(clamp_length(i32::MIN), 0);
        assert_eq!(clamp_length(128), 128);
    }
}
