//! Fixed-cost call shapes: no-op, string in, string length, string out.

use std::ffi::{c_char, c_int, c_long};

use ffibench_core::string::table;

use crate::util::{clamp_length, scan_c_string};

abi_fn! {
    /// Does nothing. Measures the bare cost of a foreign call.
    fn ffi_benchmark_noop() {}
}

abi_fn! {
    /// Accepts a string and ignores it. Measures argument marshalling only.
    fn ffi_benchmark_accept_string(_str: *const c_char) {}
}

abi_fn! {
    /// Length of the NUL-terminated string at `s`; 0 for null.
    fn ffi_benchmark_strlen(s: *const c_char) -> c_long {
        // SAFETY: caller passes a NUL-terminated string or null.
        let (len, _) = unsafe { scan_c_string(s, None) };
        c_long::try_from(len).unwrap_or(c_long::MAX)
    }
}

abi_fn! {
    /// Cached `length`-character string `"ABC..."`; negative lengths give
    /// the empty string and lengths past `MAX_LENGTH` (4096) are capped.
    /// The returned pointer stays valid for the life of the process and must
    /// not be freed.
    fn ffi_benchmark_get_string(length: c_int) -> *const c_char {
        table::global().get(clamp_length(length)).as_ptr().cast()
    }
}
