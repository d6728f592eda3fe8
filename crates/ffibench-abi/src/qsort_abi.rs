//! Native sort with a C function-pointer comparator.
//!
//! The native baseline for the bridged sort: the same algorithm, with every
//! comparison an indirect call instead of a managed-runtime crossing.

use std::ffi::{c_int, c_long};

use ffibench_core::{ElementToken, sort};

/// C comparator over two element pointers.
pub type CompareFn = unsafe extern "C" fn(*const c_int, *const c_int) -> c_int;

#[inline]
fn element_ptr(token: ElementToken) -> *const c_int {
    std::ptr::with_exposed_provenance(token.raw() as usize)
}

abi_fn! {
    /// Sort `elements` ints at `data` in place, asking `cmp` for every
    /// ordering decision. Null `data`, null `cmp` or `elements <= 0` sort
    /// nothing.
    fn ffi_benchmark_qsort(data: *mut c_int, elements: c_long, cmp: Option<CompareFn>) {
        let Some(cmp) = cmp else {
            return;
        };
        let Ok(len) = usize::try_from(elements) else {
            return;
        };
        if data.is_null() || len == 0 {
            return;
        }
        // SAFETY: caller guarantees `elements` valid ints at `data`, not
        // accessed elsewhere during the call.
        let buffer = unsafe { std::slice::from_raw_parts_mut(data, len) };
        sort::sort_by_token(buffer, |left, right| {
            // SAFETY: tokens name elements of `buffer`; `cmp` only reads them.
            unsafe { cmp(element_ptr(left), element_ptr(right)) }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    unsafe extern "C" fn ascending(a: *const c_int, b: *const c_int) -> c_int {
        let (a, b) = unsafe { (*a, *b) };
        a.cmp(&b) as c_int
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting(a: *const c_int, b: *const c_int) -> c_int {
        CALLS.fetch_add(1, Ordering::Relaxed);
        unsafe { ascending(a, b) }
    }

    #[test]
    fn sorts_with_function_pointer() {
        let mut data = [5, 3, 3, -1, 0];
        unsafe { ffi_benchmark_qsort(data.as_mut_ptr(), 5, Some(ascending)) };
        assert_eq!(data, [-1, 0, 3, 3, 5]);
    }

    #[test]
    fn degenerate_arguments_are_no_ops() {
        let mut data = [2, 1];
        unsafe {
            ffi_benchmark_qsort(data.as_mut_ptr(), 2, None);
            ffi_benchmark_qsort(data.as_mut_ptr(), 0, Some(ascending));
            ffi_benchmark_qsort(data.as_mut_ptr(), -7, Some(ascending));
            ffi_benchmark_qsort(std::ptr::null_mut(), 2, Some(ascending));
        }
        assert_eq!(data, [2, 1]);
    }

    #[test]
    fn comparator_calls_match_algorithm_count() {
        let input: Vec<c_int> = (0..64).rev().collect();
        let mut data = input.clone();
        CALLS.store(0, Ordering::Relaxed);
        unsafe { ffi_benchmark_qsort(data.as_mut_ptr(), 64, Some(counting)) };
        assert_eq!(
            CALLS.load(Ordering::Relaxed) as u64,
            sort::comparison_count(&input)
        );
        assert!(data.windows(2).all(|w| w[0] <= w[1]));
    }
}
