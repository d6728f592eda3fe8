use std::ffi::{CStr, c_int, c_long};

use ffibench_abi::call_shapes_abi::{ffi_benchmark_get_string, ffi_benchmark_strlen};
use ffibench_abi::qsort_abi::ffi_benchmark_qsort;

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

unsafe extern "C" fn ascending(a: *const c_int, b: *const c_int) -> c_int {
    let (a, b) = unsafe { (*a, *b) };
    a.cmp(&b) as c_int
}

unsafe extern "C" fn descending(a: *const c_int, b: *const c_int) -> c_int {
    unsafe { ascending(b, a) }
}

#[test]
fn qsort_matches_std_sort_on_random_input() {
    let mut rng = XorShift64::new(0xC0FFEE);
    for len in [0_usize, 1, 2, 8, 16, 32, 64, 128, 1000] {
        let mut data: Vec<c_int> = (0..len).map(|_| (rng.next_u64() % 97) as c_int).collect();
        let mut expected = data.clone();
        expected.sort_unstable();
        unsafe { ffi_benchmark_qsort(data.as_mut_ptr(), len as c_long, Some(ascending)) };
        assert_eq!(data, expected, "len={len}");
    }
}

#[test]
fn qsort_honours_comparator_direction() {
    let mut data: Vec<c_int> = (0..50).collect();
    unsafe { ffi_benchmark_qsort(data.as_mut_ptr(), 50, Some(descending)) };
    assert!(data.iter().copied().eq((0..50).rev()));
}

#[test]
fn benchmark_lengths_produce_pattern_strings() {
    for len in [0, 8, 16, 32, 64, 128] {
        let ptr = unsafe { ffi_benchmark_get_string(len) };
        let s = unsafe { CStr::from_ptr(ptr) }.to_bytes();
        assert_eq!(s.len(), len as usize);
        assert!(
            s.iter()
                .enumerate()
                .all(|(i, &b)| b == b'A' + (i % 26) as u8)
        );
        assert_eq!(unsafe { ffi_benchmark_strlen(ptr) }, c_long::from(len));
    }
}

#[test]
fn get_string_is_safe_to_share_across_threads() {
    let ptrs: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| unsafe { ffi_benchmark_get_string(77) } as usize))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
}
