//! System-facility call shape: `sysinfo(2)`.

#[cfg(target_os = "linux")]
abi_fn! {
    /// Fill `info` with `sysinfo(2)`. A null `info` is ignored.
    fn ffi_benchmark_sysinfo(info: *mut libc::sysinfo) {
        if info.is_null() {
            return;
        }
        // SAFETY: caller passes a writable `struct sysinfo`.
        unsafe { libc::sysinfo(info) };
    }
}

/// `mem_unit` reported by `sysinfo(2)`, or 0 when the call fails or the
/// platform has no `sysinfo`.
#[must_use]
pub fn mem_unit() -> u32 {
    #[cfg(target_os = "linux")]
    {
        let mut info = std::mem::MaybeUninit::<libc::sysinfo>::zeroed();
        // SAFETY: `info` is a writable, zeroed `struct sysinfo`; a failed
        // call leaves it zeroed, so `mem_unit` reads as 0.
        unsafe {
            ffi_benchmark_sysinfo(info.as_mut_ptr());
            info.assume_init().mem_unit
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        0
    }
}
