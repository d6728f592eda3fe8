//! `abi_fn!`: declares one `ffi_benchmark_*` export.

/// Declare a C-callable benchmark export.
///
/// ```ignore
/// abi_fn! {
///     /// Length of the string at `s`.
///     fn ffi_benchmark_strlen(s: *const c_char) -> c_long {
///         // SAFETY: ...
///         unsafe { ... }
///     }
/// }
/// ```
///
/// The export keeps its Rust name as the C symbol, so it matches the
/// `ffi_benchmark_*` pattern in the version script, and uses the C calling
/// convention a foreign benchmark driver expects. Exports take raw
/// pointers from foreign callers, so each one is an `unsafe fn`. Bodies
/// still mark their own `unsafe` blocks with a `// SAFETY:` note; the
/// macro's outer block only keeps pointer-free bodies such as
/// `ffi_benchmark_noop` from needing one.
macro_rules! abi_fn {
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) -> $ret:ty
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[allow(unused_unsafe)]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) -> $ret {
            unsafe { $body }
        }
    };

    // Exports returning nothing.
    (
        $(#[$meta:meta])*
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? )
        $body:block
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        #[allow(unused_unsafe)]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) {
            unsafe { $body }
        }
    };
}
