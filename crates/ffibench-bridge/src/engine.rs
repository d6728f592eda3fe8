//! Bridging sort engine.
//!
//! Sorts an `i32` buffer in place with every comparison answered by the bound
//! managed comparator. Binding happens lazily on the first sort through a
//! registry; afterwards each comparison costs one attachment check and one
//! managed call.

use ffibench_core::sort;

use crate::error::BridgeError;
use crate::fatal;
use crate::registry::{Binding, BindingRegistry};
use crate::runtime::{ComparatorSource, ManagedRuntime, RuntimeContext};

/// Bind through `registry` (first call only), then sort `buffer`.
///
/// The binding is established even when `buffer` has fewer than two
/// elements and no comparison is made.
pub fn try_sort<R, X>(
    registry: &BindingRegistry<R>,
    ctx: &mut X,
    source: ComparatorSource<'_, X::Comparator>,
    buffer: &mut [i32],
) -> Result<(), BridgeError>
where
    R: ManagedRuntime,
    X: RuntimeContext<Runtime = R>,
{
    let binding = registry.bind(ctx, source)?;
    try_sort_bound(binding, buffer)
}

/// Sort `buffer` with an established binding. Callable from any thread.
pub fn try_sort_bound<R: ManagedRuntime>(
    binding: &Binding<R>,
    buffer: &mut [i32],
) -> Result<(), BridgeError> {
    sort::try_sort_by_token(buffer, |left, right| {
        // SAFETY: both tokens name elements of `buffer`, which the sort holds
        // borrowed and does not write during a comparison.
        unsafe { binding.invoke(left, right) }
    })
}

/// Resolve a new binding for this call only, then sort.
///
/// Pays method lookup and global-reference creation on every call; the
/// reference is released when the call returns.
pub fn try_sort_fresh<X>(
    ctx: &mut X,
    source: ComparatorSource<'_, X::Comparator>,
    buffer: &mut [i32],
) -> Result<(), BridgeError>
where
    X: RuntimeContext,
{
    let binding = Binding::resolve(ctx, source)?;
    try_sort_bound(&binding, buffer)
}

/// Sort `count` `i32`s starting at `address`, terminating the process on any
/// bridge error.
///
/// A null `address` or a `count <= 0` sorts nothing, but binding is still
/// established.
///
/// # Safety
///
/// Unless `count <= 0` or `address` is null, `address` must point to `count`
/// initialized, aligned `i32`s that nothing else reads or writes until this
/// call returns (the managed comparator excepted, through the tokens it is
/// handed).
pub unsafe fn sort_at_address<R, X>(
    registry: &BindingRegistry<R>,
    ctx: &mut X,
    source: ComparatorSource<'_, X::Comparator>,
    address: u64,
    count: i64,
) where
    R: ManagedRuntime,
    X: RuntimeContext<Runtime = R>,
{
    // SAFETY: forwarded to the caller.
    let buffer = unsafe { buffer_at(address, count) };
    fatal::or_terminate(try_sort(registry, ctx, source, buffer));
}

/// Borrow the raw buffer as a slice; empty for null or non-positive counts.
///
/// # Safety
///
/// Same contract as [`sort_at_address`].
pub unsafe fn buffer_at<'a>(address: u64, count: i64) -> &'a mut [i32] {
    let Ok(len) = usize::try_from(count) else {
        return &mut [];
    };
    if address == 0 || len == 0 {
        return &mut [];
    }
    let ptr = std::ptr::with_exposed_provenance_mut::<i32>(address as usize);
    // SAFETY: caller guarantees `len` valid, exclusively borrowed elements.
    unsafe { std::slice::from_raw_parts_mut(ptr, len) }
}
