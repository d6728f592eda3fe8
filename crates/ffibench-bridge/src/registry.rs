//! Callback binding registry.
//!
//! A [`Binding`] is the resolved identity of a managed comparator: the
//! runtime-wide handle, the method, and a strong reference to its receiver or
//! class. [`BindingRegistry`] creates one lazily, exactly once, and then
//! hands out the same binding for the life of the registry.
//!
//! Binding uses a manual state machine instead of `OnceLock::get_or_init`
//! alone: resolution calls into the managed runtime, which may run arbitrary
//! code on the binding thread, and a blocked `get_or_init` cannot report the
//! winner's failure back to waiting threads.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use ffibench_core::ElementToken;
use serde_json::json;

use crate::config::LogLevel;
use crate::diag;
use crate::error::{BridgeError, ResolutionStage};
use crate::runtime::{
    AttachedThread, ComparatorSource, ManagedRuntime, MethodDescriptor, RuntimeContext, Variant,
};

// Registry lifecycle states.
const UNBOUND: u8 = 0;
const BINDING: u8 = 1;
const BOUND: u8 = 2;

/// Resolved comparator, shared read-only by every sorting thread.
pub struct Binding<R: ManagedRuntime> {
    runtime: R,
    target: R::Target,
    method: MethodDescriptor,
    variant: Variant,
}

impl<R: ManagedRuntime> Binding<R> {
    /// Resolve `source` through `ctx` without caching anything.
    ///
    /// Each call promotes a new runtime-wide reference, so callers that want
    /// one binding per process go through [`BindingRegistry::bind`].
    pub fn resolve<X>(
        ctx: &mut X,
        source: ComparatorSource<'_, X::Comparator>,
    ) -> Result<Self, BridgeError>
    where
        X: RuntimeContext<Runtime = R>,
    {
        let method = *source.method();
        if !method.is_comparator_shaped() {
            return Err(BridgeError::resolution(
                ResolutionStage::MethodLookup,
                format!(
                    "{} has signature {}, expected a (long, long) -> int comparator",
                    method.name, method.signature
                ),
            ));
        }

        let runtime = ctx.runtime_handle()?;
        let target = match source {
            ComparatorSource::Instance { comparator, .. } => {
                ctx.resolve_instance(comparator, &method)?
            }
            ComparatorSource::Static { class, .. } => ctx.resolve_static(class, &method)?,
        };

        Ok(Self {
            runtime,
            target,
            method,
            variant: source.variant(),
        })
    }

    /// One comparison across the boundary.
    ///
    /// Attaches the calling thread (a no-op after the first time on that
    /// thread) and calls the comparator with both tokens as 64-bit integers.
    ///
    /// # Safety
    ///
    /// The comparator reads the elements through their tokens, so `left` and
    /// `right` must name live `i32`s that nothing writes to during the call.
    /// Tokens handed out by [`ffibench_core::sort::try_sort_by_token`] satisfy
    /// this for the duration of their comparison.
    ///
    /// A token that is only a number is rejected at compile time outside an
    /// `unsafe` block:
    ///
    /// ```compile_fail,E0133
    /// use ffibench_bridge::sim::SimRuntime;
    /// use ffibench_bridge::{Binding, ComparatorSource};
    /// use ffibench_core::ElementToken;
    ///
    /// let vm = SimRuntime::benchmark();
    /// let mut env = vm.attach_current_thread().unwrap();
    /// let binding = Binding::resolve(&mut env, ComparatorSource::benchmark_static()).unwrap();
    /// let _ = binding.invoke(ElementToken::from_raw(8), ElementToken::from_raw(8));
    /// ```
    #[inline]
    pub unsafe fn invoke(
        &self,
        left: ElementToken,
        right: ElementToken,
    ) -> Result<i32, BridgeError> {
        let mut thread = self.runtime.ensure_attached()?;
        // SAFETY: forwarded to the caller.
        unsafe { thread.call_compare(&self.target, left.as_jlong(), right.as_jlong()) }
    }

    #[must_use]
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    #[must_use]
    pub fn target(&self) -> &R::Target {
        &self.target
    }

    #[must_use]
    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }
}

/// Lazily bound, write-once holder of a [`Binding`].
///
/// `new` is `const`, so a registry can live in a `static` when process scope
/// is wanted.
pub struct BindingRegistry<R: ManagedRuntime> {
    state: AtomicU8,
    binding: OnceLock<Binding<R>>,
}

impl<R: ManagedRuntime> BindingRegistry<R> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNBOUND),
            binding: OnceLock::new(),
        }
    }

    /// The binding, if one has been established.
    #[must_use]
    pub fn get(&self) -> Option<&Binding<R>> {
        self.binding.get()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state.load(Ordering::Acquire) == BOUND
    }

    /// Return the binding, establishing it from `source` on first use.
    ///
    /// Once bound, `ctx` and `source` are ignored: later calls with a
    /// different comparator still get the first binding. Concurrent first
    /// callers wait for the one that won the claim. If that caller fails, the
    /// registry goes back to unbound, the failure is returned to it, and a
    /// waiting caller takes over with its own context.
    pub fn bind<X>(
        &self,
        ctx: &mut X,
        source: ComparatorSource<'_, X::Comparator>,
    ) -> Result<&Binding<R>, BridgeError>
    where
        X: RuntimeContext<Runtime = R>,
    {
        loop {
            if let Some(binding) = self.binding.get() {
                return Ok(binding);
            }

            match self
                .state
                .compare_exchange(UNBOUND, BINDING, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return self.establish(ctx, source),
                Err(_) => std::thread::yield_now(),
            }
        }
    }

    fn establish<X>(
        &self,
        ctx: &mut X,
        source: ComparatorSource<'_, X::Comparator>,
    ) -> Result<&Binding<R>, BridgeError>
    where
        X: RuntimeContext<Runtime = R>,
    {
        let claim = Claim(&self.state);
        let method = *source.method();
        let variant = source.variant();

        match Binding::resolve(ctx, source) {
            Ok(resolved) => {
                let binding = self.binding.get_or_init(|| resolved);
                claim.publish();
                diag::emit(
                    LogLevel::Info,
                    "binding_established",
                    json!({
                        "variant": variant.as_str(),
                        "method": method.name,
                        "signature": method.signature,
                    }),
                );
                Ok(binding)
            }
            Err(err) => {
                drop(claim);
                diag::emit(
                    LogLevel::Error,
                    "binding_failed",
                    json!({
                        "variant": variant.as_str(),
                        "method": method.name,
                        "kind": err.kind(),
                        "error": err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }
}

impl<R: ManagedRuntime> Default for BindingRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by the thread that owns the `BINDING` state. Returns the registry to
/// `UNBOUND` unless published, including when resolution panics.
struct Claim<'a>(&'a AtomicU8);

impl Claim<'_> {
    fn publish(self) {
        self.0.store(BOUND, Ordering::Release);
        std::mem::forget(self);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.0.store(UNBOUND, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::STATIC_COMPARATOR;
    use crate::sim::{ClassDef, LocalRef, SimRuntime};

    #[test]
    fn repeated_bind_returns_the_same_binding() {
        let vm = SimRuntime::benchmark();
        let registry = BindingRegistry::new();
        let mut env = vm.attach_current_thread().unwrap();

        let first = registry
            .bind(&mut env, ComparatorSource::benchmark_static())
            .unwrap() as *const Binding<SimRuntime>;
        let refs_after_first = vm.stats().global_refs_created;
        let second = registry
            .bind(&mut env, ComparatorSource::benchmark_static())
            .unwrap() as *const Binding<SimRuntime>;

        assert!(std::ptr::eq(first, second));
        assert_eq!(vm.stats().global_refs_created, refs_after_first);
        assert_eq!(vm.stats().global_refs_created, 1);
        assert!(registry.is_bound());
    }

    #[test]
    fn later_comparators_are_ignored_once_bound() {
        let vm = SimRuntime::benchmark();
        let registry = BindingRegistry::new();
        let mut env = vm.attach_current_thread().unwrap();
        let first = env.new_object("benchmark/AscendingComparator").unwrap();
        let second = env.new_object("benchmark/BrokenComparator").unwrap();

        registry
            .bind(&mut env, ComparatorSource::instance(&first))
            .unwrap();
        // The broken comparator would fail method lookup if it were resolved.
        let binding = registry
            .bind(&mut env, ComparatorSource::instance(&second))
            .unwrap();
        assert_eq!(binding.variant(), Variant::Instance);
        assert_eq!(vm.stats().method_lookups, 1);
    }

    #[test]
    fn failed_resolution_leaves_registry_unbound() {
        let vm = SimRuntime::new(vec![ClassDef::new("benchmark/QSortBenchmark")]);
        let registry = BindingRegistry::new();
        let mut env = vm.attach_current_thread().unwrap();

        let err = registry
            .bind(&mut env, ComparatorSource::benchmark_static())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BridgeError::BindingResolution {
                stage: ResolutionStage::MethodLookup,
                ..
            }
        ));
        assert!(!registry.is_bound());
        assert!(registry.get().is_none());
        assert_eq!(vm.stats().live_global_refs, 0);
    }

    #[test]
    fn registry_recovers_after_a_failed_attempt() {
        let vm = SimRuntime::benchmark();
        let registry = BindingRegistry::new();
        let mut env = vm.attach_current_thread().unwrap();

        let missing: ComparatorSource<'_, LocalRef> = ComparatorSource::Static {
            class: "benchmark/Missing",
            method: STATIC_COMPARATOR,
        };
        assert!(registry.bind(&mut env, missing).is_err());

        let binding = registry
            .bind(&mut env, ComparatorSource::benchmark_static())
            .unwrap();
        assert_eq!(binding.method().name, "qsortCompare");
    }

    #[test]
    fn non_comparator_signature_is_rejected_before_lookup() {
        let vm = SimRuntime::benchmark();
        let mut env = vm.attach_current_thread().unwrap();
        let source: ComparatorSource<'_, LocalRef> = ComparatorSource::Static {
            class: "benchmark/QSortBenchmark",
            method: MethodDescriptor::new("qsortCompare", "(II)I"),
        };
        let err = Binding::resolve(&mut env, source).err().unwrap();
        assert!(matches!(
            err,
            BridgeError::BindingResolution {
                stage: ResolutionStage::MethodLookup,
                ..
            }
        ));
        assert_eq!(vm.stats().method_lookups, 0);
    }

    #[test]
    fn invoke_passes_tokens_through_unchanged() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = std::sync::Arc::clone(&seen);
        let class = ClassDef::new("benchmark/QSortBenchmark").with_static_method(
            STATIC_COMPARATOR,
            move |a, b| {
                log.lock().push((a, b));
                -1
            },
        );
        let vm = SimRuntime::new(vec![class]);
        let mut env = vm.attach_current_thread().unwrap();
        let binding = Binding::resolve(&mut env, ComparatorSource::benchmark_static()).unwrap();

        // SAFETY: this comparator never reads through its tokens.
        let result = unsafe {
            binding.invoke(ElementToken::from_raw(0x1000), ElementToken::from_raw(0x2004))
        }
        .unwrap();
        assert_eq!(result, -1);
        assert_eq!(*seen.lock(), vec![(0x1000, 0x2004)]);
        assert_eq!(vm.stats().attach_checks, 1);
    }
}
