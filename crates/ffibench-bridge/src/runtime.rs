//! Contract between the bridge and a managed runtime.
//!
//! A runtime is split in three roles:
//! - [`RuntimeContext`]: call-scoped access handed to a native entry point
//!   (for a JVM, the `JNIEnv` of the calling thread). Used only while binding.
//! - [`ManagedRuntime`]: the runtime-wide handle kept in the binding. Any
//!   thread can use it to attach itself.
//! - [`AttachedThread`]: proof that the current thread is attached. Scoped to
//!   one comparison.

use crate::error::BridgeError;

/// JVM descriptor of the comparator contract: `(long, long) -> int`.
pub const COMPARATOR_SIGNATURE: &str = "(JJ)I";

/// Class holding the static comparator.
pub const BENCHMARK_CLASS: &str = "benchmark/QSortBenchmark";

pub const STATIC_COMPARATOR: MethodDescriptor =
    MethodDescriptor::new("qsortCompare", COMPARATOR_SIGNATURE);

pub const INSTANCE_COMPARATOR: MethodDescriptor =
    MethodDescriptor::new("compare", COMPARATOR_SIGNATURE);

/// Name and JVM-style signature of a managed method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub signature: &'static str,
}

impl MethodDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, signature: &'static str) -> Self {
        Self { name, signature }
    }

    /// Whether the signature is the two-long, int-returning comparator shape.
    #[must_use]
    pub fn is_comparator_shaped(&self) -> bool {
        self.signature == COMPARATOR_SIGNATURE
    }
}

/// How the comparator is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// A static method on a well-known class.
    Static,
    /// A method on a comparator object supplied by the caller.
    Instance,
}

impl Variant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Instance => "instance",
        }
    }
}

/// Where binding should find the comparator.
pub enum ComparatorSource<'a, C: ?Sized> {
    Instance {
        comparator: &'a C,
        method: MethodDescriptor,
    },
    Static {
        class: &'a str,
        method: MethodDescriptor,
    },
}

impl<'a, C: ?Sized> ComparatorSource<'a, C> {
    /// `compare(JJ)I` on `comparator`.
    #[must_use]
    pub const fn instance(comparator: &'a C) -> Self {
        Self::Instance {
            comparator,
            method: INSTANCE_COMPARATOR,
        }
    }

    /// `QSortBenchmark.qsortCompare(JJ)I`.
    #[must_use]
    pub const fn benchmark_static() -> Self {
        Self::Static {
            class: BENCHMARK_CLASS,
            method: STATIC_COMPARATOR,
        }
    }

    #[must_use]
    pub const fn method(&self) -> &MethodDescriptor {
        match self {
            Self::Instance { method, .. } | Self::Static { method, .. } => method,
        }
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        match self {
            Self::Instance { .. } => Variant::Instance,
            Self::Static { .. } => Variant::Static,
        }
    }
}

impl<C: ?Sized> Clone for ComparatorSource<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for ComparatorSource<'_, C> {}

/// Runtime-wide handle. Kept for the life of the process once bound.
pub trait ManagedRuntime: Send + Sync + Sized {
    /// Resolved comparator: method identity plus the strong reference that
    /// keeps its receiver (or declaring class) alive.
    type Target: Send + Sync;

    type Thread<'a>: AttachedThread<Self>
    where
        Self: 'a;

    /// Attach the current thread if it is not attached yet. Called once per
    /// comparison.
    fn ensure_attached(&self) -> Result<Self::Thread<'_>, BridgeError>;
}

/// Capability to call into the runtime from the current thread.
pub trait AttachedThread<R: ManagedRuntime> {
    /// Call the comparator on two element tokens, returning its three-way
    /// result unchanged.
    ///
    /// # Safety
    ///
    /// The comparator may read an `i32` through each token. Both must name
    /// live, aligned `i32`s that nothing writes to for the duration of the
    /// call.
    unsafe fn call_compare(
        &mut self,
        target: &R::Target,
        left: i64,
        right: i64,
    ) -> Result<i32, BridgeError>;
}

/// Call-scoped runtime access, valid only during the entry-point call that
/// received it.
pub trait RuntimeContext {
    type Runtime: ManagedRuntime;
    /// Call-scoped reference to a comparator object.
    type Comparator: ?Sized;

    fn runtime_handle(&mut self) -> Result<Self::Runtime, BridgeError>;

    /// Look `method` up on the comparator's class and promote the comparator
    /// to a runtime-wide reference.
    fn resolve_instance(
        &mut self,
        comparator: &Self::Comparator,
        method: &MethodDescriptor,
    ) -> Result<<Self::Runtime as ManagedRuntime>::Target, BridgeError>;

    /// Look `method` up as a static method of `class` and promote the class
    /// to a runtime-wide reference.
    fn resolve_static(
        &mut self,
        class: &str,
        method: &MethodDescriptor,
    ) -> Result<<Self::Runtime as ManagedRuntime>::Target, BridgeError>;
}
