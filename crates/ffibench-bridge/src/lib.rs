//! # ffibench-bridge
//!
//! The callback bridge between native sort code and a managed runtime.
//!
//! ```text
//! driver -> engine::sort_at_address -> BindingRegistry::bind (once)
//!                                   -> core sort -> Binding::invoke (per comparison)
//!                                                   -> ensure_attached -> managed comparator
//! ```
//!
//! The managed runtime is reached only through the traits in [`runtime`]. Two
//! implementations exist: [`sim::SimRuntime`], an in-process stand-in used by
//! tests, the harness and benches, and the JVM runtime in `ffibench-abi`.
//!
//! Library code returns [`BridgeError`]; only boundary entry points turn an
//! error into process termination through [`fatal::terminate`].

pub mod config;
pub mod diag;
pub mod engine;
pub mod error;
pub mod fatal;
pub mod registry;
pub mod runtime;
pub mod sim;

pub use error::{BridgeError, ResolutionStage};
pub use registry::{Binding, BindingRegistry};
pub use runtime::{
    AttachedThread, ComparatorSource, ManagedRuntime, MethodDescriptor, RuntimeContext, Variant,
};
