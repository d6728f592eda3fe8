//! In-process stand-in for a managed runtime.
//!
//! `SimRuntime` models the parts of a JVM the bridge touches: classes with
//! static and instance methods, call-scoped local references, global
//! references, per-thread attachment, and failures at each of those steps.
//! Every boundary operation is counted so tests and the harness can check how
//! often the bridge crossed.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ResolutionStage};
use crate::runtime::{
    AttachedThread, INSTANCE_COMPARATOR, ManagedRuntime, MethodDescriptor, RuntimeContext,
    STATIC_COMPARATOR,
};

/// Managed comparator body: two element tokens in, three-way result out.
pub type CompareFn = Arc<dyn Fn(i64, i64) -> i32 + Send + Sync>;

/// Failure to inject into the next boundary operations of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Obtaining the runtime-wide handle fails.
    RuntimeHandle,
    /// Attaching a thread fails, including threads that are already attached.
    Attach,
    /// The comparator throws.
    Invoke,
}

impl Fault {
    const fn bit(self) -> u8 {
        match self {
            Self::RuntimeHandle => 1,
            Self::Attach => 2,
            Self::Invoke => 4,
        }
    }
}

/// Snapshot of boundary-crossing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    pub handle_requests: u64,
    pub method_lookups: u64,
    pub global_refs_created: u64,
    pub live_global_refs: u64,
    /// `ensure_attached` calls.
    pub attach_checks: u64,
    /// Threads newly attached.
    pub attachments: u64,
    pub invocations: u64,
}

#[derive(Clone)]
struct MethodDef {
    descriptor: MethodDescriptor,
    is_static: bool,
    body: CompareFn,
}

/// A class known to the simulated runtime.
#[derive(Clone)]
pub struct ClassDef {
    name: String,
    methods: Vec<MethodDef>,
}

impl ClassDef {
    /// Class with no methods.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_static_method<F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(i64, i64) -> i32 + Send + Sync + 'static,
    {
        self.methods.push(MethodDef {
            descriptor,
            is_static: true,
            body: Arc::new(body),
        });
        self
    }

    #[must_use]
    pub fn with_instance_method<F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(i64, i64) -> i32 + Send + Sync + 'static,
    {
        self.methods.push(MethodDef {
            descriptor,
            is_static: false,
            body: Arc::new(body),
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `benchmark/QSortBenchmark` with `static int qsortCompare(long, long)`
    /// reading both elements through their tokens.
    #[must_use]
    pub fn benchmark_class() -> Self {
        Self::new(crate::runtime::BENCHMARK_CLASS)
            .with_static_method(STATIC_COMPARATOR, compare_elements)
    }

    /// Class `name` with an instance `int compare(long, long)` reading both
    /// elements through their tokens.
    #[must_use]
    pub fn ascending_comparator(name: impl Into<String>) -> Self {
        Self::new(name).with_instance_method(INSTANCE_COMPARATOR, compare_elements)
    }

    fn find(&self, descriptor: &MethodDescriptor, is_static: bool) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.descriptor == *descriptor && m.is_static == is_static)
    }
}

/// Read the `i32` an element token names.
///
/// # Safety
///
/// `address` must be a token handed out by the bridge for an element of a
/// buffer that is still being sorted.
#[must_use]
pub unsafe fn get_int(address: i64) -> i32 {
    let ptr = std::ptr::with_exposed_provenance::<i32>(address as usize);
    // SAFETY: caller guarantees `address` names a live, aligned i32.
    unsafe { ptr.read() }
}

fn compare_elements(left: i64, right: i64) -> i32 {
    // SAFETY: method bodies run only from `call_compare`, whose caller
    // guarantees both tokens name live `i32`s.
    let (a, b) = unsafe { (get_int(left), get_int(right)) };
    a.cmp(&b) as i32
}

static NEXT_VM_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // Ids of the runtimes the current thread is attached to.
    static ATTACHED: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct Counters {
    handle_requests: AtomicU64,
    method_lookups: AtomicU64,
    global_refs_created: AtomicU64,
    live_global_refs: AtomicU64,
    attach_checks: AtomicU64,
    attachments: AtomicU64,
    invocations: AtomicU64,
    frames: AtomicU64,
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

struct SimVm {
    id: u64,
    classes: RwLock<Vec<ClassDef>>,
    // Class name of every object created so far, indexed by object id.
    objects: RwLock<Vec<String>>,
    faults: AtomicU8,
    counters: Counters,
}

impl SimVm {
    fn faulted(&self, fault: Fault) -> bool {
        self.faults.load(Ordering::Acquire) & fault.bit() != 0
    }

    fn class(&self, name: &str) -> Option<ClassDef> {
        self.classes.read().iter().find(|c| c.name == name).cloned()
    }

    fn attach(&self) -> Result<(), BridgeError> {
        if self.faulted(Fault::Attach) {
            return Err(BridgeError::attachment(format!(
                "runtime {} refused to attach thread {:?}",
                self.id,
                std::thread::current().id()
            )));
        }
        let newly = ATTACHED.with(|attached| {
            let mut attached = attached.borrow_mut();
            if attached.contains(&self.id) {
                false
            } else {
                attached.push(self.id);
                true
            }
        });
        if newly {
            bump(&self.counters.attachments);
        }
        Ok(())
    }

    fn lookup(
        &self,
        class: &str,
        descriptor: &MethodDescriptor,
        is_static: bool,
    ) -> Result<CompareFn, BridgeError> {
        let def = self.class(class).ok_or_else(|| {
            BridgeError::resolution(
                ResolutionStage::ClassLookup,
                format!("class {class} not found"),
            )
        })?;
        bump(&self.counters.method_lookups);
        def.find(descriptor, is_static)
            .map(|m| Arc::clone(&m.body))
            .ok_or_else(|| {
                BridgeError::resolution(
                    ResolutionStage::MethodLookup,
                    format!(
                        "{} method {}{} not found on {class}",
                        if is_static { "static" } else { "instance" },
                        descriptor.name,
                        descriptor.signature,
                    ),
                )
            })
    }
}

/// Runtime-wide handle to a simulated runtime. Clones share the runtime.
#[derive(Clone)]
pub struct SimRuntime(Arc<SimVm>);

impl SimRuntime {
    #[must_use]
    pub fn new(classes: Vec<ClassDef>) -> Self {
        Self(Arc::new(SimVm {
            id: NEXT_VM_ID.fetch_add(1, Ordering::Relaxed),
            classes: RwLock::new(classes),
            objects: RwLock::new(Vec::new()),
            faults: AtomicU8::new(0),
            counters: Counters::default(),
        }))
    }

    /// Runtime preloaded with the benchmark classes:
    /// `benchmark/QSortBenchmark` (static comparator),
    /// `benchmark/AscendingComparator` (instance comparator) and
    /// `benchmark/BrokenComparator` (no comparator method).
    #[must_use]
    pub fn benchmark() -> Self {
        Self::new(vec![
            ClassDef::benchmark_class(),
            ClassDef::ascending_comparator("benchmark/AscendingComparator"),
            ClassDef::new("benchmark/BrokenComparator"),
        ])
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn define_class(&self, class: ClassDef) {
        let mut classes = self.0.classes.write();
        classes.retain(|c| c.name != class.name);
        classes.push(class);
    }

    pub fn inject(&self, fault: Fault) {
        self.0.faults.fetch_or(fault.bit(), Ordering::AcqRel);
    }

    pub fn clear_faults(&self) {
        self.0.faults.store(0, Ordering::Release);
    }

    /// Attach the current thread and open a call-scoped context, the way a
    /// native method receives its environment.
    pub fn attach_current_thread(&self) -> Result<SimEnv<'_>, BridgeError> {
        self.0.attach()?;
        Ok(SimEnv {
            runtime: self,
            frame: bump(&self.0.counters.frames),
        })
    }

    pub fn detach_current_thread(&self) {
        ATTACHED.with(|attached| attached.borrow_mut().retain(|id| *id != self.0.id));
    }

    #[must_use]
    pub fn is_current_thread_attached(&self) -> bool {
        ATTACHED.with(|attached| attached.borrow().contains(&self.0.id))
    }

    #[must_use]
    pub fn stats(&self) -> SimStats {
        let c = &self.0.counters;
        SimStats {
            handle_requests: c.handle_requests.load(Ordering::Relaxed),
            method_lookups: c.method_lookups.load(Ordering::Relaxed),
            global_refs_created: c.global_refs_created.load(Ordering::Relaxed),
            live_global_refs: c.live_global_refs.load(Ordering::Relaxed),
            attach_checks: c.attach_checks.load(Ordering::Relaxed),
            attachments: c.attachments.load(Ordering::Relaxed),
            invocations: c.invocations.load(Ordering::Relaxed),
        }
    }
}

/// Call-scoped reference to an object, valid only in the [`SimEnv`] frame
/// that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalRef {
    object: usize,
    frame: u64,
}

/// Call-scoped context of a simulated native call.
pub struct SimEnv<'a> {
    runtime: &'a SimRuntime,
    frame: u64,
}

impl SimEnv<'_> {
    /// Instantiate `class`, returning a local reference to the new object.
    pub fn new_object(&mut self, class: &str) -> Result<LocalRef, BridgeError> {
        if self.runtime.0.class(class).is_none() {
            return Err(BridgeError::resolution(
                ResolutionStage::ClassLookup,
                format!("class {class} not found"),
            ));
        }
        let mut objects = self.runtime.0.objects.write();
        objects.push(class.to_owned());
        Ok(LocalRef {
            object: objects.len() - 1,
            frame: self.frame,
        })
    }

    #[must_use]
    pub fn runtime(&self) -> &SimRuntime {
        self.runtime
    }

    fn promote(&self, referent: Referent) -> SimGlobal {
        let counters = &self.runtime.0.counters;
        bump(&counters.global_refs_created);
        bump(&counters.live_global_refs);
        SimGlobal {
            vm: Arc::clone(&self.runtime.0),
            referent,
        }
    }
}

impl RuntimeContext for SimEnv<'_> {
    type Runtime = SimRuntime;
    type Comparator = LocalRef;

    fn runtime_handle(&mut self) -> Result<SimRuntime, BridgeError> {
        let vm = &self.runtime.0;
        bump(&vm.counters.handle_requests);
        if vm.faulted(Fault::RuntimeHandle) {
            return Err(BridgeError::resolution(
                ResolutionStage::RuntimeHandle,
                format!("runtime {} handle unavailable", vm.id),
            ));
        }
        Ok(self.runtime.clone())
    }

    fn resolve_instance(
        &mut self,
        comparator: &LocalRef,
        method: &MethodDescriptor,
    ) -> Result<SimTarget, BridgeError> {
        if comparator.frame != self.frame {
            return Err(BridgeError::resolution(
                ResolutionStage::GlobalRef,
                format!(
                    "local reference from frame {} used in frame {}",
                    comparator.frame, self.frame
                ),
            ));
        }
        let class = self
            .runtime
            .0
            .objects
            .read()
            .get(comparator.object)
            .cloned()
            .ok_or_else(|| {
                BridgeError::resolution(ResolutionStage::ClassLookup, "dangling object reference")
            })?;
        let body = self.runtime.0.lookup(&class, method, false)?;
        Ok(SimTarget {
            body,
            holder: self.promote(Referent::Object),
        })
    }

    fn resolve_static(
        &mut self,
        class: &str,
        method: &MethodDescriptor,
    ) -> Result<SimTarget, BridgeError> {
        let body = self.runtime.0.lookup(class, method, true)?;
        Ok(SimTarget {
            body,
            holder: self.promote(Referent::Class),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Referent {
    Object,
    Class,
}

/// Runtime-wide strong reference. Released on drop.
pub struct SimGlobal {
    vm: Arc<SimVm>,
    referent: Referent,
}

impl SimGlobal {
    /// Whether this reference keeps a comparator object (rather than a class)
    /// alive.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.referent == Referent::Object
    }
}

impl Drop for SimGlobal {
    fn drop(&mut self) {
        self.vm
            .counters
            .live_global_refs
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Resolved comparator of a simulated runtime.
pub struct SimTarget {
    body: CompareFn,
    holder: SimGlobal,
}

impl SimTarget {
    #[must_use]
    pub fn holder(&self) -> &SimGlobal {
        &self.holder
    }
}

/// Attachment guard for one comparison.
pub struct SimThread<'a> {
    vm: &'a SimVm,
}

impl ManagedRuntime for SimRuntime {
    type Target = SimTarget;
    type Thread<'a> = SimThread<'a>;

    fn ensure_attached(&self) -> Result<SimThread<'_>, BridgeError> {
        bump(&self.0.counters.attach_checks);
        self.0.attach()?;
        Ok(SimThread { vm: &self.0 })
    }
}

impl AttachedThread<SimRuntime> for SimThread<'_> {
    unsafe fn call_compare(
        &mut self,
        target: &SimTarget,
        left: i64,
        right: i64,
    ) -> Result<i32, BridgeError> {
        bump(&self.vm.counters.invocations);
        if self.vm.faulted(Fault::Invoke) {
            return Err(BridgeError::invocation(
                "java.lang.IllegalStateException thrown by comparator",
            ));
        }
        Ok((target.body)(left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ComparatorSource;
    use crate::registry::Binding;
    use ffibench_core::ElementToken;

    #[test]
    fn attachment_is_counted_once_per_thread() {
        let vm = SimRuntime::benchmark();
        assert!(!vm.is_current_thread_attached());
        let _env = vm.attach_current_thread().unwrap();
        let _ = vm.ensure_attached().unwrap();
        let _ = vm.ensure_attached().unwrap();
        let stats = vm.stats();
        assert_eq!(stats.attachments, 1);
        assert_eq!(stats.attach_checks, 2);

        std::thread::scope(|s| {
            s.spawn(|| {
                let _ = vm.ensure_attached().unwrap();
            });
        });
        assert_eq!(vm.stats().attachments, 2);

        vm.detach_current_thread();
        assert!(!vm.is_current_thread_attached());
    }

    #[test]
    fn runtimes_track_attachment_independently() {
        let a = SimRuntime::benchmark();
        let b = SimRuntime::benchmark();
        assert_ne!(a.id(), b.id());
        let _env = a.attach_current_thread().unwrap();
        assert!(a.is_current_thread_attached());
        assert!(!b.is_current_thread_attached());
    }

    #[test]
    fn local_refs_do_not_outlive_their_frame() {
        let vm = SimRuntime::benchmark();
        let stale = {
            let mut env = vm.attach_current_thread().unwrap();
            env.new_object("benchmark/AscendingComparator").unwrap()
        };
        let mut env = vm.attach_current_thread().unwrap();
        let err = env.resolve_instance(&stale, &INSTANCE_COMPARATOR).err().unwrap();
        assert!(matches!(
            err,
            BridgeError::BindingResolution {
                stage: ResolutionStage::GlobalRef,
                ..
            }
        ));
    }

    #[test]
    fn unknown_class_cannot_be_instantiated() {
        let vm = SimRuntime::benchmark();
        let mut env = vm.attach_current_thread().unwrap();
        assert!(env.new_object("benchmark/Nope").is_err());
    }

    #[test]
    fn dropping_a_binding_releases_its_global_ref() {
        let vm = SimRuntime::benchmark();
        let mut env = vm.attach_current_thread().unwrap();
        let comparator = env.new_object("benchmark/AscendingComparator").unwrap();
        let binding = Binding::resolve(&mut env, ComparatorSource::instance(&comparator)).unwrap();
        assert!(binding.target().holder().is_object());
        assert_eq!(vm.stats().live_global_refs, 1);
        drop(binding);
        assert_eq!(vm.stats().live_global_refs, 0);
        assert_eq!(vm.stats().global_refs_created, 1);
    }

    #[test]
    fn faults_surface_as_typed_errors() {
        let vm = SimRuntime::benchmark();
        let mut env = vm.attach_current_thread().unwrap();
        let binding = Binding::resolve(&mut env, ComparatorSource::benchmark_static()).unwrap();
        let values = [3_i32, 1];
        let (a, b) = (ElementToken::of(&values[0]), ElementToken::of(&values[1]));
        // SAFETY: `values` outlives every comparison below.
        let compare = || unsafe { binding.invoke(a, b) };
        assert_eq!(compare().unwrap(), 1);

        vm.inject(Fault::Invoke);
        assert!(matches!(compare(), Err(BridgeError::Invocation { .. })));

        vm.clear_faults();
        vm.inject(Fault::Attach);
        assert!(matches!(compare(), Err(BridgeError::Attachment { .. })));

        vm.clear_faults();
        vm.inject(Fault::RuntimeHandle);
        assert!(matches!(
            env.runtime_handle(),
            Err(BridgeError::BindingResolution {
                stage: ResolutionStage::RuntimeHandle,
                ..
            })
        ));
    }

    #[test]
    fn redefining_a_class_replaces_it() {
        let vm = SimRuntime::new(vec![ClassDef::new("benchmark/QSortBenchmark")]);
        vm.define_class(ClassDef::benchmark_class());
        let mut env = vm.attach_current_thread().unwrap();
        assert!(Binding::resolve(&mut env, ComparatorSource::benchmark_static()).is_ok());
    }
}
