//! JNI natives of the Java benchmark classes, and the JVM-backed managed
//! runtime the bridge uses for them.
//!
//! The two sort natives each own a process-wide [`BindingRegistry`]: the
//! static comparator `QSortBenchmark.qsortCompare(JJ)I` and the first
//! comparator object passed to `qsortWith`. A bridge failure inside either
//! terminates the process; there is no channel to report it to the caller.

use std::ptr;

use ffibench_bridge::engine;
use ffibench_bridge::fatal;
use ffibench_bridge::{
    AttachedThread, BindingRegistry, BridgeError, ComparatorSource, ManagedRuntime,
    MethodDescriptor, ResolutionStage, RuntimeContext,
};
use ffibench_core::string::table;
use jni::JNIEnv;
use jni::JavaVM;
use jni::errors::Error as JniError;
use jni::objects::{GlobalRef, JClass, JMethodID, JObject, JStaticMethodID};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jint, jlong, jstring, jvalue};

use crate::sysinfo_abi;
use crate::util::clamp_length;

/// Runtime-wide handle to the JVM hosting the benchmark.
pub struct JniRuntime {
    vm: JavaVM,
}

impl JniRuntime {
    #[must_use]
    pub fn vm(&self) -> &JavaVM {
        &self.vm
    }
}

/// Resolved comparator: method id plus a global reference keeping the
/// receiver (instance variant) or declaring class (static variant) alive.
pub enum JniTarget {
    Instance {
        receiver: GlobalRef,
        method: JMethodID,
    },
    Static {
        class: GlobalRef,
        method: JStaticMethodID,
    },
}

/// A thread attached to the JVM for one comparison.
pub struct JniThread<'a> {
    env: JNIEnv<'a>,
}

impl ManagedRuntime for JniRuntime {
    type Target = JniTarget;
    type Thread<'a> = JniThread<'a>;

    fn ensure_attached(&self) -> Result<JniThread<'_>, BridgeError> {
        // Already-attached threads get their existing env back; new threads
        // stay attached until they exit.
        self.vm
            .attach_current_thread_permanently()
            .map(|env| JniThread { env })
            .map_err(|err| BridgeError::attachment(err.to_string()))
    }
}

impl AttachedThread<JniRuntime> for JniThread<'_> {
    unsafe fn call_compare(
        &mut self,
        target: &JniTarget,
        left: i64,
        right: i64,
    ) -> Result<i32, BridgeError> {
        let args = [jvalue { j: left }, jvalue { j: right }];
        let ret = ReturnType::Primitive(Primitive::Int);
        // SAFETY: both method ids were resolved with signature (JJ)I against
        // the object or class the target holds.
        let result = match target {
            JniTarget::Instance { receiver, method } => unsafe {
                self.env
                    .call_method_unchecked(receiver, *method, ret, &args)
            },
            JniTarget::Static { class, method } => {
                let class: &JClass = class.as_obj().into();
                unsafe {
                    self.env
                        .call_static_method_unchecked(class, *method, ret, &args)
                }
            }
        };
        result
            .and_then(|value| value.i())
            .map_err(|err| BridgeError::invocation(describe(&mut self.env, &err)))
    }
}

/// Render `err`, printing and clearing any pending Java exception so the
/// env stays usable.
fn describe(env: &mut JNIEnv<'_>, err: &JniError) -> String {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
    err.to_string()
}

/// Call-scoped JNI access used while binding.
pub struct JniContext<'env, 'local> {
    env: &'env mut JNIEnv<'local>,
}

impl<'env, 'local> JniContext<'env, 'local> {
    pub fn new(env: &'env mut JNIEnv<'local>) -> Self {
        Self { env }
    }

    fn fail(&mut self, stage: ResolutionStage, err: &JniError) -> BridgeError {
        BridgeError::resolution(stage, describe(self.env, err))
    }
}

impl<'local> RuntimeContext for JniContext<'_, 'local> {
    type Runtime = JniRuntime;
    type Comparator = JObject<'local>;

    fn runtime_handle(&mut self) -> Result<JniRuntime, BridgeError> {
        match self.env.get_java_vm() {
            Ok(vm) => Ok(JniRuntime { vm }),
            Err(err) => Err(self.fail(ResolutionStage::RuntimeHandle, &err)),
        }
    }

    fn resolve_instance(
        &mut self,
        comparator: &JObject<'local>,
        method: &MethodDescriptor,
    ) -> Result<JniTarget, BridgeError> {
        let class = match self.env.get_object_class(comparator) {
            Ok(class) => class,
            Err(err) => return Err(self.fail(ResolutionStage::ClassLookup, &err)),
        };
        let lookup = self
            .env
            .get_method_id(&class, method.name, method.signature);
        let _ = self.env.delete_local_ref(class);
        let method = match lookup {
            Ok(id) => id,
            Err(err) => return Err(self.fail(ResolutionStage::MethodLookup, &err)),
        };
        match self.env.new_global_ref(comparator) {
            Ok(receiver) => Ok(JniTarget::Instance { receiver, method }),
            Err(err) => Err(self.fail(ResolutionStage::GlobalRef, &err)),
        }
    }

    fn resolve_static(
        &mut self,
        class: &str,
        method: &MethodDescriptor,
    ) -> Result<JniTarget, BridgeError> {
        let class = match self.env.find_class(class) {
            Ok(class) => class,
            Err(err) => return Err(self.fail(ResolutionStage::ClassLookup, &err)),
        };
        let method = match self
            .env
            .get_static_method_id(&class, method.name, method.signature)
        {
            Ok(id) => id,
            Err(err) => return Err(self.fail(ResolutionStage::MethodLookup, &err)),
        };
        let global = self.env.new_global_ref(&class);
        let _ = self.env.delete_local_ref(class);
        match global {
            Ok(class) => Ok(JniTarget::Static { class, method }),
            Err(err) => Err(self.fail(ResolutionStage::GlobalRef, &err)),
        }
    }
}

static STATIC_COMPARATOR_BINDING: BindingRegistry<JniRuntime> = BindingRegistry::new();
static INSTANCE_COMPARATOR_BINDING: BindingRegistry<JniRuntime> = BindingRegistry::new();

// ---------------------------------------------------------------------------
// noop
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_glavo_FFIBenchmark_noop(_env: JNIEnv<'_>, _class: JClass<'_>) {}

#[unsafe(no_mangle)]
pub extern "system" fn Java_org_glavo_FFIBenchmark_noop_1critical(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
) {
}

#[unsafe(no_mangle)]
pub extern "system" fn JavaCritical_org_glavo_FFIBenchmark_noop_1critical() {}

#[unsafe(no_mangle)]
pub extern "system" fn Java_benchmark_NoopBenchmark_noop(_env: JNIEnv<'_>, _class: JClass<'_>) {}

#[unsafe(no_mangle)]
pub extern "system" fn Java_benchmark_NoopBenchmark_noop_1critical(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
) {
}

#[unsafe(no_mangle)]
pub extern "system" fn JavaCritical_benchmark_NoopBenchmark_noop_1critical() {}

// ---------------------------------------------------------------------------
// string / sysinfo
// ---------------------------------------------------------------------------

/// `StringConvertBenchmark.getString(int)`: a new Java string of `length`
/// pattern characters. Returns null (with the exception left pending) when
/// the JVM cannot allocate it.
#[unsafe(no_mangle)]
pub extern "system" fn Java_benchmark_StringConvertBenchmark_getString<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    length: jint,
) -> jstring {
    let bytes = table::global().get(clamp_length(length));
    // Pattern strings are ASCII; drop the terminator.
    let Ok(text) = std::str::from_utf8(&bytes[..bytes.len() - 1]) else {
        return ptr::null_mut();
    };
    env.new_string(text)
        .map_or(ptr::null_mut(), |s| s.into_raw())
}

/// `SysinfoBenchmark.getMemUnit()`.
#[unsafe(no_mangle)]
pub extern "system" fn Java_benchmark_SysinfoBenchmark_getMemUnit(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
) -> jint {
    jint::try_from(sysinfo_abi::mem_unit()).unwrap_or(jint::MAX)
}

// ---------------------------------------------------------------------------
// qsort
// ---------------------------------------------------------------------------

/// `QSortBenchmark.qsort(long address, long elements)`: sort `elements` ints
/// at `address` with `QSortBenchmark.qsortCompare(long, long)`.
///
/// # Safety
///
/// `address` must point to `elements` ints of off-heap memory owned by the
/// caller for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn Java_benchmark_QSortBenchmark_qsort<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    address: jlong,
    elements: jlong,
) {
    let mut ctx = JniContext::new(&mut env);
    // SAFETY: forwarded to the Java caller.
    unsafe {
        engine::sort_at_address(
            &STATIC_COMPARATOR_BINDING,
            &mut ctx,
            ComparatorSource::benchmark_static(),
            address as u64,
            elements,
        );
    }
}

/// `QSortBenchmark.qsortWith(long address, long elements, Comparator c)`:
/// like `qsort`, comparing through `c.compare(long, long)`. The first
/// comparator passed is bound for the life of the process.
///
/// # Safety
///
/// Same contract as [`Java_benchmark_QSortBenchmark_qsort`].
#[unsafe(no_mangle)]
pub unsafe extern "system" fn Java_benchmark_QSortBenchmark_qsortWith<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    address: jlong,
    elements: jlong,
    comparator: JObject<'local>,
) {
    if comparator.is_null() {
        fatal::terminate(&BridgeError::resolution(
            ResolutionStage::ClassLookup,
            "qsortWith called with a null comparator",
        ));
    }
    let mut ctx = JniContext::new(&mut env);
    // SAFETY: forwarded to the Java caller.
    unsafe {
        engine::sort_at_address(
            &INSTANCE_COMPARATOR_BINDING,
            &mut ctx,
            ComparatorSource::instance(&comparator),
            address as u64,
            elements,
        );
    }
}
