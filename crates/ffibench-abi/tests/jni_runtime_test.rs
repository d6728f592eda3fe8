//! JVM-backed runtime: binding and lookup failures against an in-process
//! JVM.
//!
//! Run with `--features jvm-tests -- --ignored` on a machine with a JDK.
#![cfg(feature = "jvm-tests")]

use std::sync::OnceLock;

use ffibench_abi::jni_abi::{JniContext, JniRuntime};
use ffibench_bridge::engine;
use ffibench_bridge::{
    Binding, BindingRegistry, BridgeError, ComparatorSource, MethodDescriptor, ResolutionStage,
};
use ffibench_core::ElementToken;
use jni::objects::JObject;
use jni::{InitArgsBuilder, JNIEnv, JNIVersion, JavaVM};

/// `static int java.lang.Long.compare(long, long)`: compares the tokens
/// themselves, never reading through them.
const LONG_COMPARE: MethodDescriptor = MethodDescriptor::new("compare", "(JJ)I");

fn jvm() -> &'static JavaVM {
    static VM: OnceLock<JavaVM> = OnceLock::new();
    VM.get_or_init(|| {
        let args = InitArgsBuilder::new()
            .version(JNIVersion::V8)
            .build()
            .expect("JVM init args");
        JavaVM::new(args).expect("start JVM")
    })
}

fn env() -> JNIEnv<'static> {
    jvm()
        .attach_current_thread_permanently()
        .expect("attach test thread")
}

fn long_compare<'a>() -> ComparatorSource<'a, JObject<'static>> {
    ComparatorSource::Static {
        class: "java/lang/Long",
        method: LONG_COMPARE,
    }
}

fn assert_lookup_failure(err: BridgeError, expected: ResolutionStage) {
    match err {
        BridgeError::BindingResolution { stage, .. } => assert_eq!(stage, expected),
        other => panic!("expected a {expected:?} failure, got {other}"),
    }
}

#[test]
#[ignore = "needs a JDK"]
fn static_comparator_is_invoked_in_the_jvm() {
    let mut env = env();
    let mut ctx = JniContext::new(&mut env);
    let binding = Binding::resolve(&mut ctx, long_compare()).unwrap();

    let t = ElementToken::from_raw;
    // SAFETY: Long.compare only looks at the token values.
    let results = unsafe {
        [
            binding.invoke(t(1), t(2)).unwrap(),
            binding.invoke(t(5), t(5)).unwrap(),
            binding.invoke(t(9), t(3)).unwrap(),
        ]
    };
    assert_eq!(results, [-1, 0, 1]);
}

#[test]
#[ignore = "needs a JDK"]
fn registry_binds_once_and_sorts_through_the_jvm() {
    let mut env = env();
    let mut ctx = JniContext::new(&mut env);
    let registry = BindingRegistry::<JniRuntime>::new();

    let first = registry.bind(&mut ctx, long_compare()).unwrap() as *const Binding<JniRuntime>;
    let second = registry.bind(&mut ctx, long_compare()).unwrap() as *const Binding<JniRuntime>;
    assert!(std::ptr::eq(first, second));

    // Ordering by token is ordering by position, so the buffer is only
    // required to stay a permutation.
    let mut data = [3, 1, 2, 5, 4];
    engine::try_sort(&registry, &mut ctx, long_compare(), &mut data).unwrap();
    let mut sorted = data;
    sorted.sort_unstable();
    assert_eq!(sorted, [1, 2, 3, 4, 5]);
}

#[test]
#[ignore = "needs a JDK"]
fn missing_method_fails_lookup_and_clears_the_exception() {
    let mut env = env();
    let absent = ComparatorSource::Static {
        class: "java/lang/Long",
        method: MethodDescriptor::new("compareTokens", "(JJ)I"),
    };
    let err = Binding::resolve(&mut JniContext::new(&mut env), absent)
        .err()
        .unwrap();
    assert_lookup_failure(err, ResolutionStage::MethodLookup);
    assert!(!env.exception_check().unwrap());

    // java.lang.Object has no instance compare(JJ)I.
    let object = env.new_object("java/lang/Object", "()V", &[]).unwrap();
    let err = Binding::resolve(
        &mut JniContext::new(&mut env),
        ComparatorSource::instance(&object),
    )
    .err()
    .unwrap();
    assert_lookup_failure(err, ResolutionStage::MethodLookup);
    assert!(!env.exception_check().unwrap());
}

#[test]
#[ignore = "needs a JDK"]
fn unknown_class_fails_class_lookup() {
    let mut env = env();
    let missing: ComparatorSource<'_, JObject<'static>> = ComparatorSource::Static {
        class: "benchmark/NoSuchComparator",
        method: LONG_COMPARE,
    };
    let err = Binding::resolve(&mut JniContext::new(&mut env), missing)
        .err()
        .unwrap();
    assert_lookup_failure(err, ResolutionStage::ClassLookup);
    assert!(!env.exception_check().unwrap());
}
