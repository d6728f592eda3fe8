//! Property verification of the bridge against the simulated runtime.
//!
//! Each check builds its own runtime and registry, so checks are
//! independent and can run in any order.

#![allow(unsafe_code)]

use std::sync::{Arc, Barrier};

use ffibench_bridge::engine::{try_sort, try_sort_bound};
use ffibench_bridge::runtime::STATIC_COMPARATOR;
use ffibench_bridge::sim::{ClassDef, Fault, SimRuntime, get_int};
use ffibench_bridge::{BindingRegistry, BridgeError, ComparatorSource, ResolutionStage};
use ffibench_core::sort::comparison_count;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::inputs::{self, InputKind, XorShift64};
use crate::shapes::COMPARATOR_CLASS;

/// Outcome of one property check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResult {
    pub property: String,
    pub passed: bool,
    /// What was checked, or why it failed.
    pub detail: String,
}

impl PropertyResult {
    fn from_check(property: &str, check: Result<String, String>) -> Self {
        let (passed, detail) = match check {
            Ok(detail) => (true, detail),
            Err(detail) => (false, detail),
        };
        Self {
            property: property.to_string(),
            passed,
            detail,
        }
    }
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<PropertyResult>,
}

impl VerificationSummary {
    #[must_use]
    pub fn from_results(results: Vec<PropertyResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// `Err` naming the first failed property, if any.
    pub fn ensure_passed(&self) -> Result<(), HarnessError> {
        match self.results.iter().find(|r| !r.passed) {
            Some(failed) => Err(HarnessError::PropertyViolation {
                property: failed.property.clone(),
                detail: failed.detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

type Check = fn(u64) -> Result<String, String>;

/// Every property, in report order.
pub const PROPERTIES: [(&str, Check); 8] = [
    ("sort_correctness", sort_correctness),
    ("comparison_count_parity", comparison_count_parity),
    ("idempotent_binding", idempotent_binding),
    ("ordering_consistency", ordering_consistency),
    ("concurrent_disjoint_sorts", concurrent_disjoint_sorts),
    ("exactly_once_binding", exactly_once_binding),
    ("resolution_failure", resolution_failure),
    ("attachment_failure", attachment_failure),
];

/// Run every property check with inputs derived from `seed`.
#[must_use]
pub fn verify_all(seed: u64) -> VerificationSummary {
    let results = PROPERTIES
        .iter()
        .map(|(name, check)| PropertyResult::from_check(name, check(seed)))
        .collect();
    VerificationSummary::from_results(results)
}

/// Run the named property only.
pub fn verify_one(name: &str, seed: u64) -> Result<PropertyResult, HarnessError> {
    PROPERTIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(n, check)| PropertyResult::from_check(n, check(seed)))
        .ok_or_else(|| HarnessError::invalid(format!("unknown property `{name}`")))
}

fn bridge(err: BridgeError) -> String {
    format!("unexpected bridge error: {err}")
}

fn is_non_decreasing(data: &[i32]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}

fn sort_correctness(seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let statics = BindingRegistry::new();
    let instances = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let comparator = env.new_object(COMPARATOR_CLASS).map_err(bridge)?;

    let mut example = [5, 3, 3, -1, 0];
    try_sort(&statics, &mut env, ComparatorSource::benchmark_static(), &mut example)
        .map_err(bridge)?;
    if example != [-1, 0, 3, 3, 5] {
        return Err(format!("example sorted to {example:?}"));
    }

    let mut rng = XorShift64::new(seed);
    let mut checked = 1;
    for len in [0_usize, 1, 2, 3, 17, 64, 128] {
        for kind in InputKind::ALL {
            let input = inputs::generate(kind, len, rng.next_u64());
            let mut a = input.clone();
            let mut b = input.clone();
            try_sort(&statics, &mut env, ComparatorSource::benchmark_static(), &mut a)
                .map_err(bridge)?;
            try_sort(
                &instances,
                &mut env,
                ComparatorSource::instance(&comparator),
                &mut b,
            )
            .map_err(bridge)?;
            if !is_non_decreasing(&a) || a != b {
                return Err(format!("{kind} input of {len} elements not sorted"));
            }
            checked += 2;
        }
    }
    Ok(format!("{checked} buffers sorted"))
}

fn comparison_count_parity(seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let mut rng = XorShift64::new(seed);

    let mut total = 0;
    for len in [0_usize, 1, 2, 8, 32, 128] {
        let input = inputs::generate(InputKind::Random, len, rng.next_u64());
        let mut data = input.clone();
        let before = vm.stats().invocations;
        try_sort(&registry, &mut env, ComparatorSource::benchmark_static(), &mut data)
            .map_err(bridge)?;
        let calls = vm.stats().invocations - before;
        let expected = comparison_count(&input);
        if calls != expected {
            return Err(format!(
                "{len} elements: {calls} bridge calls, algorithm makes {expected}"
            ));
        }
        total += calls;
    }
    Ok(format!("{total} bridge calls matched"))
}

fn idempotent_binding(_seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let comparator = env.new_object(COMPARATOR_CLASS).map_err(bridge)?;

    let first = std::ptr::from_ref(
        registry
            .bind(&mut env, ComparatorSource::instance(&comparator))
            .map_err(bridge)?,
    );
    let refs = vm.stats().global_refs_created;
    for _ in 0..16 {
        let again = registry
            .bind(&mut env, ComparatorSource::instance(&comparator))
            .map_err(bridge)?;
        if !std::ptr::eq(first, again) {
            return Err("bind returned a different binding".to_string());
        }
    }
    let after = vm.stats().global_refs_created;
    if after != refs || after != 1 {
        return Err(format!("{after} global references created, expected 1"));
    }
    Ok("17 binds, 1 global reference".to_string())
}

fn ordering_consistency(seed: u64) -> Result<String, String> {
    let pairs = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&pairs);
    let class = ClassDef::new("benchmark/QSortBenchmark").with_static_method(
        STATIC_COMPARATOR,
        move |left, right| {
            // SAFETY: tokens address elements of the buffer being sorted.
            let (a, b) = unsafe { (get_int(left), get_int(right)) };
            log.lock().push((a, b));
            a.cmp(&b) as i32
        },
    );
    let vm = SimRuntime::new(vec![class]);
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let mut data = inputs::generate(InputKind::Random, 100, seed);

    try_sort(&registry, &mut env, ComparatorSource::benchmark_static(), &mut data)
        .map_err(bridge)?;

    let position = |v: i32| data.iter().position(|&x| x == v);
    let pairs = pairs.lock();
    let mut sampled = 0;
    for &(a, b) in pairs.iter().step_by(3) {
        if a == b {
            continue;
        }
        match (position(a), position(b)) {
            (Some(pa), Some(pb)) if (a < b) == (pa < pb) => sampled += 1,
            _ => return Err(format!("{a} and {b} out of comparator order")),
        }
    }
    Ok(format!("{sampled} of {} compared pairs sampled", pairs.len()))
}

fn concurrent_disjoint_sorts(seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let binding = registry
        .bind(&mut env, ComparatorSource::benchmark_static())
        .map_err(bridge)?;

    let mut left = inputs::generate(InputKind::Random, 100, seed);
    let mut right = inputs::generate(InputKind::Random, 100, seed ^ 0x9E37_79B9);
    let (a, b) = std::thread::scope(|s| {
        let a = s.spawn(|| try_sort_bound(binding, &mut left));
        let b = s.spawn(|| try_sort_bound(binding, &mut right));
        (a.join(), b.join())
    });
    for outcome in [a, b] {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(bridge(err)),
            Err(_) => return Err("sorting thread panicked".to_string()),
        }
    }
    if !left.iter().copied().eq(0..100) || !right.iter().copied().eq(0..100) {
        return Err("a concurrent sort left its buffer unsorted".to_string());
    }
    Ok("2 threads x 100 elements sorted".to_string())
}

fn exactly_once_binding(_seed: u64) -> Result<String, String> {
    const THREADS: usize = 8;
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let barrier = Barrier::new(THREADS);
    let (vm, registry, barrier) = (&vm, &registry, &barrier);

    let bound: Vec<Result<usize, BridgeError>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(move || -> Result<usize, BridgeError> {
                    let mut env = vm.attach_current_thread()?;
                    barrier.wait();
                    let binding =
                        registry.bind(&mut env, ComparatorSource::benchmark_static())?;
                    Ok(std::ptr::from_ref(binding) as usize)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(BridgeError::attachment("binding thread panicked")))
            })
            .collect()
    });

    let bound = bound.into_iter().collect::<Result<Vec<_>, _>>().map_err(bridge)?;
    if !bound.windows(2).all(|w| w[0] == w[1]) {
        return Err("threads observed different bindings".to_string());
    }
    let stats = vm.stats();
    if stats.global_refs_created != 1 || stats.method_lookups != 1 {
        return Err(format!(
            "{} lookups and {} global references for one binding",
            stats.method_lookups, stats.global_refs_created
        ));
    }
    Ok(format!("{THREADS} racing threads, 1 binding"))
}

fn resolution_failure(_seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let broken = env.new_object("benchmark/BrokenComparator").map_err(bridge)?;
    let mut data = [3, 1, 2];

    match try_sort(&registry, &mut env, ComparatorSource::instance(&broken), &mut data) {
        Err(BridgeError::BindingResolution {
            stage: ResolutionStage::MethodLookup,
            ..
        }) if data == [3, 1, 2] && !registry.is_bound() => {
            Ok("missing comparator method rejected before sorting".to_string())
        }
        Err(err) => Err(format!("wrong error: {err}")),
        Ok(()) => Err("sort succeeded without a comparator method".to_string()),
    }
}

fn attachment_failure(_seed: u64) -> Result<String, String> {
    let vm = SimRuntime::benchmark();
    let registry = BindingRegistry::new();
    let mut env = vm.attach_current_thread().map_err(bridge)?;
    let binding = registry
        .bind(&mut env, ComparatorSource::benchmark_static())
        .map_err(bridge)?;

    vm.inject(Fault::Attach);
    let outcome = try_sort_bound(binding, &mut [4, 3, 2, 1]);
    vm.clear_faults();
    match outcome {
        Err(BridgeError::Attachment { .. }) => Ok("attachment error surfaced".to_string()),
        Err(err) => Err(format!("wrong error: {err}")),
        Ok(()) => Err("sort succeeded with attachment refused".to_string()),
    }
}
