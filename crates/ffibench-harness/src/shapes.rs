//! The benchmark call shapes, prepared for repeated invocation.
//!
//! Every shape calls the same entry point a foreign caller would: the
//! `ffi_benchmark_*` exports for the native shapes and the bridge engine, on
//! a simulated managed runtime, for the bridged sorts.

#![allow(unsafe_code)]

use std::ffi::{CString, c_int, c_long};
use std::fmt;
use std::hint::black_box;
use std::str::FromStr;

use ffibench_abi::call_shapes_abi::{
    ffi_benchmark_accept_string, ffi_benchmark_get_string, ffi_benchmark_noop,
    ffi_benchmark_strlen,
};
use ffibench_abi::qsort_abi::ffi_benchmark_qsort;
use ffibench_abi::sysinfo_abi;
use ffibench_bridge::engine;
use ffibench_bridge::sim::{LocalRef, SimEnv, SimRuntime, SimStats};
use ffibench_bridge::{BindingRegistry, BridgeError, ComparatorSource};
use ffibench_core::string::table;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::inputs::{self, InputKind};

/// Class of the comparator object used by the instance-variant shapes.
pub const COMPARATOR_CLASS: &str = "benchmark/AscendingComparator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    Noop,
    AcceptString,
    Strlen,
    GetString,
    Sysinfo,
    /// Native sort, C function-pointer comparator.
    QsortNative,
    /// Bridged sort, static managed comparator.
    QsortStatic,
    /// Bridged sort, comparator object bound once.
    QsortInstance,
    /// Bridged sort, comparator object resolved on every call.
    QsortFresh,
}

impl CallShape {
    pub const ALL: [Self; 9] = [
        Self::Noop,
        Self::AcceptString,
        Self::Strlen,
        Self::GetString,
        Self::Sysinfo,
        Self::QsortNative,
        Self::QsortStatic,
        Self::QsortInstance,
        Self::QsortFresh,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AcceptString => "accept_string",
            Self::Strlen => "strlen",
            Self::GetString => "get_string",
            Self::Sysinfo => "sysinfo",
            Self::QsortNative => "qsort_native",
            Self::QsortStatic => "qsort_static",
            Self::QsortInstance => "qsort_instance",
            Self::QsortFresh => "qsort_fresh",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether the cost depends on the length parameter.
    #[must_use]
    pub const fn takes_length(self) -> bool {
        !matches!(self, Self::Noop | Self::Sysinfo)
    }

    #[must_use]
    pub const fn is_sort(self) -> bool {
        matches!(
            self,
            Self::QsortNative | Self::QsortStatic | Self::QsortInstance | Self::QsortFresh
        )
    }

    #[must_use]
    pub const fn is_bridged(self) -> bool {
        matches!(
            self,
            Self::QsortStatic | Self::QsortInstance | Self::QsortFresh
        )
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallShape {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim())
            .ok_or_else(|| HarnessError::invalid(format!("unknown call shape `{s}`")))
    }
}

/// Parse a comma-separated shape list; `all` selects every shape.
pub fn parse_shapes(raw: &str) -> Result<Vec<CallShape>, HarnessError> {
    if raw.trim() == "all" {
        return Ok(CallShape::ALL.to_vec());
    }
    let shapes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<CallShape>, _>>()?;
    if shapes.is_empty() {
        return Err(HarnessError::invalid("no call shapes given"));
    }
    Ok(shapes)
}

unsafe extern "C" fn ascending(a: *const c_int, b: *const c_int) -> c_int {
    // SAFETY: the native sort passes pointers to elements of its buffer.
    let (a, b) = unsafe { (*a, *b) };
    a.cmp(&b) as c_int
}

/// Simulated runtime plus the two process-lifetime registries the bridged
/// shapes bind through.
pub struct BridgeFixture {
    vm: SimRuntime,
    statics: BindingRegistry<SimRuntime>,
    instances: BindingRegistry<SimRuntime>,
}

impl BridgeFixture {
    #[must_use]
    pub fn new() -> Self {
        Self::with_runtime(SimRuntime::benchmark())
    }

    #[must_use]
    pub fn with_runtime(vm: SimRuntime) -> Self {
        Self {
            vm,
            statics: BindingRegistry::new(),
            instances: BindingRegistry::new(),
        }
    }

    #[must_use]
    pub fn runtime(&self) -> &SimRuntime {
        &self.vm
    }

    #[must_use]
    pub fn statics(&self) -> &BindingRegistry<SimRuntime> {
        &self.statics
    }

    #[must_use]
    pub fn instances(&self) -> &BindingRegistry<SimRuntime> {
        &self.instances
    }

    #[must_use]
    pub fn stats(&self) -> SimStats {
        self.vm.stats()
    }
}

impl Default for BridgeFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One shape at one length, ready to be called repeatedly.
pub struct PreparedCall<'f> {
    shape: CallShape,
    fixture: &'f BridgeFixture,
    env: SimEnv<'f>,
    comparator: LocalRef,
    pristine: Vec<i32>,
    work: Vec<i32>,
    text: CString,
    length: usize,
    #[cfg(target_os = "linux")]
    sysinfo: libc::sysinfo,
}

impl<'f> PreparedCall<'f> {
    pub fn new(
        fixture: &'f BridgeFixture,
        shape: CallShape,
        length: usize,
        input: InputKind,
        seed: u64,
    ) -> Result<Self, HarnessError> {
        let mut env = fixture.vm.attach_current_thread()?;
        let comparator = env.new_object(COMPARATOR_CLASS)?;
        let pristine = inputs::generate(input, length, seed);
        let bytes = table::global().get(length);
        let text = CString::new(&bytes[..bytes.len() - 1])
            .map_err(|err| HarnessError::invalid(err.to_string()))?;
        Ok(Self {
            shape,
            fixture,
            env,
            comparator,
            work: pristine.clone(),
            pristine,
            text,
            length,
            // SAFETY: `struct sysinfo` is plain integers; all-zero is valid.
            #[cfg(target_os = "linux")]
            sysinfo: unsafe { std::mem::zeroed() },
        })
    }

    #[must_use]
    pub fn shape(&self) -> CallShape {
        self.shape
    }

    /// The sort buffer after the last call.
    #[must_use]
    pub fn buffer(&self) -> &[i32] {
        &self.work
    }

    /// Perform one operation. Sort shapes restore the input first.
    pub fn call(&mut self) -> Result<(), BridgeError> {
        if self.shape.is_sort() {
            self.work.copy_from_slice(&self.pristine);
        }
        match self.shape {
            // SAFETY (all native shapes): arguments are owned by `self` and
            // valid for the duration of the call.
            CallShape::Noop => unsafe { ffi_benchmark_noop() },
            CallShape::AcceptString => unsafe { ffi_benchmark_accept_string(self.text.as_ptr()) },
            CallShape::Strlen => {
                black_box(unsafe { ffi_benchmark_strlen(self.text.as_ptr()) });
            }
            CallShape::GetString => {
                let length = c_int::try_from(self.length).unwrap_or(c_int::MAX);
                black_box(unsafe { ffi_benchmark_get_string(length) });
            }
            #[cfg(target_os = "linux")]
            CallShape::Sysinfo => unsafe {
                sysinfo_abi::ffi_benchmark_sysinfo(&mut self.sysinfo);
                black_box(self.sysinfo.mem_unit);
            },
            #[cfg(not(target_os = "linux"))]
            CallShape::Sysinfo => {
                black_box(sysinfo_abi::mem_unit());
            }
            CallShape::QsortNative => unsafe {
                ffi_benchmark_qsort(
                    self.work.as_mut_ptr(),
                    c_long::try_from(self.work.len()).unwrap_or(c_long::MAX),
                    Some(ascending),
                );
            },
            CallShape::QsortStatic => engine::try_sort(
                &self.fixture.statics,
                &mut self.env,
                ComparatorSource::benchmark_static(),
                &mut self.work,
            )?,
            CallShape::QsortInstance => engine::try_sort(
                &self.fixture.instances,
                &mut self.env,
                ComparatorSource::instance(&self.comparator),
                &mut self.work,
            )?,
            CallShape::QsortFresh => engine::try_sort_fresh(
                &mut self.env,
                ComparatorSource::instance(&self.comparator),
                &mut self.work,
            )?,
        }
        Ok(())
    }
}

/// Sort `elements` ints through the raw-address boundary with the
/// comparator object of class `comparator_class`, exactly as a JNI
/// `qsortWith` call would. Bridge failures terminate the process.
pub fn sort_through_boundary(
    fixture: &BridgeFixture,
    comparator_class: &str,
    data: &mut [i32],
) -> Result<(), HarnessError> {
    let mut env = fixture.vm.attach_current_thread()?;
    let comparator = env.new_object(comparator_class)?;
    let count = i64::try_from(data.len()).map_err(|err| HarnessError::invalid(err.to_string()))?;
    // SAFETY: `data` is exclusively borrowed for the call.
    unsafe {
        engine::sort_at_address(
            &fixture.instances,
            &mut env,
            ComparatorSource::instance(&comparator),
            data.as_mut_ptr() as u64,
            count,
        );
    }
    Ok(())
}
