//! Sort-with-callback benchmarks.
//!
//! Compares the native function-pointer comparator against the bridged
//! comparators on the simulated runtime: static method, bound instance, and
//! an instance resolved again on every call. Every iteration includes the
//! buffer refill.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ffibench_harness::inputs::{DEFAULT_SEED, InputKind};
use ffibench_harness::shapes::{BridgeFixture, CallShape, PreparedCall};

const LENGTHS: &[usize] = &[8, 16, 32, 64, 128];

fn bench_sort_shapes(c: &mut Criterion, input: InputKind) {
    let fixture = BridgeFixture::new();
    let mut group = c.benchmark_group(format!("qsort_{input}"));

    for &len in LENGTHS {
        group.throughput(Throughput::Elements(len as u64));
        for shape in CallShape::ALL.into_iter().filter(|s| s.is_sort()) {
            let mut call = PreparedCall::new(&fixture, shape, len, input, DEFAULT_SEED).unwrap();
            group.bench_function(BenchmarkId::new(shape.as_str(), len), |b| {
                b.iter(|| call.call().unwrap());
            });
        }
    }
    group.finish();
}

fn bench_ascending(c: &mut Criterion) {
    bench_sort_shapes(c, InputKind::Ascending);
}

fn bench_random(c: &mut Criterion) {
    bench_sort_shapes(c, InputKind::Random);
}

criterion_group!(benches, bench_ascending, bench_random);
criterion_main!(benches);
