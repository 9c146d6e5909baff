//! Benchmarks for the keyed list diff.
//!
//! Run with: cargo bench -p weave-render --bench diff_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use weave_render::{KeyedOrdering, ViewChange, diff};

fn ordering(keys: &[u32]) -> KeyedOrdering<u32, fn()> {
    keys.iter().map(|k| (*k, (|| ()) as fn())).collect()
}

/// Deterministic shuffle touching roughly `pct` percent of positions.
fn perturb(keys: &[u32], pct: usize) -> Vec<u32> {
    let mut out = keys.to_vec();
    let swaps = out.len() * pct / 200;
    for i in 0..swaps {
        let a = (i * 7 + 3) % out.len();
        let b = (i * 13 + 5) % out.len();
        out.swap(a, b);
    }
    out
}

fn run(from: &[u32], to: &[u32]) -> Vec<ViewChange<u32, ()>> {
    diff(from, ordering(to))
}

fn bench_diff_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff/identical");

    for n in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(u64::from(n)));
        let keys: Vec<u32> = (0..n).collect();
        group.bench_with_input(BenchmarkId::new("diff", n), &keys, |b, keys| {
            b.iter(|| black_box(run(keys, keys)))
        });
    }

    group.finish();
}

fn bench_diff_shuffled(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff/shuffled_10pct");

    for n in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(u64::from(n)));
        let from: Vec<u32> = (0..n).collect();
        let to = perturb(&from, 10);
        group.bench_with_input(BenchmarkId::new("diff", n), &(), |b, _| {
            b.iter(|| black_box(run(&from, &to)))
        });
    }

    group.finish();
}

fn bench_diff_replace_half(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff/replace_half");

    for n in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(u64::from(n)));
        let from: Vec<u32> = (0..n).collect();
        let to: Vec<u32> = (n / 2..n + n / 2).collect();
        group.bench_with_input(BenchmarkId::new("diff", n), &(), |b, _| {
            b.iter(|| black_box(run(&from, &to)))
        });
    }

    group.finish();
}

fn bench_diff_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff/reverse");

    for n in [100u32, 1_000] {
        group.throughput(Throughput::Elements(u64::from(n)));
        let from: Vec<u32> = (0..n).collect();
        let to: Vec<u32> = from.iter().rev().copied().collect();
        group.bench_with_input(BenchmarkId::new("diff", n), &(), |b, _| {
            b.iter(|| black_box(run(&from, &to)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_diff_identical,
    bench_diff_shuffled,
    bench_diff_replace_half,
    bench_diff_reverse
);
criterion_main!(benches);
