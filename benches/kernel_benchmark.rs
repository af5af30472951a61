//! Benchmark: scalar vs `wide`-accelerated distance kernels.
//!
//! Run with: `cargo bench --bench kernel_benchmark`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vectorstore_core::kernels::{scalar, simd};

fn generate_vector(dim: usize, seed: u64) -> Vec<f32> {
    (0..dim)
        .map(|i| ((seed as f32 * 0.1 + i as f32 * 0.01).sin() + 1.0) / 2.0)
        .collect()
}

fn to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn bench_l2(c: &mut Criterion) {
    let mut group = c.benchmark_group("l2_f32");
    for &dim in &[128usize, 384, 1536] {
        let a = to_bytes(&generate_vector(dim, 1));
        let b = to_bytes(&generate_vector(dim, 2));

        group.bench_with_input(BenchmarkId::new("scalar", dim), &dim, |bencher, _| {
            bencher.iter(|| black_box(scalar::l2_f32(black_box(&a), black_box(&b))));
        });
        group.bench_with_input(BenchmarkId::new("simd", dim), &dim, |bencher, _| {
            bencher.iter(|| black_box(simd::l2_f32(black_box(&a), black_box(&b))));
        });
    }
    group.finish();
}

fn bench_cosine(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_f32");
    for &dim in &[128usize, 384, 1536] {
        let a = to_bytes(&generate_vector(dim, 3));
        let b = to_bytes(&generate_vector(dim, 4));

        group.bench_with_input(BenchmarkId::new("scalar", dim), &dim, |bencher, _| {
            bencher.iter(|| black_box(scalar::cosine_f32(black_box(&a), black_box(&b))));
        });
        group.bench_with_input(BenchmarkId::new("simd", dim), &dim, |bencher, _| {
            bencher.iter(|| black_box(simd::cosine_f32(black_box(&a), black_box(&b))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_l2, bench_cosine);
criterion_main!(benches);
