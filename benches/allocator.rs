//! Benchmarks for lifealloc.
//!
//! Run with: cargo bench

use bumpalo::Bump;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lifealloc::{AllocConfig, LifeVec, Lifetime, LifetimeAlloc};

// =============================================================================
// FRAME ALLOCATION (vs bumpalo)
// =============================================================================

fn bench_frame_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_allocation");

    for size in [16usize, 64, 256, 1024] {
        group.throughput(Throughput::Bytes((size * 1000) as u64));

        group.bench_with_input(BenchmarkId::new("lifealloc", size), &size, |b, &size| {
            let alloc = LifetimeAlloc::new(AllocConfig::high_performance());
            b.iter(|| {
                for _ in 0..1000 {
                    black_box(alloc.allocate_bytes(size, Lifetime::FRAME, Some(8)));
                }
                alloc.end_frame();
            })
        });

        group.bench_with_input(BenchmarkId::new("bumpalo", size), &size, |b, &size| {
            let mut bump = Bump::new();
            let layout = std::alloc::Layout::from_size_align(size, 8).unwrap();
            b.iter(|| {
                for _ in 0..1000 {
                    black_box(bump.alloc_layout(layout));
                }
                bump.reset();
            })
        });
    }

    group.finish();
}

// =============================================================================
// AMBIENT CONTEXT
// =============================================================================

fn bench_ambient(c: &mut Criterion) {
    let alloc = LifetimeAlloc::new(AllocConfig::high_performance());

    let mut group = c.benchmark_group("ambient_context");

    group.bench_function("scoped_allocate_64B_1000x", |b| {
        b.iter(|| {
            {
                let _life = alloc.lifetime_scope(Lifetime::FRAME);
                let _align = alloc.alignment_scope(16);
                for _ in 0..1000 {
                    black_box(alloc.allocate(64));
                }
            }
            alloc.end_frame();
        })
    });

    group.bench_function("push_pop_lifetime", |b| {
        b.iter(|| {
            alloc.push_api_lifetime(Lifetime::WORLD);
            black_box(alloc.pop_api_lifetime());
        })
    });

    group.finish();
}

// =============================================================================
// EXPLICIT LIFETIMES
// =============================================================================

fn bench_explicit(c: &mut Criterion) {
    let alloc = LifetimeAlloc::new(AllocConfig::high_performance());

    c.bench_function("explicit_begin_alloc_end", |b| {
        b.iter(|| {
            let scratch = alloc.explicit_lifetime();
            for _ in 0..100 {
                black_box(scratch.allocate_array::<u32>(16));
            }
        })
    });
}

// =============================================================================
// GROWABLE ARRAYS (vs bumpalo Vec)
// =============================================================================

fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growable_push_10k");

    group.bench_function("lifevec", |b| {
        let alloc = LifetimeAlloc::new(AllocConfig::high_performance());
        b.iter(|| {
            {
                let mut v = LifeVec::new_in(&alloc);
                for i in 0..10_000u32 {
                    v.push(i, Lifetime::FRAME);
                }
                black_box(v.len());
            }
            alloc.end_frame();
        })
    });

    group.bench_function("bumpalo_vec", |b| {
        let mut bump = Bump::new();
        b.iter(|| {
            {
                let mut v = bumpalo::collections::Vec::new_in(&bump);
                for i in 0..10_000u32 {
                    v.push(i);
                }
                black_box(v.len());
            }
            bump.reset();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_frame_alloc, bench_ambient, bench_explicit, bench_growth);
criterion_main!(benches);
