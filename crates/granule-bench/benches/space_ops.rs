//! Criterion micro-benchmarks for collision grid operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use granule_space::{CollisionGrid, Positioned};
use granule_test_utils::spawn_uniform;

/// Benchmark: Clear a 128x128 grid and insert 10K particles serially.
fn bench_rebuild_serial_10k(c: &mut Criterion) {
    let mut grid: CollisionGrid = CollisionGrid::new(128, 128).unwrap();
    let cells: Vec<(u32, u32)> = spawn_uniform(5, 10_000, 128.0, 128.0)
        .iter()
        .filter_map(Positioned::cell)
        .collect();

    c.bench_function("grid_rebuild_serial_10k", |b| {
        b.iter(|| {
            grid.clear();
            for (i, &(x, y)) in cells.iter().enumerate() {
                grid.add_atom(x, y, i as u32);
            }
            black_box(grid.overflow_count());
        });
    });
}

/// Benchmark: Query the 3x3 neighbourhood of every cell in a 100x100 grid.
fn bench_neighbours_10k(c: &mut Criterion) {
    let mut grid: CollisionGrid = CollisionGrid::new(100, 100).unwrap();
    for (i, p) in spawn_uniform(9, 20_000, 100.0, 100.0).iter().enumerate() {
        if let Some((x, y)) = p.cell() {
            grid.add_atom(x, y, i as u32);
        }
    }

    c.bench_function("grid_neighbours_10k", |b| {
        b.iter(|| {
            for x in 0..100 {
                for y in 0..100 {
                    black_box(grid.neighbours(x, y));
                }
            }
        });
    });
}

/// Benchmark: Split a 512x512 grid into 8 column stripes.
fn bench_column_stripes(c: &mut Criterion) {
    let mut grid: CollisionGrid = CollisionGrid::new(512, 512).unwrap();
    c.bench_function("grid_column_stripes_8", |b| {
        b.iter(|| {
            let stripes = grid.column_stripes_mut(8).unwrap();
            black_box(stripes.len());
        });
    });
}

criterion_group!(
    benches,
    bench_rebuild_serial_10k,
    bench_neighbours_10k,
    bench_column_stripes
);
criterion_main!(benches);
