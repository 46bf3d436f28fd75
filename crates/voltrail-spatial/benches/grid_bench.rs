//! Criterion benchmarks for the spatial grid.

use criterion::{Criterion, criterion_group, criterion_main};
use voltrail_core::coord::{Direction, Rotation};
use voltrail_core::test_utils::*;
use voltrail_spatial::SpatialGrid;

fn filled_grid(side: i32) -> SpatialGrid {
    let ids = make_block_ids((side * side) as usize);
    let mut grid = SpatialGrid::default();
    for x in 0..side {
        for z in 0..side {
            let id = ids[(x * side + z) as usize];
            grid.register_block(cell(x, 0, z), id, Rotation::None)
                .unwrap();
        }
    }
    grid
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");
    group.sample_size(50);

    group.bench_function("register_32x32", |b| {
        b.iter(|| filled_grid(32));
    });

    let grid = filled_grid(32);
    group.bench_function("neighbor_sweep_32x32", |b| {
        b.iter(|| {
            let mut found = 0usize;
            for (coord, _) in grid.blocks() {
                for dir in Direction::all() {
                    if grid.neighbor_block(coord, dir, grid.cell_size()).is_some() {
                        found += 1;
                    }
                }
            }
            found
        });
    });

    group.finish();
}

criterion_group!(benches, bench_grid);
criterion_main!(benches);
