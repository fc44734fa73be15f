//! Criterion benchmarks stepping the benchmark scenes.
//!
//! ```sh
//! cargo bench --package benches --bench pyramid
//! ```

#![allow(missing_docs)]

use benches::{TIME_STEP, ball_pit, chains, large_pyramid};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rigid2d::prelude::*;

const STEPS: usize = 60;

fn step_scene(c: &mut Criterion, name: &str, setup: fn() -> Space) {
    c.bench_function(name, |b| {
        b.iter_batched_ref(
            setup,
            |space| {
                for _ in 0..STEPS {
                    space.step(TIME_STEP).unwrap();
                }
            },
            BatchSize::PerIteration,
        );
    });
}

fn bench_scenes(c: &mut Criterion) {
    step_scene(c, "pyramid_20", || large_pyramid(20));
    step_scene(c, "ball_pit_20x20", || ball_pit(20, 20));
    step_scene(c, "chains_5x20", || chains(5, 20));
}

criterion_group! {
    name = scene_benches;
    config = Criterion::default().sample_size(10);
    targets = bench_scenes
}
criterion_main!(scene_benches);
