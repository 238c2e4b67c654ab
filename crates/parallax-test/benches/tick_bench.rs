//! Benchmarks for the per-frame hot paths

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use parallax_core::{LevelKey, TransitionPhase, ViewLevel};
use parallax_reveal::{RevealConfig, RevealController};
use parallax_state::{ScenePatch, SceneStore};
use parallax_time::{TickControl, TickScheduler};
use parallax_visual::{AnimationTask, CameraPose, Easing, Position3D};

const FRAME: Duration = Duration::from_micros(16_667);

fn bench_scheduler_run_once(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_run_once");

    for callbacks in [1usize, 16, 256] {
        let scheduler = TickScheduler::new();
        for _ in 0..callbacks {
            let mut ticks = 0u64;
            let _ = scheduler.register(move |ctx| {
                ticks = ticks.wrapping_add(ctx.tick);
                TickControl::Continue
            });
        }

        group.bench_with_input(BenchmarkId::from_parameter(callbacks), &callbacks, |b, _| {
            b.iter(|| black_box(scheduler.run_once(black_box(FRAME))))
        });
    }

    group.finish();
}

fn bench_store_set(c: &mut Criterion) {
    let store = SceneStore::new();
    let _listener = store.subscribe(|state| {
        black_box(state.revision);
    });
    let far = CameraPose::looking_at(Position3D::new(0.0, 10.0, 30.0), Position3D::zero(), 1.0);

    c.bench_function("store_set_camera_pose", |b| {
        let mut t = 0.0f32;
        b.iter(|| {
            t = (t + 0.01) % 1.0;
            let pose = CameraPose::default().lerp(&far, t);
            black_box(store.set(ScenePatch::new().camera_pose(pose)))
        })
    });

    c.bench_function("store_set_swap_batch", |b| {
        b.iter(|| {
            let _ = store.set(ScenePatch::new().phase(TransitionPhase::Prefetching));
            let _ = store.set(ScenePatch::new().phase(TransitionPhase::Selecting));
            let _ = store.set(ScenePatch::new().phase(TransitionPhase::AnimatingIn));
            let _ = store.set(
                ScenePatch::new()
                    .phase(TransitionPhase::Swapping)
                    .view_level(ViewLevel::Mid)
                    .level_key(LevelKey::new(ViewLevel::Mid, Some("sol".into()))),
            );
            let _ = store.set(ScenePatch::new().phase(TransitionPhase::Resetting));
            black_box(store.set(ScenePatch::new().phase(TransitionPhase::Idle)))
        })
    });
}

fn bench_reveal_tick(c: &mut Criterion) {
    let text = "Sol, a G-type main-sequence star at the heart of the home system, with eight major planets";

    c.bench_function("reveal_full_text", |b| {
        b.iter(|| {
            let scheduler = TickScheduler::new();
            let reveal = RevealController::with_config(
                scheduler.clone(),
                SceneStore::new(),
                RevealConfig::default(),
            );
            let _handle = reveal.start(black_box(text), None);
            while reveal.is_active() {
                let _ = scheduler.run_once(FRAME);
            }
        })
    });
}

fn bench_animation_value(c: &mut Criterion) {
    let far = CameraPose::looking_at(Position3D::new(0.0, 10.0, 30.0), Position3D::zero(), 1.0);
    let mut task = AnimationTask::new(CameraPose::default(), far, Duration::from_millis(1200))
        .easing(Easing::EaseInOutCubic);

    c.bench_function("animation_advance_camera", |b| {
        b.iter(|| {
            task.advance(black_box(FRAME));
            if task.is_complete() {
                task = AnimationTask::new(CameraPose::default(), far, Duration::from_millis(1200))
                    .easing(Easing::EaseInOutCubic);
            }
            black_box(task.value())
        })
    });
}

criterion_group!(
    benches,
    bench_scheduler_run_once,
    bench_store_set,
    bench_reveal_tick,
    bench_animation_value,
);
criterion_main!(benches);
