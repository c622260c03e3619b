//! Cascade, background and timeline behaviour through the public API.

use std::time::Duration;

use proptest::prelude::*;
use stagehand_core::animation::{
    Animation, CascadeTiming, LAYERS, Prop, StaggerCascade, StartOffset, TargetStore, Timeline,
    Transform, TweenEngine, TweenSpec, ease_in_out_cubic,
};
use stagehand_core::background::{Palette, build_background, interpolate};
use stagehand_core::geometry::Vec3;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn run(cascade: &mut StaggerCascade, total: Duration, step: Duration) {
    let mut t = Duration::ZERO;
    while t < total {
        cascade.tick(step);
        t += step;
    }
}

#[test]
fn forward_cascade_ends_on_projects_palette() {
    let mut cascade = StaggerCascade::forward(CascadeTiming::default());
    run(&mut cascade, ms(7000), ms(16));
    assert!(cascade.is_settled());
    assert_eq!(
        build_background(&interpolate(&cascade.layer_values())),
        build_background(&Palette::PROJECTS)
    );
}

#[test]
fn reverse_cascade_ends_on_original_palette() {
    let mut cascade = StaggerCascade::reverse(CascadeTiming::default());
    run(&mut cascade, ms(7000), ms(10));
    assert_eq!(
        build_background(&interpolate(&cascade.layer_values())),
        build_background(&Palette::ORIGINAL)
    );
}

#[test]
fn reverse_at_zero_renders_like_forward_at_one() {
    let mut forward = StaggerCascade::forward(CascadeTiming::default());
    run(&mut forward, ms(7000), ms(100));
    let reverse = StaggerCascade::reverse(CascadeTiming::default());
    assert_eq!(
        build_background(&interpolate(&reverse.layer_values())),
        build_background(&interpolate(&forward.layer_values()))
    );
}

#[test]
fn mid_cascade_background_differs_from_both_palettes() {
    let mut cascade = StaggerCascade::forward(CascadeTiming::default());
    run(&mut cascade, ms(2500), ms(50));
    let css = build_background(&interpolate(&cascade.layer_values()));
    assert_ne!(css, build_background(&Palette::ORIGINAL));
    assert_ne!(css, build_background(&Palette::PROJECTS));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Target {
    Camera,
    Phone,
}

#[test]
fn camera_and_phone_move_in_lockstep() {
    let mut store = TargetStore::new();
    store.insert(
        Target::Camera,
        Transform::at(Vec3::new(0.0, 0.0, 10.0)).with_look_at(Vec3::ZERO),
    );
    store.insert(Target::Phone, Transform::default());

    let mut engine = TweenEngine::new();
    let timeline = Timeline::new()
        .to(
            TweenSpec::new(Target::Camera, ms(2000))
                .position(Vec3::new(-3.0, 1.0, 6.0))
                .easing(ease_in_out_cubic),
            StartOffset::At(Duration::ZERO),
        )
        .to(
            TweenSpec::new(Target::Camera, ms(2000))
                .look_at(Vec3::new(-3.0, 0.0, 0.0))
                .easing(ease_in_out_cubic),
            StartOffset::At(Duration::ZERO),
        )
        .to(
            TweenSpec::new(Target::Phone, ms(2000))
                .position(Vec3::new(-3.0, 0.0, 0.0))
                .easing(ease_in_out_cubic),
            StartOffset::At(Duration::ZERO),
        )
        .to(
            TweenSpec::new(Target::Phone, ms(2000))
                .rotation(Vec3::new(0.0, 0.5, 0.0))
                .easing(ease_in_out_cubic),
            StartOffset::At(Duration::ZERO),
        );
    let handle = engine.play(timeline);

    let mut finished = Vec::new();
    for _ in 0..125 {
        finished.extend(engine.tick(ms(16), &mut store));
        let cam = store.get(Target::Camera).unwrap();
        let phone = store.get(Target::Phone).unwrap();
        // Same curve, same clock: camera x and phone x stay equal.
        assert!((cam.position.x - phone.position.x).abs() < 1e-9);
    }
    assert_eq!(finished, vec![handle]);
    let phone = store.get(Target::Phone).unwrap();
    assert_eq!(phone.position, Vec3::new(-3.0, 0.0, 0.0));
    assert_eq!(phone.rotation.y, 0.5);
    assert_eq!(store.get(Target::Camera).unwrap().get(Prop::LookX), -3.0);
}

proptest! {
    #[test]
    fn layer_values_are_unit_and_complementary(elapsed_ms in 0u64..10_000) {
        let mut forward = StaggerCascade::forward(CascadeTiming::default());
        let mut reverse = StaggerCascade::reverse(CascadeTiming::default());
        forward.tick(ms(elapsed_ms));
        reverse.tick(ms(elapsed_ms));
        let f = forward.layer_values();
        let r = reverse.layer_values();
        for i in 0..LAYERS {
            prop_assert!((0.0..=1.0).contains(&f[i]));
            prop_assert!(((f[i] + r[i]) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn layers_are_monotone(a in 0u64..8_000, b in 0u64..8_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let timing = CascadeTiming::default();
        for i in 0..LAYERS {
            prop_assert!(timing.layer_progress(i, ms(lo)) <= timing.layer_progress(i, ms(hi)));
        }
    }

    #[test]
    fn earlier_layers_lead(elapsed_ms in 0u64..8_000) {
        let timing = CascadeTiming::default();
        for i in 1..LAYERS {
            prop_assert!(timing.layer_progress(i - 1, ms(elapsed_ms)) >= timing.layer_progress(i, ms(elapsed_ms)));
        }
    }
}
