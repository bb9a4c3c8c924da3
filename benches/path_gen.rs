use criterion::{criterion_group, criterion_main, Criterion};
use desk_driver::monitor::ActivityMonitor;
use desk_driver::motion::{gradient_noise, MotionProfile, MotionSynthesizer};
use desk_driver::mouse::MouseController;
use desk_driver::screen::{Point, ScreenMap};

fn bench_path_generation(c: &mut Criterion) {
    let mouse = MouseController::with_motion(
        ActivityMonitor::new(16, 16),
        ScreenMap::new(1920, 1080),
        MotionSynthesizer::with_seed(MotionProfile::default(), 1),
    );

    c.bench_function("draw_line_500_steps", |b| {
        b.iter(|| mouse.draw_line(Point::new(0, 0), Point::new(1919, 1079), 500))
    });

    let waypoints: Vec<Point> = (0..20)
        .map(|i| Point::new(i * 90, (i % 5) * 200))
        .collect();
    c.bench_function("draw_polyline_20_points", |b| {
        b.iter(|| mouse.draw_polyline(&waypoints, 30))
    });
}

fn bench_noise(c: &mut Criterion) {
    c.bench_function("gradient_noise_1k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1000 {
                acc += gradient_noise(i as f64 * 0.3);
            }
            acc
        })
    });
}

criterion_group!(benches, bench_path_generation, bench_noise);
criterion_main!(benches);
