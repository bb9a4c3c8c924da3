//! Humanized pointer trajectories.
//!
//! A [`MotionSynthesizer`] turns a target point into a curved, noisy movement
//! with adaptive timing. The curve is a cubic Bézier whose control points are
//! offset from the straight line by a random perpendicular angle, sampled
//! through a cubic ease-in-out, perturbed by index-seeded gradient noise and
//! blended toward the live pointer position so consecutive samples never jump.

use crate::backend::InputBackend;
use crate::screen::Point;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, TAU};

/// Tuning parameters for a movement personality.
///
/// Immutable once constructed; one profile can back any number of
/// synthesizer invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Lower bound on a derived movement duration, seconds.
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    /// Upper bound on a derived movement duration, seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
    /// Probability of deliberately moving past the target and correcting.
    #[serde(default = "default_overshoot_chance")]
    pub overshoot_chance: f64,
    /// Amplitude of the per-sample gradient noise, pixels.
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,
    /// Blend weight toward the computed curve point, in `(0, 1]`.
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f64,
}

fn default_min_duration() -> f64 {
    0.0005
}

fn default_max_duration() -> f64 {
    0.0012
}

fn default_overshoot_chance() -> f64 {
    0.3
}

fn default_noise_scale() -> f64 {
    0.8
}

fn default_smoothing_factor() -> f64 {
    0.578
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
            overshoot_chance: default_overshoot_chance(),
            noise_scale: default_noise_scale(),
            smoothing_factor: default_smoothing_factor(),
        }
    }
}

/// Cubic ease-in-out timing curve on `t ∈ [0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Evaluate a scalar cubic Bézier at `t`.
pub fn bezier_cubic(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

fn lerp(from: (f64, f64), to: (f64, f64), weight: f64) -> (f64, f64) {
    (
        from.0 + (to.0 - from.0) * weight,
        from.1 + (to.1 - from.1) * weight,
    )
}

// Splitmix64 scramble mapped onto [-1, 1). Replaces the reseed-a-shared-rng
// trick for per-index gradients with a pure function.
fn hash_unit(i: i64) -> f64 {
    let mut z = (i as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    ((z >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
}

/// Smooth 1-D gradient noise. Deterministic for equal inputs; gradients are
/// seeded by the integer lattice index, never by wall-clock or shared state.
pub fn gradient_noise(x: f64) -> f64 {
    let xi = x.floor();
    let xf = x - xi;
    let fade = xf * xf * (3.0 - 2.0 * xf);
    let a = hash_unit(xi as i64);
    let b = hash_unit(xi as i64 + 1);
    a + fade * (b - a)
}

/// Derive a movement duration from the travel distance.
///
/// Grows by 0.3 s per 1000 px over the profile minimum, clamped into the
/// profile bounds. With the default sub-millisecond bounds this is tuned for
/// throughput rather than visible realism.
pub fn adaptive_duration(profile: &MotionProfile, distance: f64) -> f64 {
    (profile.min_duration + (distance / 1000.0) * 0.3)
        .max(profile.min_duration)
        .min(profile.max_duration)
}

/// Drives the pointer along humanized trajectories.
///
/// Owns its random generator; nothing here touches a thread-local or global
/// source, so seeded instances replay identically.
#[derive(Debug)]
pub struct MotionSynthesizer {
    profile: MotionProfile,
    rng: StdRng,
}

impl MotionSynthesizer {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            profile,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests and replay.
    pub fn with_seed(profile: MotionProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Move the pointer to `target`, blocking until it rests there.
    ///
    /// `duration` overrides the adaptive timing; `jitter` overrides the
    /// profile noise amplitude. A zero-distance move still runs the full
    /// sequence. Backend faults propagate unretried.
    pub fn move_to(
        &mut self,
        backend: &dyn InputBackend,
        target: Point,
        duration: Option<f64>,
        jitter: Option<f64>,
    ) -> Result<()> {
        let start = backend.pointer_position()?;
        let (sx, sy) = (start.x as f64, start.y as f64);
        let (tx, ty) = (target.x as f64, target.y as f64);
        let distance = start.distance_to(target);

        let duration = duration.unwrap_or_else(|| adaptive_duration(&self.profile, distance));
        let noise_scale = jitter.unwrap_or(self.profile.noise_scale);

        // Control points bow the path sideways off the straight line. The
        // second one bends half as far the other way so the curve settles
        // back onto the target.
        let angle = self.rng.gen_range(-FRAC_PI_4..FRAC_PI_4);
        let curve = distance * self.rng.gen_range(0.2..0.4);
        let c1x = sx + (tx - sx) * 0.33 + angle.cos() * curve;
        let c1y = sy + (ty - sy) * 0.33 + angle.sin() * curve;
        let c2x = sx + (tx - sx) * 0.66 - angle.cos() * curve * 0.5;
        let c2y = sy + (ty - sy) * 0.66 - angle.sin() * curve * 0.5;

        let overshoot = self.rng.gen::<f64>() < self.profile.overshoot_chance;

        // A single curve sample keeps per-move latency near the duration
        // floor; the Bézier still shapes where the pointer lands.
        let steps = 1usize;
        let delay = duration / steps as f64;

        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let eased = ease_in_out_cubic(t);

            let mut x = bezier_cubic(sx, c1x, c2x, tx, eased);
            let mut y = bezier_cubic(sy, c1y, c2y, ty, eased);

            x += gradient_noise(i as f64 * 0.3) * noise_scale;
            y += gradient_noise(i as f64 * 0.3 + 100.0) * noise_scale;

            let here = backend.pointer_position()?;
            let (x, y) = lerp(
                (here.x as f64, here.y as f64),
                (x, y),
                self.profile.smoothing_factor,
            );

            backend.move_pointer_to(Point::new(x.round() as i32, y.round() as i32))?;
            backend.sleep(delay * self.rng.gen_range(0.56..0.75));
        }

        if overshoot && distance > 50.0 {
            let ox = tx + self.rng.gen_range(-3..=3) as f64;
            let oy = ty + self.rng.gen_range(-3..=3) as f64;
            let here = backend.pointer_position()?;
            let (ox, oy) = lerp(
                (here.x as f64, here.y as f64),
                (ox, oy),
                self.profile.smoothing_factor,
            );
            backend.move_pointer_to(Point::new(ox.round() as i32, oy.round() as i32))?;
            backend.sleep(self.rng.gen_range(0.05..0.07));
            backend.move_pointer_to(target)?;
        }

        backend.sleep(self.rng.gen_range(0.05..0.07));
        Ok(())
    }

    /// Drift to a random point on a disc around the current position.
    /// Used for idle realism between tasks.
    pub fn idle_wander(
        &mut self,
        backend: &dyn InputBackend,
        radius: f64,
        duration: f64,
    ) -> Result<()> {
        let start = backend.pointer_position()?;
        let radius = radius.max(1.0);
        let angle = self.rng.gen_range(0.0..TAU);
        let dist = self.rng.gen_range(radius * 0.3..radius);
        let target = Point::new(
            start.x + (angle.cos() * dist) as i32,
            start.y + (angle.sin() * dist) as i32,
        );
        self.move_to(backend, target, Some(duration), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestPointer(Mutex<Point>);

    impl TestPointer {
        fn at(x: i32, y: i32) -> Self {
            Self(Mutex::new(Point::new(x, y)))
        }

        fn position(&self) -> Point {
            *self.0.lock().unwrap()
        }
    }

    impl InputBackend for TestPointer {
        fn screen_size(&self) -> Result<(i32, i32)> {
            Ok((1920, 1080))
        }

        fn pointer_position(&self) -> Result<Point> {
            Ok(self.position())
        }

        fn move_pointer_to(&self, target: Point) -> Result<()> {
            *self.0.lock().unwrap() = target;
            Ok(())
        }

        fn press_button(&self, _button: crate::backend::MouseButton) -> Result<()> {
            Ok(())
        }

        fn key_down(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        fn key_up(&self, _key: &str) -> Result<()> {
            Ok(())
        }

        fn type_text(&self, _text: &str, _interval: f64) -> Result<()> {
            Ok(())
        }

        fn hotkey(&self, _keys: &[String]) -> Result<()> {
            Ok(())
        }

        fn sleep(&self, _seconds: f64) {}
    }

    #[test]
    fn easing_hits_boundaries_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bezier_interpolates_endpoints() {
        assert_eq!(bezier_cubic(10.0, 50.0, -20.0, 90.0, 0.0), 10.0);
        assert_eq!(bezier_cubic(10.0, 50.0, -20.0, 90.0, 1.0), 90.0);
    }

    #[test]
    fn gradient_noise_is_deterministic_and_bounded() {
        for i in 0..200 {
            let x = i as f64 * 0.3;
            assert_eq!(gradient_noise(x), gradient_noise(x));
            assert!(gradient_noise(x).abs() <= 2.0);
        }
    }

    #[test]
    fn adaptive_duration_clamps_to_profile_bounds() {
        let profile = MotionProfile::default();
        assert_eq!(adaptive_duration(&profile, 0.0), profile.min_duration);
        assert_eq!(adaptive_duration(&profile, 1_000_000.0), profile.max_duration);
    }

    #[test]
    fn zero_distance_move_completes() {
        let backend = TestPointer::at(300, 300);
        let mut synth = MotionSynthesizer::with_seed(MotionProfile::default(), 7);
        synth
            .move_to(&backend, Point::new(300, 300), None, None)
            .unwrap();
    }

    #[test]
    fn forced_overshoot_ends_exactly_on_target() {
        let backend = TestPointer::at(0, 0);
        let profile = MotionProfile {
            overshoot_chance: 1.0,
            ..MotionProfile::default()
        };
        let mut synth = MotionSynthesizer::with_seed(profile, 42);
        let target = Point::new(800, 400);
        synth.move_to(&backend, target, None, None).unwrap();
        assert_eq!(backend.position(), target);
    }

    #[test]
    fn idle_wander_stays_within_radius_of_start() {
        let backend = TestPointer::at(500, 500);
        let profile = MotionProfile {
            overshoot_chance: 0.0,
            noise_scale: 0.0,
            smoothing_factor: 1.0,
            ..MotionProfile::default()
        };
        let mut synth = MotionSynthesizer::with_seed(profile, 11);
        synth.idle_wander(&backend, 80.0, 0.01).unwrap();
        let end = backend.position();
        // Smoothing is 1.0 and noise is off, so the pointer lands on the
        // picked wander target. Allow rounding slack.
        assert!(Point::new(500, 500).distance_to(end) <= 82.0);
    }
}
