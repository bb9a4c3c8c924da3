//! Mouse instruction queue, coordinate mapping and path generation.

use crate::backend::{InputBackend, MouseButton};
use crate::instruction::Instruction;
use crate::monitor::{ActivityMonitor, EventSource};
use crate::motion::{MotionProfile, MotionSynthesizer};
use crate::screen::{Point, ScreenMap};
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

/// Buffers mouse instructions and executes them in enqueue order.
///
/// Owns the screen geometry every queued coordinate is clamped against and
/// the motion synthesizer that shapes queued moves. Path helpers produce
/// dense straight-line interpolations for deliberate drawing; they do not go
/// through the synthesizer.
pub struct MouseController {
    screen: ScreenMap,
    queue: Vec<Instruction>,
    monitor: Arc<ActivityMonitor>,
    motion: MotionSynthesizer,
}

impl MouseController {
    pub fn new(monitor: Arc<ActivityMonitor>, screen: ScreenMap, profile: MotionProfile) -> Self {
        Self::with_motion(monitor, screen, MotionSynthesizer::new(profile))
    }

    /// Variant taking a pre-built synthesizer, e.g. a seeded one in tests.
    pub fn with_motion(
        monitor: Arc<ActivityMonitor>,
        screen: ScreenMap,
        motion: MotionSynthesizer,
    ) -> Self {
        Self {
            screen,
            queue: Vec::new(),
            monitor,
            motion,
        }
    }

    pub fn screen(&self) -> &ScreenMap {
        &self.screen
    }

    /// Map normalized `[0, 1]` coordinates to screen pixels.
    pub fn map_normalized(&self, nx: f64, ny: f64) -> Point {
        self.screen.map_normalized(nx, ny)
    }

    /// Clamp a point into the screen bounds.
    pub fn clamp_point(&self, p: Point) -> Point {
        self.screen.clamp(p)
    }

    pub fn queue_move(&mut self, x: i32, y: i32, duration: f64) {
        self.monitor.record_action(
            EventSource::Mouse,
            "MOVE",
            json!({ "x": x, "y": y, "duration": duration }),
        );
        let target = self.screen.clamp(Point::new(x, y));
        self.queue.push(Instruction::Move { target, duration });
    }

    pub fn queue_click(&mut self, button: MouseButton) {
        self.monitor.record_action(
            EventSource::Mouse,
            "CLICK",
            json!({ "button": button.to_string() }),
        );
        self.queue.push(Instruction::Click { button });
    }

    pub fn queue_wait(&mut self, seconds: f64) {
        self.monitor
            .record_action(EventSource::Mouse, "WAIT", json!({ "seconds": seconds }));
        self.queue.push(Instruction::Wait { seconds });
    }

    pub fn queue_path(&mut self, points: Vec<Point>, step_duration: f64) {
        self.monitor.record_action(
            EventSource::Mouse,
            "PATH",
            json!({ "points": points, "step_duration": step_duration }),
        );
        let points = points.into_iter().map(|p| self.screen.clamp(p)).collect();
        self.queue.push(Instruction::Path {
            points,
            step_duration,
        });
    }

    /// Straight-line path from `start` to `end` with `steps + 1` clamped
    /// points, endpoints included. A zero step count is treated as one.
    pub fn draw_line(&self, start: Point, end: Point, steps: usize) -> Vec<Point> {
        let steps = steps.max(1);
        let mut points = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = start.x + ((end.x - start.x) as f64 * t) as i32;
            let y = start.y + ((end.y - start.y) as f64 * t) as i32;
            points.push(self.screen.clamp(Point::new(x, y)));
        }
        points
    }

    /// Connected line segments through `points`, each interpolated with
    /// `steps_per_segment`.
    pub fn draw_polyline(&self, points: &[Point], steps_per_segment: usize) -> Vec<Point> {
        let mut path = Vec::new();
        for pair in points.windows(2) {
            path.extend(self.draw_line(pair[0], pair[1], steps_per_segment));
        }
        path
    }

    /// Execute every queued instruction in order. With `drain` the queue is
    /// emptied afterwards; otherwise it stays for manual clearing. A failing
    /// instruction leaves the queue untouched.
    pub fn execute(&mut self, backend: &dyn InputBackend, drain: bool) -> Result<()> {
        for instruction in &self.queue {
            instruction.run(backend, Some(&mut self.motion))?;
        }
        if drain {
            self.queue.clear();
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Ordered variant names of the pending instructions.
    pub fn inspect(&self) -> Vec<&'static str> {
        self.queue.iter().map(Instruction::name).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
