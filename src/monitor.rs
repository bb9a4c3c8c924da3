//! Activity telemetry.
//!
//! One [`ActivityMonitor`] per session records structured action events from
//! the parser and both device controllers, and samples the raw pointer
//! position from a background thread. Both histories are bounded rings; the
//! oldest entry is dropped first and eviction is silent. A single mutex
//! guards all reads and writes and is never held across a sleep or an input
//! injection call.

use crate::backend::InputBackend;
use crate::screen::Point;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_MAX_MOUSE_HISTORY: usize = 500;
pub const DEFAULT_MAX_ACTION_HISTORY: usize = 1000;

/// Where an action event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Parser,
    Mouse,
    Keyboard,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSource::Parser => write!(f, "parser"),
            EventSource::Mouse => write!(f, "mouse"),
            EventSource::Keyboard => write!(f, "keyboard"),
        }
    }
}

/// A structured record of a parsed command or an enqueued primitive.
#[derive(Debug, Clone, Serialize)]
pub struct ActionEvent {
    /// Epoch seconds.
    pub time: f64,
    pub source: EventSource,
    #[serde(rename = "type")]
    pub kind: String,
    /// Command-specific payload.
    pub data: Value,
}

/// A raw pointer position captured by the background sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MouseSample {
    /// Epoch seconds.
    pub time: f64,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Default)]
struct MonitorState {
    action_history: VecDeque<ActionEvent>,
    mouse_history: VecDeque<MouseSample>,
    last_position: Option<Point>,
    last_move_time: Option<f64>,
}

fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Thread-safe, bounded recorder of action events and pointer samples.
///
/// Create once per session; call [`ActivityMonitor::shutdown`] when done.
/// The sampler thread holds only a weak reference, so a monitor dropped
/// without an explicit shutdown still winds its sampler down.
pub struct ActivityMonitor {
    max_mouse_history: usize,
    max_action_history: usize,
    state: Mutex<MonitorState>,
    stop: AtomicBool,
    sampler: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityMonitor {
    pub fn new(max_mouse_history: usize, max_action_history: usize) -> Arc<Self> {
        Arc::new(Self {
            max_mouse_history,
            max_action_history,
            state: Mutex::new(MonitorState::default()),
            stop: AtomicBool::new(false),
            sampler: Mutex::new(None),
        })
    }

    /// Create a monitor and start its background pointer sampler.
    pub fn with_sampler(
        max_mouse_history: usize,
        max_action_history: usize,
        backend: Arc<dyn InputBackend>,
        interval: Duration,
    ) -> Arc<Self> {
        let monitor = Self::new(max_mouse_history, max_action_history);
        monitor.start_sampler(backend, interval);
        monitor
    }

    /// Spawn the sampler thread. At most one per monitor; a second call
    /// replaces nothing and joins the handle of the first on shutdown.
    pub fn start_sampler(self: &Arc<Self>, backend: Arc<dyn InputBackend>, interval: Duration) {
        let weak: Weak<ActivityMonitor> = Arc::downgrade(self);
        let handle = std::thread::spawn(move || loop {
            let Some(monitor) = weak.upgrade() else {
                break;
            };
            if monitor.stop.load(Ordering::SeqCst) {
                break;
            }
            match backend.pointer_position() {
                Ok(p) => monitor.record_sample(p.x, p.y),
                Err(e) => tracing::debug!("pointer sample failed: {e}"),
            }
            drop(monitor);
            std::thread::sleep(interval);
        });

        if let Ok(mut slot) = self.sampler.lock() {
            if slot.is_none() {
                *slot = Some(handle);
            }
        }
    }

    /// Record a structured action event. Evicts the oldest entry beyond the
    /// history bound.
    pub fn record_action(&self, source: EventSource, kind: &str, data: Value) {
        let event = ActionEvent {
            time: epoch_seconds(),
            source,
            kind: kind.to_string(),
            data,
        };
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.action_history.push_back(event);
        while state.action_history.len() > self.max_action_history {
            state.action_history.pop_front();
        }
    }

    /// Record a raw pointer sample and refresh the last-position markers.
    pub fn record_sample(&self, x: i32, y: i32) {
        let now = epoch_seconds();
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.last_position = Some(Point::new(x, y));
        state.last_move_time = Some(now);
        state.mouse_history.push_back(MouseSample { time: now, x, y });
        while state.mouse_history.len() > self.max_mouse_history {
            state.mouse_history.pop_front();
        }
    }

    /// Snapshot of the action history, oldest first.
    pub fn action_history(&self) -> Vec<ActionEvent> {
        self.state
            .lock()
            .map(|s| s.action_history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the pointer samples, oldest first.
    pub fn mouse_history(&self) -> Vec<MouseSample> {
        self.state
            .lock()
            .map(|s| s.mouse_history.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn clear_action_history(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.action_history.clear();
        }
    }

    pub fn last_position(&self) -> Option<Point> {
        self.state.lock().ok().and_then(|s| s.last_position)
    }

    /// Epoch seconds of the most recent pointer sample.
    pub fn last_move_time(&self) -> Option<f64> {
        self.state.lock().ok().and_then(|s| s.last_move_time)
    }

    /// Stop the background sampler and wait for it to exit. Safe to call
    /// more than once.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self.sampler.lock().ok().and_then(|mut s| s.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("pointer sampler thread panicked");
            }
        }
    }
}
