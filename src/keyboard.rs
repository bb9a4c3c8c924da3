//! Keyboard instruction queue and intent-level API.

use crate::backend::InputBackend;
use crate::instruction::{Instruction, DEFAULT_KEY_DELAY, DEFAULT_TYPE_INTERVAL};
use crate::monitor::{ActivityMonitor, EventSource};
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

/// Buffers keyboard instructions and executes them in enqueue order.
///
/// Every intent records a keyboard-source event on the monitor at enqueue
/// time, then appends exactly one instruction. Single producer, single
/// consumer; not for cross-thread mutation.
pub struct KeyboardController {
    queue: Vec<Instruction>,
    monitor: Arc<ActivityMonitor>,
}

impl KeyboardController {
    pub fn new(monitor: Arc<ActivityMonitor>) -> Self {
        Self {
            queue: Vec::new(),
            monitor,
        }
    }

    pub fn type_text(&mut self, text: &str) {
        self.monitor
            .record_action(EventSource::Keyboard, "TYPE", json!({ "text": text }));
        self.queue.push(Instruction::TypeText {
            text: text.to_string(),
            interval: DEFAULT_TYPE_INTERVAL,
        });
    }

    pub fn press(&mut self, key: &str) {
        self.monitor
            .record_action(EventSource::Keyboard, "PRESS", json!({ "key": key }));
        self.queue.push(Instruction::KeyTap {
            key: key.to_string(),
            delay: DEFAULT_KEY_DELAY,
        });
    }

    pub fn hold(&mut self, key: &str) {
        self.monitor
            .record_action(EventSource::Keyboard, "HOLD", json!({ "key": key }));
        self.queue.push(Instruction::KeyDown {
            key: key.to_string(),
        });
    }

    pub fn release(&mut self, key: &str) {
        self.monitor
            .record_action(EventSource::Keyboard, "RELEASE", json!({ "key": key }));
        self.queue.push(Instruction::KeyUp {
            key: key.to_string(),
        });
    }

    pub fn shortcut(&mut self, keys: &[String]) {
        self.monitor
            .record_action(EventSource::Keyboard, "SHORTCUT", json!({ "keys": keys }));
        self.queue.push(Instruction::Shortcut {
            keys: keys.to_vec(),
        });
    }

    pub fn wait(&mut self, seconds: f64) {
        self.monitor
            .record_action(EventSource::Keyboard, "WAIT", json!({ "seconds": seconds }));
        self.queue.push(Instruction::Wait { seconds });
    }

    /// Tap the enter key. Records a single `ENTER` event rather than going
    /// through [`KeyboardController::press`].
    pub fn enter(&mut self) {
        self.monitor
            .record_action(EventSource::Keyboard, "ENTER", json!({}));
        self.queue.push(Instruction::KeyTap {
            key: "enter".to_string(),
            delay: DEFAULT_KEY_DELAY,
        });
    }

    /// Tap backspace `times` times under one recorded event.
    pub fn backspace(&mut self, times: usize) {
        self.monitor
            .record_action(EventSource::Keyboard, "BACKSPACE", json!({ "times": times }));
        for _ in 0..times {
            self.queue.push(Instruction::KeyTap {
                key: "backspace".to_string(),
                delay: DEFAULT_KEY_DELAY,
            });
        }
    }

    /// Select the current line and erase it.
    pub fn delete_line(&mut self) {
        self.shortcut(&["ctrl".to_string(), "a".to_string()]);
        self.press("backspace");
    }

    /// Execute every queued instruction in order. With `drain` the queue is
    /// emptied afterwards; otherwise it stays for manual clearing. A failing
    /// instruction leaves the queue untouched.
    pub fn execute(&mut self, backend: &dyn InputBackend, drain: bool) -> Result<()> {
        for instruction in &self.queue {
            instruction.run(backend, None)?;
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
