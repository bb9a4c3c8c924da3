//! Session wiring and the JSON drive protocol.

use crate::backend::{InputBackend, MouseButton};
use crate::instruction::DEFAULT_TYPE_INTERVAL;
use crate::keyboard::KeyboardController;
use crate::monitor::ActivityMonitor;
use crate::mouse::MouseController;
use crate::parser::{ActionParser, ScriptError};
use crate::screen::{Point, ScreenMap};
use crate::settings::Settings;
use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

/// Monitor, device controllers and parser wired against one backend.
pub struct DriverSession {
    backend: Arc<dyn InputBackend>,
    monitor: Arc<ActivityMonitor>,
    parser: ActionParser,
}

impl DriverSession {
    pub fn new(settings: &Settings, backend: Arc<dyn InputBackend>) -> Result<Self> {
        let (width, height) = backend.screen_size()?;

        let monitor = if settings.track_mouse {
            ActivityMonitor::with_sampler(
                settings.max_mouse_history,
                settings.max_action_history,
                Arc::clone(&backend),
                Duration::from_millis(settings.sample_interval_ms),
            )
        } else {
            ActivityMonitor::new(settings.max_mouse_history, settings.max_action_history)
        };

        let keyboard = KeyboardController::new(Arc::clone(&monitor));
        let mouse = MouseController::new(
            Arc::clone(&monitor),
            ScreenMap::new(width, height),
            settings.motion.clone(),
        );
        let parser = ActionParser::new(keyboard, mouse, Arc::clone(&monitor));

        Ok(Self {
            backend,
            monitor,
            parser,
        })
    }

    pub fn monitor(&self) -> &Arc<ActivityMonitor> {
        &self.monitor
    }

    pub fn parser(&self) -> &ActionParser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut ActionParser {
        &mut self.parser
    }

    /// Parse a script into the device queues without executing anything.
    pub fn parse(&mut self, script: &str) -> Result<(), ScriptError> {
        self.parser.parse(script)
    }

    /// Execute the keyboard queue, then the mouse queue. Cross-device order
    /// is a caller decision; this is the one the CLI makes. On a fault the
    /// failing queue keeps its instructions.
    pub fn execute_queues(&mut self, drain: bool) -> Result<()> {
        let keyboard_pending = self.parser.keyboard().len();
        let mouse_pending = self.parser.mouse().len();
        tracing::info!(keyboard_pending, mouse_pending, "executing queues");

        let backend = Arc::clone(&self.backend);
        self.parser.keyboard_mut().execute(backend.as_ref(), drain)?;
        self.parser.mouse_mut().execute(backend.as_ref(), drain)
    }

    /// Parse and execute in one step, draining both queues.
    pub fn run_script(&mut self, script: &str) -> Result<()> {
        self.parse(script)?;
        self.execute_queues(true)
    }

    /// Stop the background sampler.
    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }
}

/// One line of the drive protocol.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DriveCommand {
    MoveMouse {
        x: i32,
        y: i32,
    },
    Click {
        x: i32,
        y: i32,
        #[serde(default)]
        button: MouseButton,
    },
    Type {
        text: String,
    },
    Ping,
}

/// Execute a drive command immediately, without queueing.
pub fn apply_drive_command(backend: &dyn InputBackend, command: &DriveCommand) -> Result<()> {
    match command {
        DriveCommand::MoveMouse { x, y } => backend.move_pointer_to(Point::new(*x, *y)),
        DriveCommand::Click { x, y, button } => {
            backend.move_pointer_to(Point::new(*x, *y))?;
            backend.press_button(*button)
        }
        DriveCommand::Type { text } => backend.type_text(text, DEFAULT_TYPE_INTERVAL),
        DriveCommand::Ping => Ok(()),
    }
}

/// Serve newline-delimited JSON commands until the input ends. Every line is
/// answered with a status object; a malformed or failing command reports an
/// error and the loop continues.
pub fn drive_loop(
    backend: &dyn InputBackend,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let outcome = serde_json::from_str::<DriveCommand>(&line)
            .map_err(anyhow::Error::from)
            .and_then(|command| apply_drive_command(backend, &command));

        let reply = match outcome {
            Ok(()) => json!({ "status": "ok" }),
            Err(e) => json!({ "status": "error", "error": e.to_string() }),
        };
        writeln!(output, "{reply}")?;
        output.flush()?;
    }
    Ok(())
}
