//! Line-oriented action script parser.
//!
//! One command per line, `#` comments and blank lines ignored, shell-style
//! tokenization so quoted text survives as a single token. Each successfully
//! tokenized line is recorded on the monitor before dispatch; the first
//! malformed line aborts the whole script with a [`ScriptError`] and nothing
//! already applied is rolled back.
//!
//! Command set:
//!
//! | Command | Effect |
//! |---|---|
//! | `TYPE text...` | queue literal typing (tokens joined with spaces) |
//! | `ENTER` | queue an enter tap |
//! | `PRESS key` / `HOLD key` / `RELEASE key` | queue tap / key down / key up |
//! | `SHORTCUT k1 k2...` | queue a chord |
//! | `MOVE x y [dur]` | queue an absolute pointer move |
//! | `MOVE_N nx ny` | queue a move to normalized coordinates |
//! | `CLICK button` | queue a click (`left`, `right`, `middle`) |
//! | `CLICK_N nx ny` | queue move to normalized coordinates plus left click |
//! | `LINE x1 y1 x2 y2 [STEPS n]` | queue an interpolated straight path |
//! | `PATH x1 y1 x2 y2 ...` | queue a polyline path through the pairs |
//! | `WAIT seconds` | queue a pause on both device queues |

use crate::backend::MouseButton;
use crate::instruction::{DEFAULT_MOVE_DURATION, DEFAULT_STEP_DURATION};
use crate::keyboard::KeyboardController;
use crate::monitor::{ActivityMonitor, EventSource};
use crate::mouse::MouseController;
use crate::screen::Point;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use std::sync::Arc;

const LINE_DEFAULT_STEPS: usize = 50;
const PATH_STEPS_PER_SEGMENT: usize = 30;

/// A script rejected at a specific line. Lines before it have already been
/// applied; none of their side effects are undone.
#[derive(Debug, thiserror::Error)]
#[error("script line {line}: `{text}`: {cause}")]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    /// The offending line, trimmed.
    pub text: String,
    pub cause: anyhow::Error,
}

/// Translates script text into queued instructions and monitor records.
pub struct ActionParser {
    keyboard: KeyboardController,
    mouse: MouseController,
    monitor: Arc<ActivityMonitor>,
}

impl ActionParser {
    pub fn new(
        keyboard: KeyboardController,
        mouse: MouseController,
        monitor: Arc<ActivityMonitor>,
    ) -> Self {
        Self {
            keyboard,
            mouse,
            monitor,
        }
    }

    pub fn keyboard(&self) -> &KeyboardController {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardController {
        &mut self.keyboard
    }

    pub fn mouse(&self) -> &MouseController {
        &self.mouse
    }

    pub fn mouse_mut(&mut self) -> &mut MouseController {
        &mut self.mouse
    }

    /// Parse a whole script, enqueueing as it goes. Fails fast on the first
    /// bad line.
    pub fn parse(&mut self, script: &str) -> Result<(), ScriptError> {
        for (index, raw) in script.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.parse_line(line).map_err(|cause| ScriptError {
                line: index + 1,
                text: line.to_string(),
                cause,
            })?;
        }
        Ok(())
    }

    fn parse_line(&mut self, line: &str) -> Result<()> {
        let tokens = shlex::split(line).ok_or_else(|| anyhow!("unbalanced quoting"))?;
        let Some(first) = tokens.first() else {
            return Ok(());
        };
        let cmd = first.to_uppercase();

        self.monitor
            .record_action(EventSource::Parser, &cmd, json!({ "tokens": tokens }));

        match cmd.as_str() {
            "TYPE" => self.kbd_type(&tokens),
            "ENTER" => {
                self.keyboard.enter();
                Ok(())
            }
            "PRESS" => self.kbd_press(&tokens),
            "HOLD" => self.kbd_hold(&tokens),
            "RELEASE" => self.kbd_release(&tokens),
            "SHORTCUT" => self.kbd_shortcut(&tokens),
            "MOVE" => self.mouse_move(&tokens),
            "MOVE_N" => self.mouse_move_normalized(&tokens),
            "CLICK" => self.mouse_click(&tokens),
            "CLICK_N" => self.mouse_click_normalized(&tokens),
            "LINE" => self.mouse_line(&tokens),
            "PATH" => self.mouse_path(&tokens),
            "WAIT" => self.wait(&tokens),
            other => bail!("unknown command: {other}"),
        }
    }

    fn kbd_type(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() < 2 {
            bail!("TYPE requires text");
        }
        let text = tokens[1..].join(" ");
        self.keyboard.type_text(&text);
        Ok(())
    }

    fn kbd_press(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 2 {
            bail!("PRESS key");
        }
        self.keyboard.press(&tokens[1]);
        Ok(())
    }

    fn kbd_hold(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 2 {
            bail!("HOLD key");
        }
        self.keyboard.hold(&tokens[1]);
        Ok(())
    }

    fn kbd_release(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 2 {
            bail!("RELEASE key");
        }
        self.keyboard.release(&tokens[1]);
        Ok(())
    }

    fn kbd_shortcut(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() < 2 {
            bail!("SHORTCUT key1 key2 ...");
        }
        self.keyboard.shortcut(&tokens[1..]);
        Ok(())
    }

    fn mouse_move(&mut self, tokens: &[String]) -> Result<()> {
        if !(3..=4).contains(&tokens.len()) {
            bail!("MOVE x y [duration]");
        }
        let x = parse_i32(&tokens[1], "x")?;
        let y = parse_i32(&tokens[2], "y")?;
        let duration = match tokens.get(3) {
            Some(t) => parse_f64(t, "duration")?,
            None => DEFAULT_MOVE_DURATION,
        };
        self.mouse.queue_move(x, y, duration);
        Ok(())
    }

    fn mouse_move_normalized(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 3 {
            bail!("MOVE_N nx ny");
        }
        let nx = parse_f64(&tokens[1], "nx")?;
        let ny = parse_f64(&tokens[2], "ny")?;
        let p = self.mouse.map_normalized(nx, ny);
        self.mouse.queue_move(p.x, p.y, DEFAULT_MOVE_DURATION);
        Ok(())
    }

    fn mouse_click(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 2 {
            bail!("CLICK button");
        }
        let button: MouseButton = tokens[1].parse()?;
        self.mouse.queue_click(button);
        Ok(())
    }

    // Clicking at a normalized position is a move plus a left click. The
    // button slot stays a button; coordinates never masquerade as one.
    fn mouse_click_normalized(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 3 {
            bail!("CLICK_N nx ny");
        }
        let nx = parse_f64(&tokens[1], "nx")?;
        let ny = parse_f64(&tokens[2], "ny")?;
        let p = self.mouse.map_normalized(nx, ny);
        self.mouse.queue_move(p.x, p.y, DEFAULT_MOVE_DURATION);
        self.mouse.queue_click(MouseButton::Left);
        Ok(())
    }

    fn mouse_line(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() < 5 {
            bail!("LINE x1 y1 x2 y2 [STEPS n]");
        }
        let x1 = parse_i32(&tokens[1], "x1")?;
        let y1 = parse_i32(&tokens[2], "y1")?;
        let x2 = parse_i32(&tokens[3], "x2")?;
        let y2 = parse_i32(&tokens[4], "y2")?;

        let mut steps = LINE_DEFAULT_STEPS;
        if let Some(at) = tokens.iter().position(|t| t == "STEPS") {
            let count = tokens.get(at + 1).ok_or_else(|| anyhow!("STEPS requires a count"))?;
            steps = count
                .parse::<usize>()
                .with_context(|| format!("invalid step count '{count}'"))?;
        }

        let path = self
            .mouse
            .draw_line(Point::new(x1, y1), Point::new(x2, y2), steps);
        self.mouse.queue_path(path, DEFAULT_STEP_DURATION);
        Ok(())
    }

    fn mouse_path(&mut self, tokens: &[String]) -> Result<()> {
        if (tokens.len() - 1) % 2 != 0 {
            bail!("PATH requires an even number of coordinates");
        }
        let mut points = Vec::with_capacity((tokens.len() - 1) / 2);
        for pair in tokens[1..].chunks(2) {
            points.push(Point::new(
                parse_i32(&pair[0], "x")?,
                parse_i32(&pair[1], "y")?,
            ));
        }
        let path = self.mouse.draw_polyline(&points, PATH_STEPS_PER_SEGMENT);
        self.mouse.queue_path(path, DEFAULT_STEP_DURATION);
        Ok(())
    }

    fn wait(&mut self, tokens: &[String]) -> Result<()> {
        if tokens.len() != 2 {
            bail!("WAIT seconds");
        }
        let seconds = parse_f64(&tokens[1], "seconds")?;
        self.keyboard.wait(seconds);
        self.mouse.queue_wait(seconds);
        Ok(())
    }
}

fn parse_i32(token: &str, what: &str) -> Result<i32> {
    token
        .parse::<i32>()
        .with_context(|| format!("invalid {what} '{token}'"))
}

fn parse_f64(token: &str, what: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .with_context(|| format!("invalid {what} '{token}'"))
}
