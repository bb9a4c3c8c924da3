//! Primitive input actions.
//!
//! Every scripted command lowers to one of these variants. A variant carries
//! only data; execution is the single dispatch in [`Instruction::run`], so a
//! new action extends one enum and one match.

use crate::backend::{InputBackend, MouseButton};
use crate::motion::MotionSynthesizer;
use crate::screen::Point;
use anyhow::Result;

/// Delay after a tapped key, seconds.
pub const DEFAULT_KEY_DELAY: f64 = 0.02;
/// Delay between typed characters, seconds.
pub const DEFAULT_TYPE_INTERVAL: f64 = 0.02;
/// Delay between consecutive path points, seconds.
pub const DEFAULT_STEP_DURATION: f64 = 0.02;
/// Duration of a queued pointer move, seconds.
pub const DEFAULT_MOVE_DURATION: f64 = 0.1;

/// One queued action. Immutable; owned by its queue until executed.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Move { target: Point, duration: f64 },
    Click { button: MouseButton },
    Wait { seconds: f64 },
    Path { points: Vec<Point>, step_duration: f64 },
    KeyTap { key: String, delay: f64 },
    KeyDown { key: String },
    KeyUp { key: String },
    TypeText { text: String, interval: f64 },
    Shortcut { keys: Vec<String> },
}

impl Instruction {
    /// Variant label for queue inspection.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Move { .. } => "Move",
            Instruction::Click { .. } => "Click",
            Instruction::Wait { .. } => "Wait",
            Instruction::Path { .. } => "Path",
            Instruction::KeyTap { .. } => "KeyTap",
            Instruction::KeyDown { .. } => "KeyDown",
            Instruction::KeyUp { .. } => "KeyUp",
            Instruction::TypeText { .. } => "TypeText",
            Instruction::Shortcut { .. } => "Shortcut",
        }
    }

    /// Execute against the backend. Side effects are input events and sleeps.
    ///
    /// `motion` shapes `Move` trajectories; a queue that never holds pointer
    /// motion passes `None`, and a `Move` executed without a synthesizer
    /// degrades to a direct jump held for its duration.
    pub fn run(
        &self,
        backend: &dyn InputBackend,
        motion: Option<&mut MotionSynthesizer>,
    ) -> Result<()> {
        match self {
            Instruction::Move { target, duration } => match motion {
                Some(synth) => synth.move_to(backend, *target, Some(*duration), None),
                None => {
                    backend.move_pointer_to(*target)?;
                    backend.sleep(*duration);
                    Ok(())
                }
            },
            Instruction::Click { button } => backend.press_button(*button),
            Instruction::Wait { seconds } => {
                backend.sleep(*seconds);
                Ok(())
            }
            Instruction::Path {
                points,
                step_duration,
            } => {
                for p in points {
                    backend.move_pointer_to(*p)?;
                    backend.sleep(*step_duration);
                }
                Ok(())
            }
            Instruction::KeyTap { key, delay } => {
                backend.key_down(key)?;
                backend.key_up(key)?;
                backend.sleep(*delay);
                Ok(())
            }
            Instruction::KeyDown { key } => backend.key_down(key),
            Instruction::KeyUp { key } => backend.key_up(key),
            Instruction::TypeText { text, interval } => backend.type_text(text, *interval),
            Instruction::Shortcut { keys } => backend.hotkey(keys),
        }
    }
}
