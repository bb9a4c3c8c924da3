//! Capability boundary to the OS input layer.
//!
//! The core shapes motion and sequences instructions; everything that touches
//! real input hardware goes through [`InputBackend`]. The Windows
//! implementation injects events with `SendInput`; other platforms get a
//! constructor error. Faults from these primitives are never caught in the
//! core and abort the operation that triggered them.

use crate::screen::Point;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// A pointer button, parsed from script text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl FromStr for MouseButton {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("left") {
            Ok(MouseButton::Left)
        } else if s.eq_ignore_ascii_case("right") {
            Ok(MouseButton::Right)
        } else if s.eq_ignore_ascii_case("middle") {
            Ok(MouseButton::Middle)
        } else {
            anyhow::bail!("unknown mouse button '{s}'")
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// Primitive input capabilities the core builds on.
///
/// Implementations must be callable from the sampler thread as well as the
/// executing thread, hence `Send + Sync`.
pub trait InputBackend: Send + Sync {
    /// Primary screen dimensions in pixels.
    fn screen_size(&self) -> Result<(i32, i32)>;

    /// Current pointer position.
    fn pointer_position(&self) -> Result<Point>;

    /// Jump the pointer to an absolute pixel position.
    fn move_pointer_to(&self, target: Point) -> Result<()>;

    /// Press and release a pointer button at the current position.
    fn press_button(&self, button: MouseButton) -> Result<()>;

    fn key_down(&self, key: &str) -> Result<()>;

    fn key_up(&self, key: &str) -> Result<()>;

    /// Type literal text with a fixed delay between characters.
    fn type_text(&self, text: &str, interval: f64) -> Result<()>;

    /// Press a chord: all keys down in order, released in reverse.
    fn hotkey(&self, keys: &[String]) -> Result<()>;

    fn sleep(&self, seconds: f64) {
        std::thread::sleep(Duration::from_secs_f64(seconds.max(0.0)));
    }
}

/// Construct the platform backend.
pub fn native_backend() -> Result<Arc<dyn InputBackend>> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(win::WinInput))
    }

    #[cfg(not(target_os = "windows"))]
    {
        anyhow::bail!("native input injection is only supported on Windows")
    }
}

#[cfg(target_os = "windows")]
mod win {
    use super::{InputBackend, MouseButton};
    use crate::screen::Point;
    use anyhow::Result;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
        MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
        MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXSCREEN, SM_CYSCREEN,
    };

    /// Script-facing key names and their virtual-key codes. Single letters,
    /// digits and `f1`..`f24` are resolved separately.
    static KEY_TABLE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
        HashMap::from([
            ("ctrl", 0x11),
            ("control", 0x11),
            ("shift", 0x10),
            ("alt", 0x12),
            ("win", 0x5B),
            ("enter", 0x0D),
            ("return", 0x0D),
            ("tab", 0x09),
            ("esc", 0x1B),
            ("escape", 0x1B),
            ("space", 0x20),
            ("backspace", 0x08),
            ("delete", 0x2E),
            ("del", 0x2E),
            ("insert", 0x2D),
            ("home", 0x24),
            ("end", 0x23),
            ("pageup", 0x21),
            ("pagedown", 0x22),
            ("up", 0x26),
            ("down", 0x28),
            ("left", 0x25),
            ("right", 0x27),
        ])
    });

    fn parse_vk(token: &str) -> Result<VIRTUAL_KEY> {
        let t = token.trim();
        if t.is_empty() {
            anyhow::bail!("empty key name");
        }

        if let Some(code) = KEY_TABLE.get(t.to_ascii_lowercase().as_str()) {
            return Ok(VIRTUAL_KEY(*code));
        }

        // f1..f24
        if let Some(rest) = t.strip_prefix('f').or_else(|| t.strip_prefix('F')) {
            if let Ok(n) = rest.parse::<u8>() {
                if (1..=24).contains(&n) {
                    return Ok(VIRTUAL_KEY(0x6F + n as u16));
                }
            }
        }

        if t.len() == 1 {
            let ch = t.chars().next().unwrap_or_default();
            if ch.is_ascii_alphabetic() {
                return Ok(VIRTUAL_KEY(ch.to_ascii_uppercase() as u16));
            }
            if ch.is_ascii_digit() {
                return Ok(VIRTUAL_KEY(ch as u16));
            }
        }

        anyhow::bail!("unknown key name '{t}'")
    }

    fn send_vk(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> Result<()> {
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            anyhow::bail!("SendInput returned 0");
        }
        Ok(())
    }

    fn send_mouse_flags(flags: MOUSE_EVENT_FLAGS) -> Result<()> {
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: 0,
                    dy: 0,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            anyhow::bail!("SendInput returned 0");
        }
        Ok(())
    }

    fn send_unicode(code: u16, up: bool) -> Result<()> {
        let mut flags = KEYEVENTF_UNICODE;
        if up {
            flags = KEYBD_EVENT_FLAGS(flags.0 | KEYEVENTF_KEYUP.0);
        }
        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: code,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 {
            anyhow::bail!("SendInput returned 0");
        }
        Ok(())
    }

    pub struct WinInput;

    impl InputBackend for WinInput {
        fn screen_size(&self) -> Result<(i32, i32)> {
            let w = unsafe { GetSystemMetrics(SM_CXSCREEN) };
            let h = unsafe { GetSystemMetrics(SM_CYSCREEN) };
            if w <= 0 || h <= 0 {
                anyhow::bail!("GetSystemMetrics reported a {w}x{h} screen");
            }
            Ok((w, h))
        }

        fn pointer_position(&self) -> Result<Point> {
            let mut p = POINT::default();
            unsafe { GetCursorPos(&mut p)? };
            Ok(Point::new(p.x, p.y))
        }

        fn move_pointer_to(&self, target: Point) -> Result<()> {
            unsafe { SetCursorPos(target.x, target.y)? };
            Ok(())
        }

        fn press_button(&self, button: MouseButton) -> Result<()> {
            let (down, up) = match button {
                MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
                MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
                MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
            };
            send_mouse_flags(down)?;
            send_mouse_flags(up)
        }

        fn key_down(&self, key: &str) -> Result<()> {
            send_vk(parse_vk(key)?, KEYBD_EVENT_FLAGS(0))
        }

        fn key_up(&self, key: &str) -> Result<()> {
            send_vk(parse_vk(key)?, KEYEVENTF_KEYUP)
        }

        fn type_text(&self, text: &str, interval: f64) -> Result<()> {
            for ch in text.chars() {
                let code = ch as u16;
                send_unicode(code, false)?;
                send_unicode(code, true)?;
                self.sleep(interval);
            }
            Ok(())
        }

        fn hotkey(&self, keys: &[String]) -> Result<()> {
            let vks: Vec<VIRTUAL_KEY> = keys
                .iter()
                .map(|k| parse_vk(k))
                .collect::<Result<Vec<_>>>()?;

            for &vk in &vks {
                send_vk(vk, KEYBD_EVENT_FLAGS(0))?;
            }
            for &vk in vks.iter().rev() {
                send_vk(vk, KEYEVENTF_KEYUP)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_button_parses_case_insensitively() {
        assert_eq!("left".parse::<MouseButton>().unwrap(), MouseButton::Left);
        assert_eq!("RIGHT".parse::<MouseButton>().unwrap(), MouseButton::Right);
        assert_eq!("Middle".parse::<MouseButton>().unwrap(), MouseButton::Middle);
        assert!("double".parse::<MouseButton>().is_err());
    }

    #[test]
    fn mouse_button_round_trips_through_display() {
        for button in [MouseButton::Left, MouseButton::Right, MouseButton::Middle] {
            assert_eq!(button.to_string().parse::<MouseButton>().unwrap(), button);
        }
    }
}
