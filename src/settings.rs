use crate::monitor::{DEFAULT_MAX_ACTION_HISTORY, DEFAULT_MAX_MOUSE_HISTORY};
use crate::motion::MotionProfile;
use serde::{Deserialize, Serialize};

/// Session configuration, loaded from a JSON file. Every field has a default
/// so a missing or partial file still yields a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Run the background pointer sampler.
    #[serde(default = "default_track_mouse")]
    pub track_mouse: bool,
    /// Bound on the pointer sample ring.
    #[serde(default = "default_mouse_history")]
    pub max_mouse_history: usize,
    /// Bound on the action event ring.
    #[serde(default = "default_action_history")]
    pub max_action_history: usize,
    /// Pointer sampling period in milliseconds.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
    /// Motion personality for queued pointer moves.
    #[serde(default)]
    pub motion: MotionProfile,
}

fn default_track_mouse() -> bool {
    true
}

fn default_mouse_history() -> usize {
    DEFAULT_MAX_MOUSE_HISTORY
}

fn default_action_history() -> usize {
    DEFAULT_MAX_ACTION_HISTORY
}

fn default_sample_interval() -> u64 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            track_mouse: default_track_mouse(),
            max_mouse_history: default_mouse_history(),
            max_action_history: default_action_history(),
            sample_interval_ms: default_sample_interval(),
            motion: MotionProfile::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
