//! Player settings and difficulty presets
//!
//! Persisted separately from calibration and best times.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{KeyValueStore, load_json, save_json};

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
    Extreme,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
            Difficulty::Extreme => "extreme",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            "extreme" => Some(Difficulty::Extreme),
            _ => None,
        }
    }

    /// Grid side length (cells)
    pub fn size(&self) -> usize {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 15,
            Difficulty::Hard => 25,
            Difficulty::Expert => 35,
            Difficulty::Extreme => 50,
        }
    }

    /// Fraction of cells that get an extra opening
    pub fn loop_factor(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.05,
            Difficulty::Medium => 0.08,
            Difficulty::Hard => 0.10,
            Difficulty::Expert => 0.12,
            Difficulty::Extreme => 0.15,
        }
    }
}

/// How the player steers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControlMode {
    /// Device orientation (needs calibration)
    Tilt,
    /// Drag on screen
    Touch,
    #[default]
    Keyboard,
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub control_mode: ControlMode,
    /// First-person view instead of top-down
    pub view_3d: bool,
    /// Show the running clock
    #[serde(default = "default_true")]
    pub show_timer: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Easy,
            control_mode: ControlMode::Keyboard,
            view_3d: false,
            show_timer: true,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "maze_settings";

    /// Fall back to keyboard after tilt permission was refused
    pub fn tilt_denied(&mut self) {
        if self.control_mode == ControlMode::Tilt {
            log::info!("Tilt unavailable, switching to keyboard control");
            self.control_mode = ControlMode::Keyboard;
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json(store, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_presets() {
        assert_eq!(Difficulty::Easy.size(), 10);
        assert_eq!(Difficulty::Easy.loop_factor(), 0.05);
        assert_eq!(Difficulty::Extreme.size(), 50);
        assert_eq!(Difficulty::Extreme.loop_factor(), 0.15);
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("nightmare"), None);
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            difficulty: Difficulty::Expert,
            control_mode: ControlMode::Tilt,
            view_3d: true,
            show_timer: false,
        };
        settings.save(&mut store).unwrap();
        let loaded = Settings::load(&store);
        assert_eq!(loaded.difficulty, Difficulty::Expert);
        assert_eq!(loaded.control_mode, ControlMode::Tilt);
        assert!(loaded.view_3d);
        assert!(!loaded.show_timer);
    }

    #[test]
    fn test_tilt_denied_switches_mode() {
        let mut settings = Settings {
            control_mode: ControlMode::Tilt,
            ..Default::default()
        };
        settings.tilt_denied();
        assert_eq!(settings.control_mode, ControlMode::Keyboard);
    }
}
