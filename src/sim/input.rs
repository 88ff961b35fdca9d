//! Raw input events and their resolution into a bounded control vector
//!
//! Events arrive whenever the platform delivers them and are only ever
//! queued; the next tick folds them into a [`ControlState`] and takes one
//! [`ControlVector`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;
use crate::consts::{TILT_FULL_SCALE_DEG, TOUCH_FULL_SCALE};

/// Device orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationSample {
    /// Front-back tilt
    pub beta: f32,
    /// Left-right tilt
    pub gamma: f32,
}

/// Finger movement since the previous touch sample (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TouchDelta {
    pub dx: f32,
    pub dy: f32,
}

/// Movement keys (arrows and WASD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" | "w" | "W" => Some(Key::Up),
            "ArrowDown" | "s" | "S" => Some(Key::Down),
            "ArrowLeft" | "a" | "A" => Some(Key::Left),
            "ArrowRight" | "d" | "D" => Some(Key::Right),
            _ => None,
        }
    }
}

/// Keys currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySet {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl KeySet {
    pub fn set(&mut self, key: Key, held: bool) {
        match key {
            Key::Up => self.up = held,
            Key::Down => self.down = held,
            Key::Left => self.left = held,
            Key::Right => self.right = held,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }

    /// Unit-bounded direction (+x right, +y down)
    pub fn direction(&self) -> Vec2 {
        let x = self.right as i8 - self.left as i8;
        let y = self.down as i8 - self.up as i8;
        Vec2::new(x as f32, y as f32)
    }
}

/// A queued input event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMessage {
    Orientation(OrientationSample),
    Touch(TouchDelta),
    TouchEnd,
    KeyDown(Key),
    KeyUp(Key),
}

/// Which device produced the control vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlSource {
    /// No input yet
    #[default]
    None,
    Tilt,
    Touch,
    Keys,
}

/// Normalized control for one tick; `x`/`y` lie in `[-1, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlVector {
    /// Right (+) / left (-); turn rate in 3D
    pub x: f32,
    /// Down (+) / up (-); backward (+) / forward (-) in 3D
    pub y: f32,
    pub source: ControlSource,
    /// New touch or key data this tick (direct sources set velocity only then)
    pub fresh: bool,
    /// A touch drag ended since the last tick
    pub released: bool,
}

impl ControlVector {
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// 3D forward deflection
    pub fn forward(&self) -> f32 {
        -self.y
    }

    /// 3D turn deflection
    pub fn turn(&self) -> f32 {
        self.x
    }
}

fn bounded(v: Vec2) -> Vec2 {
    v.clamp(Vec2::NEG_ONE, Vec2::ONE)
}

/// Latest input folded from queued events
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    source: ControlSource,
    tilt: Option<OrientationSample>,
    touch: Option<Vec2>,
    touch_released: bool,
    keys: KeySet,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> ControlSource {
        self.source
    }

    pub fn keys(&self) -> KeySet {
        self.keys
    }

    /// Fold one event; the most recent device becomes the active source
    pub fn apply(&mut self, msg: InputMessage) {
        match msg {
            InputMessage::Orientation(sample) => {
                if sample.beta.is_finite() && sample.gamma.is_finite() {
                    self.tilt = Some(sample);
                    self.source = ControlSource::Tilt;
                }
            }
            InputMessage::Touch(delta) => {
                let d = Vec2::new(delta.dx, delta.dy);
                if d.is_finite() {
                    *self.touch.get_or_insert(Vec2::ZERO) += d;
                    self.source = ControlSource::Touch;
                }
            }
            InputMessage::TouchEnd => {
                self.touch = None;
                self.touch_released = true;
                self.source = ControlSource::Touch;
            }
            InputMessage::KeyDown(key) => {
                self.keys.set(key, true);
                self.source = ControlSource::Keys;
            }
            InputMessage::KeyUp(key) => {
                self.keys.set(key, false);
            }
        }
    }

    /// Control for this tick. Touch deltas and the release flag are consumed.
    pub fn take(&mut self, profile: &CalibrationProfile) -> ControlVector {
        let mut out = ControlVector {
            source: self.source,
            ..Default::default()
        };

        match self.source {
            ControlSource::None => {}
            ControlSource::Tilt => {
                if let Some(sample) = self.tilt {
                    let v = bounded(profile.adjust(sample) / TILT_FULL_SCALE_DEG);
                    out.x = v.x;
                    out.y = v.y;
                }
            }
            ControlSource::Touch => {
                if let Some(delta) = self.touch.take() {
                    let v = bounded(delta / TOUCH_FULL_SCALE);
                    out.x = v.x;
                    out.y = v.y;
                    out.fresh = true;
                }
                out.released = std::mem::take(&mut self.touch_released);
            }
            ControlSource::Keys => {
                let v = self.keys.direction();
                out.x = v.x;
                out.y = v.y;
                out.fresh = self.keys.any();
            }
        }

        out
    }

    /// Drop everything (session reset)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_key_name("ArrowLeft"), Some(Key::Left));
        assert_eq!(Key::from_key_name("W"), Some(Key::Up));
        assert_eq!(Key::from_key_name("Enter"), None);
    }

    #[test]
    fn test_keys_resolve_to_unit_direction() {
        let mut state = ControlState::new();
        state.apply(InputMessage::KeyDown(Key::Right));
        state.apply(InputMessage::KeyDown(Key::Up));
        let c = state.take(&CalibrationProfile::default());
        assert_eq!(c.source, ControlSource::Keys);
        assert_eq!(c.as_vec2(), Vec2::new(1.0, -1.0));
        assert!(c.fresh);

        state.apply(InputMessage::KeyUp(Key::Right));
        state.apply(InputMessage::KeyUp(Key::Up));
        let c = state.take(&CalibrationProfile::default());
        assert_eq!(c.as_vec2(), Vec2::ZERO);
        assert!(!c.fresh);
    }

    #[test]
    fn test_touch_deltas_accumulate_and_clamp() {
        let mut state = ControlState::new();
        state.apply(InputMessage::Touch(TouchDelta { dx: 5.0, dy: 0.0 }));
        state.apply(InputMessage::Touch(TouchDelta { dx: 5.0, dy: -100.0 }));
        let c = state.take(&CalibrationProfile::default());
        assert_eq!(c.as_vec2(), Vec2::new(0.5, -1.0));
        assert!(c.fresh);

        // Nothing new since the last tick
        let c = state.take(&CalibrationProfile::default());
        assert!(!c.fresh);

        state.apply(InputMessage::TouchEnd);
        let c = state.take(&CalibrationProfile::default());
        assert!(c.released);
        assert!(!state.take(&CalibrationProfile::default()).released);
    }

    #[test]
    fn test_tilt_uses_profile() {
        let profile = CalibrationProfile {
            neutral_beta: 40.0,
            neutral_gamma: 0.0,
            deadzone: 0.0,
            ..Default::default()
        };
        let mut state = ControlState::new();
        state.apply(InputMessage::Orientation(OrientationSample {
            beta: 55.0,
            gamma: -60.0,
        }));
        let c = state.take(&profile);
        assert_eq!(c.source, ControlSource::Tilt);
        assert!((c.y - 0.5).abs() < 1e-6);
        assert_eq!(c.x, -1.0);
    }

    #[test]
    fn test_non_finite_samples_ignored() {
        let mut state = ControlState::new();
        state.apply(InputMessage::Orientation(OrientationSample {
            beta: f32::NAN,
            gamma: 0.0,
        }));
        assert_eq!(state.source(), ControlSource::None);
    }
}
