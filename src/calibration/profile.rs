//! Calibration profile
//!
//! Persisted separately from settings. A profile older than
//! [`PROFILE_VALIDITY_MS`] is ignored and the defaults are used instead.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{KeyValueStore, load_json, save_json};
use crate::sim::input::OrientationSample;

/// 24 hours
pub const PROFILE_VALIDITY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

pub const DEFAULT_SENSITIVITY: f32 = 1.0;
pub const DEFAULT_DEADZONE_DEG: f32 = 2.0;

pub const MIN_SENSITIVITY: f32 = 0.1;
pub const MAX_SENSITIVITY: f32 = 3.0;
pub const MAX_DEADZONE_DEG: f32 = 15.0;

/// Neutral orientation plus gain and deadzone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationProfile {
    /// Front-back tilt at rest (degrees)
    pub neutral_beta: f32,
    /// Left-right tilt at rest (degrees)
    pub neutral_gamma: f32,
    /// Scalar gain applied to de-biased tilt
    pub sensitivity: f32,
    /// Band around neutral treated as zero (degrees)
    pub deadzone: f32,
    /// Unix timestamp (ms) when calibrated
    pub timestamp: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            neutral_beta: 0.0,
            neutral_gamma: 0.0,
            sensitivity: DEFAULT_SENSITIVITY,
            deadzone: DEFAULT_DEADZONE_DEG,
            timestamp: 0.0,
        }
    }
}

/// Zero inside `±deadzone`, shifted toward zero by `deadzone` outside it
#[inline]
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() > deadzone {
        value - value.signum() * deadzone
    } else {
        0.0
    }
}

impl CalibrationProfile {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "maze_calibration";

    /// True while younger than the validity window. Timestamps in the future
    /// (clock changed since calibrating) count as stale.
    pub fn is_fresh(&self, now_ms: f64) -> bool {
        let age = now_ms - self.timestamp;
        (0.0..PROFILE_VALIDITY_MS).contains(&age)
    }

    /// De-biased, deadzoned tilt in degrees: x from gamma, y from beta
    pub fn adjust(&self, sample: OrientationSample) -> Vec2 {
        Vec2::new(
            apply_deadzone(sample.gamma - self.neutral_gamma, self.deadzone),
            apply_deadzone(sample.beta - self.neutral_beta, self.deadzone),
        )
    }

    /// [`adjust`](Self::adjust) scaled by sensitivity
    pub fn scaled(&self, sample: OrientationSample) -> Vec2 {
        self.adjust(sample) * self.sensitivity
    }

    /// Pull gain and deadzone back inside the slider ranges; non-finite
    /// values fall back to the defaults
    pub fn sanitized(mut self) -> Self {
        self.sensitivity = if self.sensitivity.is_finite() {
            self.sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
        } else {
            DEFAULT_SENSITIVITY
        };
        self.deadzone = if self.deadzone.is_finite() {
            self.deadzone.clamp(0.0, MAX_DEADZONE_DEG)
        } else {
            DEFAULT_DEADZONE_DEG
        };
        if !self.neutral_beta.is_finite() || !self.neutral_gamma.is_finite() {
            self.neutral_beta = 0.0;
            self.neutral_gamma = 0.0;
        }
        self
    }

    /// Load a fresh profile, falling back to defaults when missing or stale
    pub fn load(store: &dyn KeyValueStore, now_ms: f64) -> Self {
        match load_json::<CalibrationProfile>(store, Self::STORAGE_KEY) {
            Some(profile) if profile.is_fresh(now_ms) => {
                let profile = profile.sanitized();
                log::info!(
                    "Loaded calibration (neutral beta {:.1}, gamma {:.1})",
                    profile.neutral_beta,
                    profile.neutral_gamma
                );
                profile
            }
            Some(_) => {
                log::info!("Calibration expired, using defaults");
                Self::default()
            }
            None => {
                log::info!("No calibration found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Calibration saved");
        Ok(())
    }
}
