//! Tilt Maze - maze game core
//!
//! Core modules:
//! - `maze`: Grid topology, randomized generation, shortest-path solving
//! - `sim`: Player physics (2D fixed tick, 3D wall-clock), collision, input
//! - `calibration`: Device-tilt calibration state machine and profile
//! - `session`: One play session (grid + player + input queue + loop handle)
//! - `persistence`: Key-value storage abstraction (LocalStorage on web)
//! - `platform`: Browser/native differences (clock, logger)
//! - `web`: JS bindings for the browser build (wasm32 only)

pub mod calibration;
pub mod error;
pub mod maze;
pub mod persistence;
pub mod platform;
pub mod records;
pub mod session;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use calibration::{CalibrationMachine, CalibrationProfile, CalibrationStatus};
pub use error::{MazeError, Result};
pub use maze::{CellPos, MazeGrid};
pub use records::BestTimes;
pub use session::{Session2d, Session3d};
pub use settings::{Difficulty, Settings};

/// Game configuration constants
pub mod consts {
    /// Fixed 2D simulation rate
    pub const TICK_HZ: f32 = 60.0;
    /// Milliseconds per 2D tick
    pub const TICK_MS: f64 = 1000.0 / 60.0;

    /// Tilt smoothing: v' = v * TILT_SMOOTHING + input * sensitivity
    pub const TILT_SMOOTHING: f32 = 0.9;
    /// Per-tick friction applied after collision
    pub const FRICTION: f32 = 0.95;
    /// Extra damping on the tick a touch drag is released
    pub const TOUCH_RELEASE_DAMPING: f32 = 0.8;

    /// Keyboard speed (pixels per tick at full deflection)
    pub const KEY_SPEED: f32 = 3.0;
    /// Touch drag speed (pixels per tick at full deflection)
    pub const TOUCH_SPEED: f32 = 5.0;
    /// Drag distance (pixels) mapped to full deflection
    pub const TOUCH_FULL_SCALE: f32 = 20.0;
    /// Tilt angle (degrees, after calibration) mapped to full deflection
    pub const TILT_FULL_SCALE_DEG: f32 = 30.0;

    /// Player radius as a fraction of cell size
    pub const PLAYER_RADIUS_FRACTION: f32 = 0.25;

    /// 3D wall clearance (world units)
    pub const WALL_MARGIN_3D: f32 = 0.5;
    /// 3D cell size (world units)
    pub const CELL_SIZE_3D: f32 = 4.0;
    /// 3D forward speed at full deflection (world units/s)
    pub const MOVE_SPEED_3D: f32 = 5.0;
    /// 3D turn rate at full deflection (radians/s)
    pub const TURN_SPEED_3D: f32 = 2.5;
    /// Longest frame the 3D integrator accepts (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
