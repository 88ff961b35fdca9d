//! Player simulation
//!
//! All movement logic lives here. This module has no rendering or platform
//! dependencies:
//! - 2D: fixed 60 Hz tick
//! - 3D: wall-clock frame delta
//! - Input is folded from queued messages, never read mid-tick

pub mod collision;
pub mod input;
pub mod state;
pub mod tick;

pub use collision::{Resolution, resolve, resolve_margin};
pub use input::{
    ControlSource, ControlState, ControlVector, InputMessage, Key, KeySet, OrientationSample,
    TouchDelta,
};
pub use state::{
    GameEvent, Phase, PlayState2d, PlayState3d, Player2d, Player3d, TickReport, Velocity3d,
};
pub use tick::{tick_2d, update_3d};
