//! Play state and core simulation types
//!
//! A play state owns its grid and player exclusively. Regenerating the maze
//! means building a new state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationProfile;
use crate::consts::{CELL_SIZE_3D, PLAYER_RADIUS_FRACTION};
use crate::maze::{CellPos, Direction, MazeGrid};

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Maze built, clock not running
    Idle,
    /// Active gameplay
    Playing,
    /// Finish reached; integration frozen
    Complete,
}

/// Events emitted by a tick, drained by the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Finish reached after `elapsed_ms` of play
    Completed { elapsed_ms: f64 },
}

/// Outcome of one integration step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// A wall (or the grid edge) corrected the movement this step
    pub blocked: bool,
    /// This step reached the finish
    pub completed: bool,
}

/// 2D player: a circle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player2d {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

/// 3D player velocity (units/s and radians/s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity3d {
    pub forward: f32,
    pub turn: f32,
}

/// 3D player on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player3d {
    pub x: f32,
    pub z: f32,
    /// Heading (radians); 0 faces -z
    pub rotation: f32,
    pub velocity: Velocity3d,
}

impl Player3d {
    pub fn ground_pos(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

/// 2D run state (fixed-rate ticks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayState2d {
    pub maze: MazeGrid,
    /// Pixel size of one cell
    pub cell_size: f32,
    pub player: Player2d,
    pub profile: CalibrationProfile,
    pub phase: Phase,
    /// Ticks spent playing
    pub time_ticks: u64,
    pub elapsed_ms: f64,
    /// Whether the last tick was corrected by a wall
    pub last_blocked: bool,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl PlayState2d {
    pub fn new(maze: MazeGrid, cell_size: f32, profile: CalibrationProfile) -> Self {
        let player = Player2d {
            pos: maze.cell_center(maze.start, cell_size),
            vel: Vec2::ZERO,
            radius: cell_size * PLAYER_RADIUS_FRACTION,
        };
        Self {
            maze,
            cell_size,
            player,
            profile,
            phase: Phase::Idle,
            time_ticks: 0,
            elapsed_ms: 0.0,
            last_blocked: false,
            events: Vec::new(),
        }
    }

    /// Start the clock
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Playing;
        }
    }

    /// Cell that owns the player's center
    pub fn player_cell(&self) -> Option<CellPos> {
        self.maze.cell_at(self.player.pos, self.cell_size)
    }

    pub fn at_finish(&self) -> bool {
        self.player_cell() == Some(self.maze.finish)
    }
}

/// 3D run state (wall-clock frames)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayState3d {
    pub maze: MazeGrid,
    pub player: Player3d,
    pub profile: CalibrationProfile,
    pub phase: Phase,
    pub elapsed_ms: f64,
    pub last_blocked: bool,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl PlayState3d {
    pub fn new(maze: MazeGrid, profile: CalibrationProfile) -> Self {
        let center = maze.cell_center(maze.start, CELL_SIZE_3D);
        // Face into the maze along the start cell's open side
        let rotation = if maze.has_wall(maze.start, Direction::Right) {
            std::f32::consts::PI
        } else {
            std::f32::consts::FRAC_PI_2
        };
        Self {
            maze,
            player: Player3d {
                x: center.x,
                z: center.y,
                rotation,
                velocity: Velocity3d::default(),
            },
            profile,
            phase: Phase::Idle,
            elapsed_ms: 0.0,
            last_blocked: false,
            events: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Playing;
        }
    }

    pub fn player_cell(&self) -> Option<CellPos> {
        self.maze.cell_at(self.player.ground_pos(), CELL_SIZE_3D)
    }

    pub fn at_finish(&self) -> bool {
        self.player_cell() == Some(self.maze.finish)
    }
}
