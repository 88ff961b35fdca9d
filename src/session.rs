//! Play sessions
//!
//! A session owns one grid, one player and one input queue. Platform
//! callbacks only push [`InputMessage`]s; the periodic loop (a fixed
//! interval for 2D, the display refresh for 3D) calls `tick`/`frame` with
//! the [`LoopHandle`] it was started with. Stopping or resetting bumps the
//! loop generation, so a leftover timer from an older loop is ignored and
//! two loops can never drive the same player.

use std::collections::VecDeque;
use std::fmt;

use crate::calibration::CalibrationProfile;
use crate::consts::CELL_SIZE_3D;
use crate::error::Result;
use crate::maze::MazeGrid;
use crate::settings::Difficulty;
use crate::sim::{
    ControlState, GameEvent, InputMessage, Phase, PlayState2d, PlayState3d, TickReport, tick_2d,
    update_3d,
};

/// Called once per completed run with the elapsed milliseconds
pub type CompletionCallback = Box<dyn FnMut(f64)>;

/// Token identifying one running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopHandle {
    generation: u64,
}

/// Maze shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MazeConfig {
    pub rows: usize,
    pub cols: usize,
    pub loop_factor: f32,
}

impl MazeConfig {
    pub fn square(size: usize, loop_factor: f32) -> Self {
        Self {
            rows: size,
            cols: size,
            loop_factor,
        }
    }

    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self::square(difficulty.size(), difficulty.loop_factor())
    }

    fn build(&self, seed: u64) -> Result<MazeGrid> {
        MazeGrid::generate_seeded(self.rows, self.cols, self.loop_factor, seed)
    }
}

#[derive(Debug, Default)]
struct LoopGuard {
    generation: u64,
    running: bool,
}

impl LoopGuard {
    fn begin(&mut self) -> LoopHandle {
        self.generation += 1;
        self.running = true;
        LoopHandle {
            generation: self.generation,
        }
    }

    fn stop(&mut self) {
        self.generation += 1;
        self.running = false;
    }

    fn admits(&self, handle: LoopHandle) -> bool {
        self.running && handle.generation == self.generation
    }
}

/// Drain completion events into the callback; returns true if one fired
fn emit_events(events: &mut Vec<GameEvent>, on_complete: &mut Option<CompletionCallback>) -> bool {
    let mut fired = false;
    for event in events.drain(..) {
        match event {
            GameEvent::Completed { elapsed_ms } => {
                if let Some(cb) = on_complete.as_mut() {
                    cb(elapsed_ms);
                }
                fired = true;
            }
        }
    }
    fired
}

/// Top-down session on a fixed 60 Hz tick
pub struct Session2d {
    config: MazeConfig,
    cell_size: f32,
    profile: CalibrationProfile,
    state: PlayState2d,
    controls: ControlState,
    queue: VecDeque<InputMessage>,
    guard: LoopGuard,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for Session2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session2d")
            .field("config", &self.config)
            .field("cell_size", &self.cell_size)
            .field("phase", &self.state.phase)
            .field("running", &self.guard.running)
            .finish()
    }
}

impl Session2d {
    /// Build a session; invalid dimensions are rejected before any play
    pub fn new(
        config: MazeConfig,
        cell_size: f32,
        profile: CalibrationProfile,
        seed: u64,
    ) -> Result<Self> {
        let maze = config.build(seed)?;
        log::info!(
            "2D session: {}x{} maze, cell {:.1}px, seed {}",
            config.rows,
            config.cols,
            cell_size,
            seed
        );
        Ok(Self {
            config,
            cell_size,
            profile,
            state: PlayState2d::new(maze, cell_size, profile),
            controls: ControlState::new(),
            queue: VecDeque::new(),
            guard: LoopGuard::default(),
            on_complete: None,
        })
    }

    /// Session for a difficulty preset on a square board of `board_px`
    pub fn for_difficulty(
        difficulty: Difficulty,
        board_px: f32,
        profile: CalibrationProfile,
        seed: u64,
    ) -> Result<Self> {
        let config = MazeConfig::from_difficulty(difficulty);
        Self::new(config, board_px / config.cols as f32, profile, seed)
    }

    pub fn on_complete(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn state(&self) -> &PlayState2d {
        &self.state
    }

    pub fn maze(&self) -> &MazeGrid {
        &self.state.maze
    }

    pub fn is_running(&self) -> bool {
        self.guard.running
    }

    /// Start (or restart) the loop; earlier handles stop working.
    /// None once the run is complete: call [`reset`](Self::reset) first.
    pub fn start(&mut self) -> Option<LoopHandle> {
        if self.state.phase == Phase::Complete {
            log::warn!("2D session already complete; reset before starting");
            return None;
        }
        self.state.start();
        Some(self.guard.begin())
    }

    /// Queue an input event for the next tick
    pub fn push_input(&mut self, msg: InputMessage) {
        self.queue.push_back(msg);
    }

    /// Loop callback. Returns None when `handle` no longer owns the session.
    pub fn tick(&mut self, handle: LoopHandle) -> Option<TickReport> {
        if !self.guard.admits(handle) {
            return None;
        }

        for msg in self.queue.drain(..) {
            self.controls.apply(msg);
        }
        let control = self.controls.take(&self.profile);
        let report = tick_2d(&mut self.state, &control);

        if emit_events(&mut self.state.events, &mut self.on_complete) {
            self.guard.stop();
        }
        Some(report)
    }

    /// Abort from the UI: the loop stops before this returns
    pub fn back(&mut self) {
        self.guard.stop();
        self.queue.clear();
        self.controls.clear();
        log::info!("2D session stopped");
    }

    /// Hard reset: stop the loop, regenerate the grid, fresh player
    pub fn reset(&mut self, seed: u64) -> Result<()> {
        self.back();
        let maze = self.config.build(seed)?;
        self.state = PlayState2d::new(maze, self.cell_size, self.profile);
        log::info!("2D session reset with seed {}", seed);
        Ok(())
    }

    /// Swap in a new calibration (takes effect next tick)
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = profile;
        self.state.profile = profile;
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }
}

/// First-person session driven by display frames
pub struct Session3d {
    config: MazeConfig,
    profile: CalibrationProfile,
    state: PlayState3d,
    controls: ControlState,
    queue: VecDeque<InputMessage>,
    guard: LoopGuard,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for Session3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session3d")
            .field("config", &self.config)
            .field("phase", &self.state.phase)
            .field("running", &self.guard.running)
            .finish()
    }
}

impl Session3d {
    pub fn new(config: MazeConfig, profile: CalibrationProfile, seed: u64) -> Result<Self> {
        let maze = config.build(seed)?;
        log::info!(
            "3D session: {}x{} maze, cell {} units, seed {}",
            config.rows,
            config.cols,
            CELL_SIZE_3D,
            seed
        );
        Ok(Self {
            config,
            profile,
            state: PlayState3d::new(maze, profile),
            controls: ControlState::new(),
            queue: VecDeque::new(),
            guard: LoopGuard::default(),
            on_complete: None,
        })
    }

    pub fn for_difficulty(
        difficulty: Difficulty,
        profile: CalibrationProfile,
        seed: u64,
    ) -> Result<Self> {
        Self::new(MazeConfig::from_difficulty(difficulty), profile, seed)
    }

    pub fn on_complete(&mut self, callback: impl FnMut(f64) + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn state(&self) -> &PlayState3d {
        &self.state
    }

    pub fn maze(&self) -> &MazeGrid {
        &self.state.maze
    }

    pub fn is_running(&self) -> bool {
        self.guard.running
    }

    pub fn start(&mut self) -> Option<LoopHandle> {
        if self.state.phase == Phase::Complete {
            log::warn!("3D session already complete; reset before starting");
            return None;
        }
        self.state.start();
        Some(self.guard.begin())
    }

    pub fn push_input(&mut self, msg: InputMessage) {
        self.queue.push_back(msg);
    }

    /// Display-refresh callback with the frame's `dt` in seconds
    pub fn frame(&mut self, handle: LoopHandle, dt: f32) -> Option<TickReport> {
        if !self.guard.admits(handle) {
            return None;
        }

        for msg in self.queue.drain(..) {
            self.controls.apply(msg);
        }
        let control = self.controls.take(&self.profile);
        let report = update_3d(&mut self.state, &control, dt);

        if emit_events(&mut self.state.events, &mut self.on_complete) {
            self.guard.stop();
        }
        Some(report)
    }

    pub fn back(&mut self) {
        self.guard.stop();
        self.queue.clear();
        self.controls.clear();
        log::info!("3D session stopped");
    }

    pub fn reset(&mut self, seed: u64) -> Result<()> {
        self.back();
        let maze = self.config.build(seed)?;
        self.state = PlayState3d::new(maze, self.profile);
        log::info!("3D session reset with seed {}", seed);
        Ok(())
    }

    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = profile;
        self.state.profile = profile;
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }
}
