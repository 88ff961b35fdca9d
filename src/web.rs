//! Browser bindings
//!
//! JS owns the timers and DOM listeners; it forwards events into these
//! wrappers and drives `tick`/`frame` from `setInterval` and
//! `requestAnimationFrame`. Everything persisted goes through LocalStorage,
//! or an in-memory store when LocalStorage is unavailable.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::calibration::{CalibrationMachine, CalibrationProfile, PermissionOutcome, SamplingTicket};
use crate::error::MazeError;
use crate::maze::{CellPos, Direction, MazeGrid};
use crate::persistence::{KeyValueStore, LocalStore, MemoryStore};
use crate::platform;
use crate::records::{self, BestTimes};
use crate::session::{LoopHandle, Session2d, Session3d};
use crate::settings::{Difficulty, Settings};
use crate::sim::{InputMessage, Key, OrientationSample, Phase, TouchDelta};

#[wasm_bindgen(start)]
pub fn wasm_start() {
    platform::init_logging();
    log::info!("Tilt Maze (web) starting...");
}

fn open_store() -> Box<dyn KeyValueStore> {
    match LocalStore::open() {
        Some(store) => Box::new(store),
        None => {
            log::warn!("LocalStorage unavailable, progress will not be kept");
            Box::new(MemoryStore::new())
        }
    }
}

fn js_error(e: MazeError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

enum View {
    TopDown(Session2d),
    FirstPerson(Session3d),
}

impl View {
    fn maze(&self) -> &MazeGrid {
        match self {
            View::TopDown(s) => s.maze(),
            View::FirstPerson(s) => s.maze(),
        }
    }

    fn phase(&self) -> Phase {
        match self {
            View::TopDown(s) => s.phase(),
            View::FirstPerson(s) => s.phase(),
        }
    }
}

/// One maze run, top-down or first-person
#[wasm_bindgen]
pub struct MazeGame {
    view: View,
    handle: Option<LoopHandle>,
    difficulty: Difficulty,
    store: Box<dyn KeyValueStore>,
    best: BestTimes,
    finished: Rc<Cell<Option<f64>>>,
    on_complete: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl MazeGame {
    /// Build a run from the saved settings; `board_px` sizes top-down cells
    #[wasm_bindgen(constructor)]
    pub fn new(board_px: f32) -> Result<MazeGame, JsValue> {
        let store = open_store();
        let settings = Settings::load(store.as_ref());
        let profile = CalibrationProfile::load(store.as_ref(), platform::now_ms());
        let best = BestTimes::load(store.as_ref());
        let difficulty = settings.difficulty;
        let seed = platform::random_seed();

        let finished = Rc::new(Cell::new(None));
        let sink = finished.clone();
        let view = if settings.view_3d {
            let mut session =
                Session3d::for_difficulty(difficulty, profile, seed).map_err(js_error)?;
            session.on_complete(move |ms| sink.set(Some(ms)));
            View::FirstPerson(session)
        } else {
            let mut session = Session2d::for_difficulty(difficulty, board_px, profile, seed)
                .map_err(js_error)?;
            session.on_complete(move |ms| sink.set(Some(ms)));
            View::TopDown(session)
        };

        Ok(MazeGame {
            view,
            handle: None,
            difficulty,
            store,
            best,
            finished,
            on_complete: None,
        })
    }

    /// `callback(elapsedMs, isNewBest)` once per finished run
    #[wasm_bindgen(js_name = onComplete)]
    pub fn on_complete(&mut self, callback: js_sys::Function) {
        self.on_complete = Some(callback);
    }

    /// Begin the run. False if it already finished and needs `reset`.
    pub fn start(&mut self) -> bool {
        self.handle = match &mut self.view {
            View::TopDown(s) => s.start(),
            View::FirstPerson(s) => s.start(),
        };
        if self.handle.is_none() {
            return false;
        }
        self.best.record_start(self.difficulty);
        if let Err(e) = self.best.save(self.store.as_mut()) {
            log::warn!("Could not save play count: {}", e);
        }
        true
    }

    /// Fixed-interval callback for the top-down view.
    /// False once the loop no longer owns the run.
    pub fn tick(&mut self) -> bool {
        let (View::TopDown(session), Some(handle)) = (&mut self.view, self.handle) else {
            return false;
        };
        let alive = session.tick(handle).is_some();
        self.deliver_completion();
        alive && self.is_running()
    }

    /// Animation-frame callback for the first-person view (`dt` in seconds)
    pub fn frame(&mut self, dt: f32) -> bool {
        let (View::FirstPerson(session), Some(handle)) = (&mut self.view, self.handle) else {
            return false;
        };
        let alive = session.frame(handle, dt).is_some();
        self.deliver_completion();
        alive && self.is_running()
    }

    /// `deviceorientation` reading in degrees
    pub fn orientation(&mut self, beta: f32, gamma: f32) {
        self.push(InputMessage::Orientation(OrientationSample { beta, gamma }));
    }

    /// Drag movement since the previous touch event (pixels)
    pub fn touch(&mut self, dx: f32, dy: f32) {
        self.push(InputMessage::Touch(TouchDelta { dx, dy }));
    }

    #[wasm_bindgen(js_name = touchEnd)]
    pub fn touch_end(&mut self) {
        self.push(InputMessage::TouchEnd);
    }

    /// Returns false for keys the game does not use
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str) -> bool {
        match Key::from_key_name(key) {
            Some(k) => {
                self.push(InputMessage::KeyDown(k));
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) -> bool {
        match Key::from_key_name(key) {
            Some(k) => {
                self.push(InputMessage::KeyUp(k));
                true
            }
            None => false,
        }
    }

    /// Leave the run; the loop is stopped before this returns
    pub fn back(&mut self) {
        self.handle = None;
        match &mut self.view {
            View::TopDown(s) => s.back(),
            View::FirstPerson(s) => s.back(),
        }
    }

    /// New maze, fresh player, loop stopped
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.handle = None;
        self.finished.set(None);
        let seed = platform::random_seed();
        let result = match &mut self.view {
            View::TopDown(s) => s.reset(seed),
            View::FirstPerson(s) => s.reset(seed),
        };
        result.map_err(js_error)
    }

    /// Pick up a calibration saved since this run was built
    #[wasm_bindgen(js_name = reloadCalibration)]
    pub fn reload_calibration(&mut self) {
        let profile = CalibrationProfile::load(self.store.as_ref(), platform::now_ms());
        match &mut self.view {
            View::TopDown(s) => s.set_profile(profile),
            View::FirstPerson(s) => s.set_profile(profile),
        }
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        match &self.view {
            View::TopDown(s) => s.is_running(),
            View::FirstPerson(s) => s.is_running(),
        }
    }

    #[wasm_bindgen(js_name = isComplete)]
    pub fn is_complete(&self) -> bool {
        self.view.phase() == Phase::Complete
    }

    #[wasm_bindgen(js_name = isFirstPerson)]
    pub fn is_first_person(&self) -> bool {
        matches!(self.view, View::FirstPerson(_))
    }

    #[wasm_bindgen(js_name = elapsedMs)]
    pub fn elapsed_ms(&self) -> f64 {
        match &self.view {
            View::TopDown(s) => s.state().elapsed_ms,
            View::FirstPerson(s) => s.state().elapsed_ms,
        }
    }

    /// Player x (pixels top-down, world units first-person)
    #[wasm_bindgen(js_name = playerX)]
    pub fn player_x(&self) -> f32 {
        match &self.view {
            View::TopDown(s) => s.state().player.pos.x,
            View::FirstPerson(s) => s.state().player.x,
        }
    }

    /// Player y top-down, z first-person
    #[wasm_bindgen(js_name = playerY)]
    pub fn player_y(&self) -> f32 {
        match &self.view {
            View::TopDown(s) => s.state().player.pos.y,
            View::FirstPerson(s) => s.state().player.z,
        }
    }

    #[wasm_bindgen(js_name = playerRadius)]
    pub fn player_radius(&self) -> f32 {
        match &self.view {
            View::TopDown(s) => s.state().player.radius,
            View::FirstPerson(_) => 0.0,
        }
    }

    /// First-person heading in radians (0 faces -z)
    pub fn rotation(&self) -> f32 {
        match &self.view {
            View::TopDown(_) => 0.0,
            View::FirstPerson(s) => s.state().player.rotation,
        }
    }

    pub fn rows(&self) -> usize {
        self.view.maze().rows()
    }

    pub fn cols(&self) -> usize {
        self.view.maze().cols()
    }

    /// Wall query for drawing; `side` is top/right/bottom/left
    #[wasm_bindgen(js_name = hasWall)]
    pub fn has_wall(&self, row: usize, col: usize, side: &str) -> bool {
        Direction::from_name(side)
            .is_none_or(|dir| self.view.maze().has_wall(CellPos::new(row, col), dir))
    }

    #[wasm_bindgen(js_name = finishRow)]
    pub fn finish_row(&self) -> usize {
        self.view.maze().finish.row
    }

    #[wasm_bindgen(js_name = finishCol)]
    pub fn finish_col(&self) -> usize {
        self.view.maze().finish.col
    }

    #[wasm_bindgen(js_name = bestTimeMs)]
    pub fn best_time_ms(&self) -> Option<f64> {
        self.best.best(self.difficulty)
    }
}

impl MazeGame {
    fn deliver_completion(&mut self) {
        let Some(elapsed_ms) = self.finished.take() else {
            return;
        };
        let is_best = self
            .best
            .record_completion(self.difficulty, elapsed_ms, platform::now_ms());
        if let Err(e) = self.best.save(self.store.as_mut()) {
            log::warn!("Could not save best times: {}", e);
        }
        if let Some(cb) = &self.on_complete {
            let _ = cb.call2(
                &JsValue::NULL,
                &JsValue::from_f64(elapsed_ms),
                &JsValue::from_bool(is_best),
            );
        }
    }

    fn push(&mut self, msg: InputMessage) {
        match &mut self.view {
            View::TopDown(s) => s.push_input(msg),
            View::FirstPerson(s) => s.push_input(msg),
        }
    }
}

/// Sampling window handed back to JS for its timeout
#[wasm_bindgen]
pub struct CalibrationTimer {
    ticket: SamplingTicket,
}

/// Tilt calibration flow
#[wasm_bindgen]
pub struct Calibration {
    machine: CalibrationMachine,
    store: Box<dyn KeyValueStore>,
}

#[wasm_bindgen]
impl Calibration {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Calibration {
        let store = open_store();
        let initial = CalibrationProfile::load(store.as_ref(), platform::now_ms());
        Calibration {
            machine: CalibrationMachine::new(initial),
            store,
        }
    }

    /// Outcome of the permission prompt; `undefined` when the device has no prompt
    pub fn permission(&mut self, granted: Option<bool>) {
        let outcome = match granted {
            Some(true) => PermissionOutcome::Granted,
            Some(false) => PermissionOutcome::Denied,
            None => PermissionOutcome::Unavailable,
        };
        self.machine.permission_result(outcome);

        if self.machine.is_denied() {
            let mut settings = Settings::load(self.store.as_ref());
            settings.tilt_denied();
            if let Err(e) = settings.save(self.store.as_mut()) {
                log::warn!("Could not save settings: {}", e);
            }
        }
    }

    /// Begin sampling; JS should call `timeout` with the result after the window
    pub fn start(&mut self) -> Option<CalibrationTimer> {
        self.machine
            .start_sampling(platform::now_ms())
            .map(|ticket| CalibrationTimer { ticket })
    }

    pub fn sample(&mut self, beta: f32, gamma: f32) {
        self.machine
            .push_sample(OrientationSample { beta, gamma }, platform::now_ms());
    }

    pub fn timeout(&mut self, timer: &CalibrationTimer) {
        self.machine.sampling_timeout(timer.ticket);
    }

    pub fn cancel(&mut self) {
        self.machine.cancel();
    }

    pub fn recalibrate(&mut self) {
        self.machine.recalibrate();
    }

    #[wasm_bindgen(js_name = setSensitivity)]
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.machine.set_sensitivity(sensitivity);
    }

    #[wasm_bindgen(js_name = setDeadzone)]
    pub fn set_deadzone(&mut self, deadzone: f32) {
        self.machine.set_deadzone(deadzone);
    }

    /// Save the profile. False outside the sensitivity step.
    pub fn confirm(&mut self) -> Result<bool, JsValue> {
        self.machine
            .confirm(self.store.as_mut(), platform::now_ms())
            .map(|saved| saved.is_some())
            .map_err(js_error)
    }

    pub fn status(&self) -> String {
        format!("{:?}", self.machine.status()).to_lowercase()
    }

    /// Sampling progress in [0, 1]
    pub fn progress(&self) -> f32 {
        self.machine.progress()
    }

    #[wasm_bindgen(js_name = indicatorX)]
    pub fn indicator_x(&self) -> f32 {
        self.machine.indicator().x
    }

    #[wasm_bindgen(js_name = indicatorY)]
    pub fn indicator_y(&self) -> f32 {
        self.machine.indicator().y
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved settings as JSON
#[wasm_bindgen(js_name = loadSettings)]
pub fn load_settings() -> Result<String, JsValue> {
    let store = open_store();
    serde_json::to_string(&Settings::load(store.as_ref())).map_err(|e| js_error(e.into()))
}

/// Validate and store settings JSON
#[wasm_bindgen(js_name = saveSettings)]
pub fn save_settings(json: &str) -> Result<(), JsValue> {
    let settings: Settings = serde_json::from_str(json).map_err(|e| js_error(e.into()))?;
    let mut store = open_store();
    settings.save(store.as_mut()).map_err(js_error)
}

/// Difficulty labels in menu order
#[wasm_bindgen]
pub fn difficulties() -> Vec<String> {
    Difficulty::ALL.iter().map(|d| d.as_str().to_string()).collect()
}

/// Best times and play counts as JSON
#[wasm_bindgen(js_name = bestTimes)]
pub fn best_times() -> Result<String, JsValue> {
    let store = open_store();
    serde_json::to_string(&BestTimes::load(store.as_ref())).map_err(|e| js_error(e.into()))
}

/// `m:ss.cc`
#[wasm_bindgen(js_name = formatTime)]
pub fn format_time(elapsed_ms: f64) -> String {
    records::format_time(elapsed_ms)
}
