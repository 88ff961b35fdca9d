//! Calibration state machine
//!
//! ```text
//! Permission --granted/unavailable--> Ready --start--> Calibrating
//!     |                                 ^                  |
//!     +--denied--> Denied               +-----cancel-------+
//!                                       |                  | 30 samples / 1.5s
//!                                       |                  v
//!                                       +--recalibrate-- Sensitivity --confirm--> Complete
//! ```
//!
//! `Denied` is terminal: every later event is ignored until the page is
//! reloaded and a new machine is created.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::profile::{CalibrationProfile, MAX_DEADZONE_DEG, MAX_SENSITIVITY, MIN_SENSITIVITY};
use crate::error::Result;
use crate::persistence::KeyValueStore;
use crate::sim::input::OrientationSample;

/// Sampling stops after this many samples...
pub const CALIBRATION_SAMPLES: usize = 30;
/// ...or after this long, whichever comes first
pub const CALIBRATION_DURATION_MS: f64 = 1500.0;
/// Test indicator travel (pixels from center)
pub const INDICATOR_RANGE: f32 = 100.0;

/// Current calibration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationStatus {
    /// Waiting on the orientation permission prompt
    Permission,
    /// Permission settled, waiting for the user to hold still and start
    Ready,
    /// Collecting rest samples
    Calibrating,
    /// Live test with adjustable sensitivity and deadzone
    Sensitivity,
    /// Profile saved and handed to the game
    Complete,
    /// Orientation access refused; tilt control is unavailable
    Denied,
}

/// Result of asking the platform for orientation access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    /// No permission API on this device; access is implicitly granted
    Unavailable,
}

/// Identifies one sampling window so a late timer cannot end a newer one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingTicket {
    epoch: u32,
}

#[derive(Debug, Clone)]
pub struct CalibrationMachine {
    status: CalibrationStatus,
    profile: CalibrationProfile,
    samples: Vec<OrientationSample>,
    sampling_started_ms: f64,
    epoch: u32,
    indicator: Vec2,
}

impl CalibrationMachine {
    /// Start at the permission step. `initial` seeds the slider values.
    pub fn new(initial: CalibrationProfile) -> Self {
        Self {
            status: CalibrationStatus::Permission,
            profile: initial,
            samples: Vec::with_capacity(CALIBRATION_SAMPLES),
            sampling_started_ms: 0.0,
            epoch: 0,
            indicator: Vec2::ZERO,
        }
    }

    pub fn status(&self) -> CalibrationStatus {
        self.status
    }

    /// Working profile (neutral filled in once sampling finishes)
    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Test indicator offset from center, within `±INDICATOR_RANGE`
    pub fn indicator(&self) -> Vec2 {
        self.indicator
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Sampling progress in percent
    pub fn progress(&self) -> f32 {
        (self.samples.len() as f32 / CALIBRATION_SAMPLES as f32 * 100.0).min(100.0)
    }

    pub fn is_denied(&self) -> bool {
        self.status == CalibrationStatus::Denied
    }

    /// Apply the platform's answer to the permission request
    pub fn permission_result(&mut self, outcome: PermissionOutcome) {
        if self.status != CalibrationStatus::Permission {
            log::debug!("Ignoring permission result in {:?}", self.status);
            return;
        }
        self.status = match outcome {
            PermissionOutcome::Granted => CalibrationStatus::Ready,
            PermissionOutcome::Unavailable => {
                log::info!("No orientation permission API, proceeding");
                CalibrationStatus::Ready
            }
            PermissionOutcome::Denied => {
                log::warn!("Orientation permission denied; reload to try again");
                CalibrationStatus::Denied
            }
        };
    }

    /// Begin a sampling window. The returned ticket must accompany the
    /// one-shot timeout callback.
    pub fn start_sampling(&mut self, now_ms: f64) -> Option<SamplingTicket> {
        if self.status != CalibrationStatus::Ready {
            log::debug!("Cannot start sampling in {:?}", self.status);
            return None;
        }
        self.epoch = self.epoch.wrapping_add(1);
        self.samples.clear();
        self.sampling_started_ms = now_ms;
        self.status = CalibrationStatus::Calibrating;
        log::info!("Calibration sampling started");
        Some(SamplingTicket { epoch: self.epoch })
    }

    /// Feed one orientation event
    pub fn push_sample(&mut self, sample: OrientationSample, now_ms: f64) {
        match self.status {
            CalibrationStatus::Calibrating => {
                if !(sample.beta.is_finite() && sample.gamma.is_finite()) {
                    return;
                }
                self.samples.push(sample);
                let elapsed = now_ms - self.sampling_started_ms;
                if self.samples.len() >= CALIBRATION_SAMPLES || elapsed >= CALIBRATION_DURATION_MS {
                    self.finish_sampling();
                }
            }
            CalibrationStatus::Sensitivity => {
                let offset = self.profile.scaled(sample);
                self.indicator = offset.clamp(
                    Vec2::splat(-INDICATOR_RANGE),
                    Vec2::splat(INDICATOR_RANGE),
                );
            }
            _ => {}
        }
    }

    /// One-shot timer fired for the sampling window identified by `ticket`
    pub fn sampling_timeout(&mut self, ticket: SamplingTicket) {
        if self.status == CalibrationStatus::Calibrating && ticket.epoch == self.epoch {
            self.finish_sampling();
        } else {
            log::debug!("Ignoring stale sampling timeout");
        }
    }

    /// Abort an in-flight sampling window (UI torn down or user backed out)
    pub fn cancel(&mut self) {
        if self.status == CalibrationStatus::Calibrating {
            self.epoch = self.epoch.wrapping_add(1);
            self.samples.clear();
            self.status = CalibrationStatus::Ready;
            log::info!("Calibration sampling cancelled");
        }
    }

    fn finish_sampling(&mut self) {
        if self.samples.is_empty() {
            log::warn!("No orientation samples received, keeping neutral at rest defaults");
            self.profile.neutral_beta = 0.0;
            self.profile.neutral_gamma = 0.0;
        } else {
            let n = self.samples.len() as f64;
            let (sum_beta, sum_gamma) = self
                .samples
                .iter()
                .fold((0.0f64, 0.0f64), |(b, g), s| (b + s.beta as f64, g + s.gamma as f64));
            self.profile.neutral_beta = (sum_beta / n) as f32;
            self.profile.neutral_gamma = (sum_gamma / n) as f32;
        }
        log::info!(
            "Calibrated from {} samples: beta {:.2}, gamma {:.2}",
            self.samples.len(),
            self.profile.neutral_beta,
            self.profile.neutral_gamma
        );
        self.epoch = self.epoch.wrapping_add(1);
        self.indicator = Vec2::ZERO;
        self.status = CalibrationStatus::Sensitivity;
    }

    /// Slider: gain
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        if self.status == CalibrationStatus::Sensitivity && sensitivity.is_finite() {
            self.profile.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
        }
    }

    /// Slider: deadzone in degrees
    pub fn set_deadzone(&mut self, deadzone: f32) {
        if self.status == CalibrationStatus::Sensitivity && deadzone.is_finite() {
            self.profile.deadzone = deadzone.clamp(0.0, MAX_DEADZONE_DEG);
        }
    }

    /// Go back and sample the rest position again
    pub fn recalibrate(&mut self) {
        if self.status == CalibrationStatus::Sensitivity {
            self.samples.clear();
            self.indicator = Vec2::ZERO;
            self.status = CalibrationStatus::Ready;
        }
    }

    /// Stamp, persist and return the finished profile.
    ///
    /// Returns `Ok(None)` outside the sensitivity step. A store failure
    /// leaves the machine in `Sensitivity` so the user can try again.
    pub fn confirm(
        &mut self,
        store: &mut dyn KeyValueStore,
        now_ms: f64,
    ) -> Result<Option<CalibrationProfile>> {
        if self.status != CalibrationStatus::Sensitivity {
            return Ok(None);
        }
        let mut profile = self.profile;
        profile.timestamp = now_ms;
        profile.save(store)?;

        self.profile = profile;
        self.status = CalibrationStatus::Complete;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MazeError;
    use crate::persistence::MemoryStore;

    fn sample(beta: f32, gamma: f32) -> OrientationSample {
        OrientationSample { beta, gamma }
    }

    fn ready_machine() -> CalibrationMachine {
        let mut m = CalibrationMachine::new(CalibrationProfile::default());
        m.permission_result(PermissionOutcome::Granted);
        m
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&mut self, _key: &str, _value: &str) -> crate::error::Result<()> {
            Err(MazeError::Storage("quota exceeded".into()))
        }
        fn remove(&mut self, _key: &str) {}
    }

    #[test]
    fn test_unavailable_api_counts_as_granted() {
        let mut m = CalibrationMachine::new(CalibrationProfile::default());
        m.permission_result(PermissionOutcome::Unavailable);
        assert_eq!(m.status(), CalibrationStatus::Ready);
    }

    #[test]
    fn test_mean_of_samples_becomes_neutral() {
        let mut m = ready_machine();
        m.start_sampling(0.0).unwrap();
        // 30 samples, beta 10..=39 (mean 24.5), gamma alternating -3/+1 (mean -1)
        for i in 0..CALIBRATION_SAMPLES {
            let gamma = if i % 2 == 0 { -3.0 } else { 1.0 };
            m.push_sample(sample(10.0 + i as f32, gamma), i as f64 * 10.0);
        }
        assert_eq!(m.status(), CalibrationStatus::Sensitivity);
        assert!((m.profile().neutral_beta - 24.5).abs() < 1e-4);
        assert!((m.profile().neutral_gamma + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_progress_tracks_samples() {
        let mut m = ready_machine();
        m.start_sampling(0.0).unwrap();
        assert_eq!(m.progress(), 0.0);
        for i in 0..15 {
            m.push_sample(sample(0.0, 0.0), i as f64);
        }
        assert!((m.progress() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_duration_ends_sampling_early() {
        let mut m = ready_machine();
        m.start_sampling(1000.0).unwrap();
        m.push_sample(sample(4.0, 2.0), 1100.0);
        assert_eq!(m.status(), CalibrationStatus::Calibrating);
        m.push_sample(sample(6.0, 4.0), 2500.0);
        assert_eq!(m.status(), CalibrationStatus::Sensitivity);
        assert!((m.profile().neutral_beta - 5.0).abs() < 1e-4);
        assert!((m.profile().neutral_gamma - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_timeout_ticket_must_match() {
        let mut m = ready_machine();
        let first = m.start_sampling(0.0).unwrap();
        m.cancel();
        assert_eq!(m.status(), CalibrationStatus::Ready);

        let second = m.start_sampling(10.0).unwrap();
        m.push_sample(sample(8.0, 0.0), 20.0);
        // Timer from the cancelled window must not end this one
        m.sampling_timeout(first);
        assert_eq!(m.status(), CalibrationStatus::Calibrating);

        m.sampling_timeout(second);
        assert_eq!(m.status(), CalibrationStatus::Sensitivity);
        assert!((m.profile().neutral_beta - 8.0).abs() < 1e-4);
    }

    #[test]
    fn test_timeout_without_samples_keeps_zero_neutral() {
        let mut m = ready_machine();
        let ticket = m.start_sampling(0.0).unwrap();
        m.sampling_timeout(ticket);
        assert_eq!(m.status(), CalibrationStatus::Sensitivity);
        assert_eq!(m.profile().neutral_beta, 0.0);
    }

    #[test]
    fn test_indicator_is_debiased_and_bounded() {
        let mut m = ready_machine();
        m.start_sampling(0.0).unwrap();
        for i in 0..CALIBRATION_SAMPLES {
            m.push_sample(sample(20.0, 0.0), i as f64);
        }
        m.set_deadzone(2.0);
        m.set_sensitivity(2.0);

        m.push_sample(sample(21.0, 0.0), 100.0);
        assert_eq!(m.indicator(), Vec2::ZERO);

        m.push_sample(sample(25.0, -7.0), 110.0);
        assert_eq!(m.indicator(), Vec2::new(-10.0, 6.0));

        m.push_sample(sample(90.0, 0.0), 120.0);
        assert_eq!(m.indicator().y, INDICATOR_RANGE);
    }

    #[test]
    fn test_sliders_are_clamped() {
        let mut m = ready_machine();
        let t = m.start_sampling(0.0).unwrap();
        m.sampling_timeout(t);
        m.set_sensitivity(50.0);
        m.set_deadzone(-3.0);
        assert_eq!(m.profile().sensitivity, MAX_SENSITIVITY);
        assert_eq!(m.profile().deadzone, 0.0);
    }

    #[test]
    fn test_confirm_persists_profile() {
        let mut store = MemoryStore::new();
        let mut m = ready_machine();
        let t = m.start_sampling(0.0).unwrap();
        m.push_sample(sample(15.0, 5.0), 1.0);
        m.sampling_timeout(t);
        m.set_sensitivity(1.5);

        let profile = m.confirm(&mut store, 5_000.0).unwrap().unwrap();
        assert_eq!(m.status(), CalibrationStatus::Complete);
        assert_eq!(profile.timestamp, 5_000.0);
        assert_eq!(profile.sensitivity, 1.5);

        let loaded = CalibrationProfile::load(&store, 6_000.0);
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_confirm_failure_stays_in_sensitivity() {
        let mut m = ready_machine();
        let t = m.start_sampling(0.0).unwrap();
        m.sampling_timeout(t);
        assert!(m.confirm(&mut FailingStore, 1.0).is_err());
        assert_eq!(m.status(), CalibrationStatus::Sensitivity);
    }

    #[test]
    fn test_recalibrate_returns_to_ready() {
        let mut m = ready_machine();
        let t = m.start_sampling(0.0).unwrap();
        m.sampling_timeout(t);
        m.recalibrate();
        assert_eq!(m.status(), CalibrationStatus::Ready);
        assert!(m.start_sampling(10.0).is_some());
    }

    #[test]
    fn test_denied_is_terminal() {
        let mut store = MemoryStore::new();
        let mut m = CalibrationMachine::new(CalibrationProfile::default());
        m.permission_result(PermissionOutcome::Denied);
        assert!(m.is_denied());

        m.permission_result(PermissionOutcome::Granted);
        assert!(m.start_sampling(0.0).is_none());
        for i in 0..100 {
            m.push_sample(sample(1.0, 1.0), i as f64 * 100.0);
        }
        m.recalibrate();
        assert_eq!(m.confirm(&mut store, 0.0).unwrap(), None);

        assert_eq!(m.status(), CalibrationStatus::Denied);
        assert!(store.is_empty());
    }
}
