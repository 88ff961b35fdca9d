//! Device-tilt calibration
//!
//! Turns raw `{beta, gamma}` orientation samples into a profile (neutral
//! offset, sensitivity, deadzone) that the movement integrators consume.

pub mod machine;
pub mod profile;

pub use machine::{
    CALIBRATION_DURATION_MS, CALIBRATION_SAMPLES, CalibrationMachine, CalibrationStatus,
    PermissionOutcome, SamplingTicket,
};
pub use profile::{CalibrationProfile, PROFILE_VALIDITY_MS, apply_deadzone};
