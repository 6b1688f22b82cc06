//! # Actuator model module
//!
//! Converts the speed and steering commands from PID control into the physical speed and steering
//! angle of the robot. Both quantities follow their target with a first-order lag: every cycle they
//! move a fraction `rate * dt` (at most all) of the way to the target.
//!
//! The motor model maps the speed command to a motor RPM and from there to the linear speed at the
//! wheel rim, so the reachable speed depends on the motor and wheel as well as on `max_speed_ms`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use state::{step, ActModel, ActuatorState, InputData, StatusReport};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in the actuator model.
#[derive(Debug, thiserror::Error)]
pub enum ActModelError {
    #[error("The cycle period must be finite and positive, got {0} s")]
    InvalidDt(f64),

    #[error("Non-finite command (speed {0}, steering {1})")]
    NonFiniteCmd(f64, f64),
}
