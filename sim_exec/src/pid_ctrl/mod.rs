//! # PID control module
//!
//! PID control turns the commands received from the controller into a speed command and a
//! steering command. Each axis is driven by its own PID controller acting on the pixel distance
//! carried by the command.
//!
//! On top of the plain PID each axis supports:
//! - a dead-band on the measurement, inside which the axis target is 0 and the PID memory is left
//!   untouched,
//! - gain scheduling, using a reduced proportional gain and tighter limit close to the setpoint,
//! - output clamping,
//! - rate limiting of the emitted output.
//!
//! The parameter file decides which axes use gain scheduling and rate limiting, normally only the
//! movement axis does.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controller;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::PidController;
pub use params::{AxisParams, GainSchedule, Params};
pub use state::{AxisReport, InputData, OutputData, PidCtrl, StatusReport};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during PID control processing.
#[derive(Debug, thiserror::Error)]
pub enum PidCtrlError {
    #[error("The cycle period must be finite and positive, got {0} s")]
    InvalidDt(f64),
}
