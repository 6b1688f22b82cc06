//! Parameters structure for PidCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for PID control.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Params {
    /// Conversion from a pixel error into the controller's error units.
    pub pixel_scale: f64,

    /// Rotation (steering) axis
    pub rotation: AxisParams,

    /// Movement (speed) axis
    pub movement: AxisParams,
}

/// Parameters for a single axis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AxisParams {

    // ---- GAINS ----

    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    // ---- MEASUREMENT ----

    /// The measurement the controller drives towards.
    ///
    /// Units: pixels
    pub setpoint_px: f64,

    /// Lower bound of the dead-band, inclusive.
    ///
    /// Units: pixels
    pub dead_band_min_px: f64,

    /// Upper bound of the dead-band, inclusive.
    ///
    /// Units: pixels
    pub dead_band_max_px: f64,

    // ---- OUTPUT ----

    /// The output is limited to `[-output_limit, output_limit]`.
    pub output_limit: f64,

    /// Target used when the axis is commanded with `none`.
    #[serde(default)]
    pub idle_output: f64,

    /// Maximum rate of change of the output, per second. No rate limit if not set.
    #[serde(default)]
    pub max_rate: Option<f64>,

    /// Gain scheduling near the setpoint. Always uses the nominal gain if not set.
    #[serde(default)]
    pub gain_schedule: Option<GainSchedule>,
}

/// Gain schedule on the magnitude of the error.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GainSchedule {
    /// Errors with a magnitude above this use the nominal `k_p` and `output_limit`.
    pub threshold: f64,

    /// Factor applied to `k_p` for errors at or below the threshold.
    pub fine_kp_factor: f64,

    /// Output limit for errors at or below the threshold.
    pub fine_output_limit: f64,
}
