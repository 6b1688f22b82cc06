//! # Simulator Executable Parameters
//!
//! This module provide parameters for the simulator executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::sim_cam::SimCamParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SimExecParams {
    /// Target period of one cycle, also used as the fixed time step of the control modules.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// If true the control modules write their archives every cycle.
    #[serde(default)]
    pub archive: bool,

    /// Starting position of the robot in the LM frame.
    ///
    /// Units: meters
    #[serde(default)]
    pub initial_pos_m: [f64; 2],

    /// Starting heading of the robot.
    ///
    /// Units: radians
    #[serde(default)]
    pub initial_heading_rad: f64,

    /// Simulated camera parameters, at the top level of the file
    #[serde(flatten)]
    pub cam: SimCamParams,
}

impl Default for SimExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            archive: false,
            initial_pos_m: [0.0, 0.0],
            initial_heading_rad: 0.0,
            cam: SimCamParams::default(),
        }
    }
}
