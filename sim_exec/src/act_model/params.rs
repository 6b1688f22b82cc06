//! Parameters structure for the actuator model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the actuator model.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- MOTOR ----

    /// Maximum linear speed of the robot, and the speed command mapping to full motor input.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Motor speed at full input.
    ///
    /// Units: revolutions/minute
    pub max_rpm: f64,

    /// Units: meters
    pub wheel_radius_m: f64,

    /// Rate at which the speed follows its target.
    ///
    /// Units: 1/second
    pub motor_acceleration: f64,

    // ---- STEERING ----

    /// Units: degrees
    pub max_steering_angle_deg: f64,

    /// Rate at which the steering angle follows its target.
    ///
    /// Units: 1/second
    pub steering_speed: f64,

    /// Steering command mapping to full steering input.
    pub max_steering_command: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_speed_ms: 1.5,
            max_rpm: 12000.0,
            wheel_radius_m: 0.03,
            motor_acceleration: 5.0,
            max_steering_angle_deg: 30.0,
            steering_speed: 10.0,
            max_steering_command: 2.0,
        }
    }
}
