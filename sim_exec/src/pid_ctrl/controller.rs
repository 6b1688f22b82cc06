//! # PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller evaluated at a fixed period.
///
/// The integral and derivative terms assume the controller is called once per cycle with the same
/// `dt`, they lose their meaning if it is called at an irregular rate.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error, 0 before the first call
    prev_error: f64,

    /// The integral accumulation
    integral: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            prev_error: 0f64,
            integral: 0f64
        }
    }

    /// Get the value of the controller for the given error over a period of `dt` seconds.
    pub fn get(&mut self, error: f64, dt: f64) -> f64 {
        self.get_scaled(error, dt, 1f64)
    }

    /// As [`PidController::get`] but with the proportional gain multiplied by `kp_factor`.
    pub fn get_scaled(&mut self, error: f64, dt: f64, kp_factor: f64) -> f64 {
        self.integral += error * dt;

        let deriv = (error - self.prev_error) / dt;

        let out = 
            self.k_p * kp_factor * error 
            + self.k_i * self.integral 
            + self.k_d * deriv;
        
        self.prev_error = error;

        out
    }

    /// The accumulated integral of the error.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// The error passed in on the last call.
    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
