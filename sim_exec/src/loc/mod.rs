//! # Localisation module
//!
//! This module integrates the actuator state into the pose of the simulated robot.
//!
//! Frames: the Local Map (LM) frame has Z up. In the Robot Body (RB) frame X points forward, Y to
//! the left and Z up. A positive steering angle turns the robot clockwise seen from above, i.e. to
//! the right, which is a negative rotation about Z.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::act_model::ActuatorState;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and attitude in the LM frame) of the robot.
///
/// More specifically this represents the Robot Body (RB) frame in the Local
/// Map (LM) frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {

    /// The position in the LM frame
    pub position_m_lm: Vector3<f64>,

    /// The attitude of the robot in the LM frame. This is a quaternion that 
    /// will rotate an object from the RB frame into the LM frame.
    pub attitude_q_lm: UnitQuaternion<f64>
}

/// Integrates the actuator state into the robot's pose every cycle.
#[derive(Default)]
pub struct PoseIntegrator {
    pose: Pose,

    arch: Archiver,
}

/// Input data to the pose integrator.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    pub act_state: ActuatorState,

    /// Units: seconds
    pub dt_s: f64,
}

/// Flat pose record for archiving.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoseRecord {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur during localisation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LocError {
    #[error("Non-finite input to the pose integration (speed {0} m/s, steering {1} deg, dt {2} s)")]
    NonFiniteInput(f64, f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m_lm: Vector3::zeros(),
            attitude_q_lm: UnitQuaternion::identity()
        }
    }
}

impl Pose {
    /// Create a pose on the ground plane at the given position and heading.
    pub fn from_xy_heading(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m_lm: Vector3::new(x_m, y_m, 0.0),
            attitude_q_lm: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), heading_rad)
        }
    }

    /// Return the heading (angle to the positive LM_X axis) of the robot in radians.
    ///
    /// Heading is given in the range [-pi, pi], with 0 being in the LM_X direction.
    pub fn heading_rad(&self) -> f64 {
        self.attitude_q_lm.euler_angles().2
    }

    /// The robot's forward direction in the LM frame.
    pub fn forward_lm(&self) -> Vector3<f64> {
        self.attitude_q_lm * Vector3::x()
    }

    /// Advance the pose by one cycle.
    ///
    /// The attitude is first rotated clockwise by `steering_angle_deg * dt` degrees, then the
    /// position moves `speed_ms * dt` along the new forward direction. Non-finite inputs are
    /// rejected and leave the pose unchanged.
    pub fn integrate(
        &mut self,
        speed_ms: f64,
        steering_angle_deg: f64,
        dt: f64
    ) -> Result<(), LocError> {
        if !(speed_ms.is_finite() && steering_angle_deg.is_finite() && dt.is_finite()) {
            return Err(LocError::NonFiniteInput(speed_ms, steering_angle_deg, dt))
        }

        let yaw = UnitQuaternion::from_axis_angle(
            &Vector3::z_axis(),
            -(steering_angle_deg * dt).to_radians()
        );
        self.attitude_q_lm = yaw * self.attitude_q_lm;

        self.position_m_lm += self.forward_lm() * (speed_ms * dt);

        Ok(())
    }

    /// Flat record of this pose.
    pub fn to_record(&self, time_s: f64) -> PoseRecord {
        PoseRecord {
            time_s,
            x_m: self.position_m_lm.x,
            y_m: self.position_m_lm.y,
            z_m: self.position_m_lm.z,
            heading_rad: self.heading_rad(),
        }
    }
}

impl State for PoseIntegrator {
    type InitData = Pose;
    type InitError = std::convert::Infallible;

    type InputData = InputData;
    type OutputData = Pose;
    type StatusReport = ();
    type ProcError = LocError;

    /// Initialise the integrator.
    ///
    /// Expected init data is the starting pose.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        self.pose = init_data;

        // Archiving is optional, so a failure here is not fatal
        match Archiver::from_path(session, "loc/pose.csv") {
            Ok(a) => self.arch = a,
            Err(e) => warn!("Pose archive unavailable: {}", e)
        }

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let act = input_data.act_state;

        if let Err(e) = self.pose.integrate(act.speed_ms, act.steering_angle_deg, input_data.dt_s) {
            warn!("Pose not updated: {}", e);
            return Err(e)
        }

        trace!(
            "Pose: ({:.3}, {:.3}) m, heading {:.4} rad",
            self.pose.position_m_lm.x,
            self.pose.position_m_lm.y,
            self.pose.heading_rad()
        );

        Ok((self.pose, ()))
    }
}

impl PoseIntegrator {
    /// Create a new integrator starting at the given pose, without archiving.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            arch: Archiver::default()
        }
    }

    /// The current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }
}

impl Archived for PoseIntegrator {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch.is_init() {
            return Err(ArchiveError::NotInitialised)
        }

        let record = self.pose.to_record(session::get_elapsed_seconds());
        self.arch.serialise(record)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_straight_line() {
        let mut pose = Pose::default();

        pose.integrate(1.5, 0.0, 0.1).unwrap();
        assert_close(pose.position_m_lm.x, 0.15);
        assert_close(pose.position_m_lm.y, 0.0);
        assert_eq!(pose.heading_rad(), 0.0);

        // Along the current heading
        let mut pose = Pose::from_xy_heading(1.0, 2.0, FRAC_PI_2);
        pose.integrate(2.0, 0.0, 0.5).unwrap();
        assert_close(pose.position_m_lm.x, 1.0);
        assert_close(pose.position_m_lm.y, 3.0);
        assert_close(pose.heading_rad(), FRAC_PI_2);
    }

    #[test]
    fn test_rotate_then_translate() {
        let mut pose = Pose::default();

        // 90 deg/s for 1 s turns right by a quarter turn before moving
        pose.integrate(1.0, 90.0, 1.0).unwrap();
        assert_close(pose.heading_rad(), -FRAC_PI_2);
        assert_close(pose.position_m_lm.x, 0.0);
        assert_close(pose.position_m_lm.y, -1.0);

        // Turning left
        let mut pose = Pose::default();
        pose.integrate(0.0, -30.0, 0.1).unwrap();
        assert_close(pose.heading_rad(), 3f64.to_radians());
        assert_eq!(pose.position_m_lm, Vector3::zeros());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut pose = Pose::from_xy_heading(1.0, 1.0, 0.3);
        let before = pose;

        assert!(pose.integrate(f64::NAN, 0.0, 0.1).is_err());
        assert!(pose.integrate(1.0, f64::INFINITY, 0.1).is_err());
        assert_eq!(pose, before);
    }

    #[test]
    fn test_integrator() {
        let mut integ = PoseIntegrator::new(Pose::default());
        let input = InputData {
            act_state: ActuatorState { speed_ms: 1.0, steering_angle_deg: 0.0 },
            dt_s: 0.1,
        };

        for _ in 0..10 {
            integ.proc(&input).unwrap();
        }
        assert_close(integ.pose().position_m_lm.x, 1.0);
        assert!(matches!(integ.write(), Err(ArchiveError::NotInitialised)));
    }

    #[test]
    fn test_init_without_archive() {
        // A regular file as the archive root, so no archive directory can be made under it
        let root = std::env::temp_dir().join("rf_sim_loc_no_archive");
        std::fs::write(&root, b"").unwrap();
        let session = Session {
            session_root: root.clone(),
            arch_root: root.clone(),
            log_file_path: root.join("sim_exec.log"),
        };

        let start = Pose::from_xy_heading(2.0, -1.0, 0.5);
        let mut integ = PoseIntegrator::new(Pose::default());
        assert!(integ.init(start, &session).is_ok());
        assert_eq!(integ.pose(), start);
        assert!(matches!(integ.write(), Err(ArchiveError::NotInitialised)));

        std::fs::remove_file(&root).ok();
    }
}
