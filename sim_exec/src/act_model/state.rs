//! Implementations for the ActModel state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;

// Internal
use super::{ActModelError, Params};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{clamp, lerp},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator model state
#[derive(Default)]
pub struct ActModel {
    pub(crate) params: Params,

    state: ActuatorState,

    report: StatusReport,

    arch: Archiver,
}

/// Input data to the actuator model.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Speed command from PID control
    pub speed_cmd: f64,

    /// Steering command from PID control
    pub steering_cmd: f64,

    /// Units: seconds
    pub dt_s: f64,
}

/// Physical state of the actuators.
#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq)]
pub struct ActuatorState {
    /// Linear speed of the robot along its forward axis.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steering angle, positive to the right.
    ///
    /// Units: degrees
    pub steering_angle_deg: f64,
}

/// Status report for actuator model processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Speed command was outside the motor's input range
    pub motor_input_limited: bool,

    /// The speed reachable by the motor was above the maximum speed
    pub speed_limited: bool,

    /// Steering command was outside the steering input range
    pub steer_input_limited: bool,

    /// Units: meters/second
    pub target_speed_ms: f64,

    /// Units: degrees
    pub target_steering_angle_deg: f64,
}

#[derive(Serialize)]
struct Record {
    time_s: f64,
    speed_ms: f64,
    steering_angle_deg: f64,
    target_speed_ms: f64,
    target_steering_angle_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ActModel {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = ActuatorState;
    type StatusReport = StatusReport;
    type ProcError = ActModelError;

    /// Initialise the actuator model.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        *self = Self::new(params::load(init_data)?);

        match Archiver::from_path(session, "act_model/act_model.csv") {
            Ok(a) => self.arch = a,
            Err(e) => warn!("ActModel archive unavailable: {}", e)
        }

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let dt = input_data.dt_s;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ActModelError::InvalidDt(dt))
        }
        if !input_data.speed_cmd.is_finite() || !input_data.steering_cmd.is_finite() {
            return Err(ActModelError::NonFiniteCmd(
                input_data.speed_cmd,
                input_data.steering_cmd
            ))
        }

        let (state, report) = step(
            &self.params,
            &self.state,
            input_data.speed_cmd,
            input_data.steering_cmd,
            dt
        );

        debug_assert!(state.speed_ms.abs() <= self.params.max_speed_ms.abs());
        debug_assert!(
            state.steering_angle_deg.abs() <= self.params.max_steering_angle_deg.abs()
        );

        self.state = state;
        self.report = report;

        trace!(
            "ActModel: speed {:.4} m/s, steering {:.3} deg",
            state.speed_ms,
            state.steering_angle_deg
        );

        Ok((state, report))
    }
}

impl ActModel {
    /// Create a new model at rest from parameters, without archiving.
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Current actuator state.
    pub fn state(&self) -> ActuatorState {
        self.state
    }
}

impl Archived for ActModel {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch.is_init() {
            return Err(ArchiveError::NotInitialised)
        }

        self.arch.serialise(Record {
            time_s: session::get_elapsed_seconds(),
            speed_ms: self.state.speed_ms,
            steering_angle_deg: self.state.steering_angle_deg,
            target_speed_ms: self.report.target_speed_ms,
            target_steering_angle_deg: self.report.target_steering_angle_deg,
        })
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Advance the actuator state by one cycle of `dt` seconds.
///
/// This is a pure function of its inputs. Provided the previous state is within the physical
/// limits the new state is too.
pub fn step(
    params: &Params,
    prev: &ActuatorState,
    speed_cmd: f64,
    steering_cmd: f64,
    dt: f64
) -> (ActuatorState, StatusReport) {
    let mut report = StatusReport::default();
    let max_speed = params.max_speed_ms.abs();
    let max_angle = params.max_steering_angle_deg.abs();

    // ---- MOTOR ----

    let motor_input = input_fraction(speed_cmd, params.max_speed_ms);
    report.motor_input_limited = motor_input.abs() < (speed_cmd / params.max_speed_ms).abs();

    let rpm = motor_input * params.max_rpm;
    let omega_rads = rpm / 60.0 * std::f64::consts::TAU;
    let linear_ms = omega_rads * params.wheel_radius_m;

    let target_speed = clamp(&linear_ms, &-max_speed, &max_speed);
    report.speed_limited = target_speed != linear_ms;
    report.target_speed_ms = target_speed;

    let speed_ms = lerp(prev.speed_ms, target_speed, params.motor_acceleration * dt);

    // ---- STEERING ----

    let steer_input = input_fraction(steering_cmd, params.max_steering_command);
    report.steer_input_limited =
        steer_input.abs() < (steering_cmd / params.max_steering_command).abs();

    let target_angle = steer_input * max_angle;
    report.target_steering_angle_deg = target_angle;

    let steering_angle_deg = lerp(
        prev.steering_angle_deg,
        target_angle,
        params.steering_speed * dt
    );

    (
        ActuatorState {
            speed_ms,
            steering_angle_deg,
        },
        report
    )
}

/// Fraction of full input represented by a command, limited to `[-1, 1]`.
///
/// A zero full-scale command gives no input.
fn input_fraction(cmd: f64, full_scale: f64) -> f64 {
    if full_scale == 0.0 {
        return 0.0
    }

    clamp(&(cmd / full_scale), &-1.0, &1.0)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 0.02;

    fn input(speed_cmd: f64, steering_cmd: f64) -> InputData {
        InputData {
            speed_cmd,
            steering_cmd,
            dt_s: DT,
        }
    }

    #[test]
    fn test_targets() {
        let params = Params::default();

        // Any real command saturates the motor: 0.1 / 1.5 * 12000 rpm at 3 cm is ~2.5 m/s
        let (_, rpt) = step(&params, &ActuatorState::default(), 0.1, 1.0, DT);
        assert!(rpt.speed_limited);
        assert_eq!(rpt.target_speed_ms, 1.5);
        assert_eq!(rpt.target_steering_angle_deg, 15.0);
        assert!(!rpt.steer_input_limited);

        let (_, rpt) = step(&params, &ActuatorState::default(), -10.0, -4.0, DT);
        assert!(rpt.motor_input_limited);
        assert!(rpt.steer_input_limited);
        assert_eq!(rpt.target_speed_ms, -1.5);
        assert_eq!(rpt.target_steering_angle_deg, -30.0);

        // Small commands stay below the speed limit
        let (_, rpt) = step(&params, &ActuatorState::default(), 0.01, 0.0, DT);
        assert!(!rpt.speed_limited);
        let expected = 0.01 / 1.5 * 12000.0 / 60.0 * std::f64::consts::TAU * 0.03;
        assert!((rpt.target_speed_ms - expected).abs() < 1e-12);
    }

    #[test]
    fn test_convergence() {
        let mut model = ActModel::new(Params::default());

        let mut prev = ActuatorState::default();
        for _ in 0..200 {
            let (state, _) = model.proc(&input(1.0, -1.0)).unwrap();

            // Monotone approach, never past the target
            assert!(state.speed_ms >= prev.speed_ms);
            assert!(state.speed_ms <= 1.5);
            assert!(state.steering_angle_deg <= prev.steering_angle_deg);
            assert!(state.steering_angle_deg >= -15.0);

            prev = state;
        }

        assert!((prev.speed_ms - 1.5).abs() < 1e-6);
        assert!((prev.steering_angle_deg + 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_large_dt_no_overshoot() {
        let params = Params::default();

        // motor_acceleration * dt = 5, the lerp factor saturates at 1
        let (state, _) = step(&params, &ActuatorState::default(), 1.0, 2.0, 1.0);
        assert_eq!(state.speed_ms, 1.5);
        assert_eq!(state.steering_angle_deg, 30.0);
    }

    #[test]
    fn test_invalid_input() {
        let mut model = ActModel::new(Params::default());
        assert!(matches!(
            model.proc(&input(f64::NAN, 0.0)),
            Err(ActModelError::NonFiniteCmd(..))
        ));
        assert!(matches!(
            model.proc(&InputData::default()),
            Err(ActModelError::InvalidDt(_))
        ));
        assert_eq!(model.state(), ActuatorState::default());
    }
}
