//! Implementations for the PidCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;

// Internal
use super::{AxisParams, Params, PidController, PidCtrlError};
use comms_if::tc::{Axis, AxisCmd};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{clamp_sym, step_towards},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PID control module state
#[derive(Default)]
pub struct PidCtrl {
    pub(crate) params: Params,

    rotation: AxisState,
    movement: AxisState,

    pub(crate) report: StatusReport,
    output: OutputData,

    arch: Archiver,
}

/// Controller and held target of one axis.
#[derive(Debug, Default, Clone)]
struct AxisState {
    ctrl: PidController,

    /// Clamped target the output moves towards, held between commands
    target: f64,

    /// Last emitted output
    output: f64,
}

/// Input data to PidCtrl.
#[derive(Debug, Default, Clone)]
pub struct InputData {
    /// New rotation command, or `None` if there is no new command for the axis on this cycle.
    pub rotation: Option<AxisCmd>,

    /// New movement command, or `None` if there is no new command for the axis on this cycle.
    pub movement: Option<AxisCmd>,

    /// Period of the cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Output of PidCtrl for the actuator model.
#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq)]
pub struct OutputData {
    /// Speed command from the movement axis
    pub speed_cmd: f64,

    /// Steering command from the rotation axis
    pub steering_cmd: f64,
}

/// Status report for PidCtrl processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub rotation: AxisReport,
    pub movement: AxisReport,
}

/// Status of one axis after processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct AxisReport {
    /// A new command was applied to the axis this cycle
    pub new_cmd: bool,

    /// The axis was commanded with `none` and went to its idle value
    pub idle: bool,

    /// The measurement was inside the dead-band
    pub in_dead_band: bool,

    /// The fine gain was used
    pub fine_gain: bool,

    /// The controller output was clamped
    pub clamped: bool,

    /// The emitted output was rate limited
    pub rate_limited: bool,

    /// The controller produced a non-finite output, which was replaced by 0
    pub non_finite: bool,

    /// Scaled error, 0 if the controller did not run
    pub error: f64,
}

/// Flat archive record, as the csv writer cannot handle nested structs.
#[derive(Serialize)]
struct Record {
    time_s: f64,
    speed_cmd: f64,
    steering_cmd: f64,
    mov_target: f64,
    rot_target: f64,
    mov_error: f64,
    rot_error: f64,
    mov_integral: f64,
    rot_integral: f64,
    mov_in_dead_band: bool,
    rot_in_dead_band: bool,
    mov_fine_gain: bool,
    mov_clamped: bool,
    rot_clamped: bool,
    mov_rate_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PidCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;
    
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = PidCtrlError;

    /// Initialise the PidCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session) 
        -> Result<(), Self::InitError> 
    {
        *self = Self::new(params::load(init_data)?);

        // Archiving is optional, so a failure here is not fatal
        match Archiver::from_path(session, "pid_ctrl/pid_ctrl.csv") {
            Ok(a) => self.arch = a,
            Err(e) => warn!("PidCtrl archive unavailable: {}", e)
        }

        Ok(())
    }

    /// Perform cyclic processing of PID control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> 
    {
        let dt = input_data.dt_s;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PidCtrlError::InvalidDt(dt))
        }

        self.report = StatusReport {
            rotation: proc_axis(
                &self.params.rotation,
                self.params.pixel_scale,
                &mut self.rotation,
                input_data.rotation,
                dt
            ),
            movement: proc_axis(
                &self.params.movement,
                self.params.pixel_scale,
                &mut self.movement,
                input_data.movement,
                dt
            ),
        };

        self.output = OutputData {
            speed_cmd: self.movement.output,
            steering_cmd: self.rotation.output,
        };

        trace!(
            "PidCtrl output: speed {:.4} (target {:.4}), steering {:.4} (target {:.4})",
            self.output.speed_cmd,
            self.movement.target,
            self.output.steering_cmd,
            self.rotation.target
        );

        Ok((self.output, self.report))
    }
}

impl PidCtrl {
    /// Create a new module from parameters, without archiving.
    pub fn new(params: Params) -> Self {
        let ctrl = |p: &AxisParams| PidController::new(p.k_p, p.k_i, p.k_d);

        Self {
            rotation: AxisState {
                ctrl: ctrl(&params.rotation),
                ..Default::default()
            },
            movement: AxisState {
                ctrl: ctrl(&params.movement),
                ..Default::default()
            },
            params,
            ..Default::default()
        }
    }

    /// The last output.
    pub fn output(&self) -> OutputData {
        self.output
    }

    /// The target the given axis is currently moving towards.
    pub fn target(&self, axis: Axis) -> f64 {
        self.axis(axis).target
    }

    /// The PID controller of the given axis.
    pub fn controller(&self, axis: Axis) -> &PidController {
        &self.axis(axis).ctrl
    }

    fn axis(&self, axis: Axis) -> &AxisState {
        match axis {
            Axis::Rotation => &self.rotation,
            Axis::Movement => &self.movement,
        }
    }
}

impl Archived for PidCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if !self.arch.is_init() {
            return Err(ArchiveError::NotInitialised)
        }

        let record = Record {
            time_s: session::get_elapsed_seconds(),
            speed_cmd: self.output.speed_cmd,
            steering_cmd: self.output.steering_cmd,
            mov_target: self.movement.target,
            rot_target: self.rotation.target,
            mov_error: self.report.movement.error,
            rot_error: self.report.rotation.error,
            mov_integral: self.movement.ctrl.integral(),
            rot_integral: self.rotation.ctrl.integral(),
            mov_in_dead_band: self.report.movement.in_dead_band,
            rot_in_dead_band: self.report.rotation.in_dead_band,
            mov_fine_gain: self.report.movement.fine_gain,
            mov_clamped: self.report.movement.clamped,
            rot_clamped: self.report.rotation.clamped,
            mov_rate_limited: self.report.movement.rate_limited,
        };

        self.arch.serialise(record)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Process one axis for one cycle.
///
/// A cycle without a new command keeps the previous target, the output still moves towards it.
fn proc_axis(
    params: &AxisParams,
    pixel_scale: f64,
    state: &mut AxisState,
    cmd: Option<AxisCmd>,
    dt: f64
) -> AxisReport {
    let mut report = AxisReport::default();

    if let Some(cmd) = cmd {
        report.new_cmd = true;

        match cmd.measurement_px() {
            // `none` is not a zero error, the PID memory is left alone
            None => {
                report.idle = true;
                state.target = clamp_sym(params.idle_output, params.output_limit);
            },
            // Only the target is zeroed, the output still moves towards it under the rate limit
            Some(m) if params.dead_band_min_px <= m && m <= params.dead_band_max_px => {
                report.in_dead_band = true;
                state.target = 0.0;
            },
            Some(m) => {
                let error = (params.setpoint_px - m) * pixel_scale;
                report.error = error;

                let (kp_factor, limit) = match params.gain_schedule {
                    Some(gs) if error.abs() <= gs.threshold => {
                        report.fine_gain = true;
                        (gs.fine_kp_factor, gs.fine_output_limit)
                    },
                    _ => (1.0, params.output_limit)
                };

                let mut raw = state.ctrl.get_scaled(error, dt, kp_factor);
                if !raw.is_finite() {
                    warn!("Non-finite PID output ({}) replaced by 0", raw);
                    report.non_finite = true;
                    raw = 0.0;
                }

                let clamped = clamp_sym(raw, limit);
                report.clamped = clamped != raw;
                state.target = clamped;
            }
        }
    }

    state.output = match params.max_rate {
        Some(rate) => {
            let out = step_towards(state.output, state.target, rate.abs() * dt);
            report.rate_limited = out != state.target;
            out
        },
        None => state.target
    };

    report
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::{Action, Command};
    use crate::pid_ctrl::GainSchedule;

    const DT: f64 = 0.1;

    fn test_params() -> Params {
        Params {
            pixel_scale: 0.01,
            rotation: AxisParams {
                k_p: 1.0,
                k_i: 0.0,
                k_d: 0.0,
                setpoint_px: 0.0,
                dead_band_min_px: -10.0,
                dead_band_max_px: 10.0,
                output_limit: 2.0,
                idle_output: 0.0,
                max_rate: None,
                gain_schedule: None,
            },
            movement: AxisParams {
                k_p: 2.0,
                k_i: 0.0,
                k_d: 0.0,
                setpoint_px: 40.0,
                dead_band_min_px: 35.0,
                dead_band_max_px: 45.0,
                output_limit: 1.0,
                idle_output: 0.0,
                max_rate: Some(2.0),
                gain_schedule: Some(GainSchedule {
                    threshold: 0.5,
                    fine_kp_factor: 0.4,
                    fine_output_limit: 0.3,
                }),
            },
        }
    }

    fn input_from(text: &str) -> InputData {
        let cmd = Command::parse(text).unwrap();
        InputData {
            rotation: cmd.rotation.ok(),
            movement: cmd.movement.ok(),
            dt_s: DT,
        }
    }

    fn idle_input() -> InputData {
        InputData {
            dt_s: DT,
            ..Default::default()
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_forward_scenario() {
        let mut pid = PidCtrl::new(test_params());

        let (out, rpt) = pid.proc(&input_from("none|forward#100")).unwrap();

        // error = (40 - 100) * 0.01, above the schedule threshold so nominal gain
        assert_close(rpt.movement.error, -0.6);
        assert!(!rpt.movement.fine_gain);

        // kp * error = -1.2, clamped to -1.0, then rate limited to 2.0 * 0.1 from 0
        assert!(rpt.movement.clamped);
        assert_close(pid.target(Axis::Movement), -1.0);
        assert!(rpt.movement.rate_limited);
        assert_close(out.speed_cmd, -0.2);

        // Rotation none goes to idle
        assert!(rpt.rotation.idle);
        assert_eq!(out.steering_cmd, 0.0);
    }

    #[test]
    fn test_dead_band_min_inclusive() {
        let mut pid = PidCtrl::new(test_params());

        // Build up some PID memory first
        pid.proc(&input_from("none|forward#100")).unwrap();
        let integral = pid.controller(Axis::Movement).integral();
        let prev_error = pid.controller(Axis::Movement).prev_error();

        let (_, rpt) = pid.proc(&input_from("none|distance#35")).unwrap();
        assert!(rpt.movement.in_dead_band);
        assert_eq!(pid.target(Axis::Movement), 0.0);
        assert_eq!(pid.controller(Axis::Movement).integral(), integral);
        assert_eq!(pid.controller(Axis::Movement).prev_error(), prev_error);

        // Settles at exactly 0 once the rate limiter has caught up
        let mut out = pid.output();
        for _ in 0..10 {
            out = pid.proc(&idle_input()).unwrap().0;
        }
        assert_eq!(out.speed_cmd, 0.0);
    }

    #[test]
    fn test_dead_band_output_rate_limited() {
        let mut pid = PidCtrl::new(test_params());

        let mut out = pid.output();
        for _ in 0..5 {
            out = pid.proc(&input_from("none|forward#100")).unwrap().0;
        }
        assert_close(out.speed_cmd, -1.0);

        // Target drops to 0 at once, the output only by one rate step
        let (out, rpt) = pid.proc(&input_from("none|distance#35")).unwrap();
        assert!(rpt.movement.in_dead_band);
        assert!(rpt.movement.rate_limited);
        assert_eq!(pid.target(Axis::Movement), 0.0);
        assert_close(out.speed_cmd, -0.8);

        let mut out = out;
        for _ in 0..10 {
            out = pid.proc(&idle_input()).unwrap().0;
        }
        assert_eq!(out.speed_cmd, 0.0);
    }

    #[test]
    fn test_dead_band_from_rest_is_zero() {
        let mut pid = PidCtrl::new(test_params());
        let (out, rpt) = pid.proc(&input_from("distance#-10|distance#45")).unwrap();

        assert!(rpt.rotation.in_dead_band);
        assert!(rpt.movement.in_dead_band);
        assert_eq!(out, OutputData::default());
        assert_eq!(pid.controller(Axis::Movement).integral(), 0.0);
    }

    #[test]
    fn test_fine_gain() {
        let mut pid = PidCtrl::new(test_params());

        // error = (40 - 80) * 0.01 = -0.4, within the threshold
        let (_, rpt) = pid.proc(&input_from("none|forward#80")).unwrap();
        assert!(rpt.movement.fine_gain);

        // 2.0 * 0.4 * -0.4 = -0.32, limited to the fine limit
        assert!(rpt.movement.clamped);
        assert_close(pid.target(Axis::Movement), -0.3);
    }

    #[test]
    fn test_rate_limit_every_cycle() {
        let mut pid = PidCtrl::new(test_params());
        let max_step = 2.0 * DT + 1e-12;

        let mut prev = 0.0;
        let mut inputs = vec![input_from("none|backward#60")];
        inputs.extend((0..10).map(|_| idle_input()));
        inputs.push(input_from("none|forward#100"));
        inputs.extend((0..10).map(|_| idle_input()));

        for input in inputs.iter() {
            let (out, _) = pid.proc(input).unwrap();
            assert!((out.speed_cmd - prev).abs() <= max_step);
            prev = out.speed_cmd;
        }

        // The held target has been reached without any further command
        assert_close(prev, pid.target(Axis::Movement));
    }

    #[test]
    fn test_held_target_and_none() {
        let mut pid = PidCtrl::new(test_params());

        // left#50 -> error = (0 - 50) * 0.01 = -0.5, kp 1 -> -0.5, no rate limit on rotation
        let (out, _) = pid.proc(&input_from("left#50|none")).unwrap();
        assert_close(out.steering_cmd, -0.5);

        // No command, target held
        let (out, rpt) = pid.proc(&idle_input()).unwrap();
        assert!(!rpt.rotation.new_cmd);
        assert_close(out.steering_cmd, -0.5);

        // none goes to idle but keeps the PID memory
        let prev_error = pid.controller(Axis::Rotation).prev_error();
        let (out, _) = pid.proc(&input_from("none|none")).unwrap();
        assert_eq!(out.steering_cmd, 0.0);
        assert_eq!(pid.controller(Axis::Rotation).prev_error(), prev_error);
    }

    #[test]
    fn test_invalid_movement_field() {
        let mut pid = PidCtrl::new(test_params());

        pid.proc(&input_from("left#50|none")).unwrap();

        let cmd = Command::parse("none|forward").unwrap();
        assert!(cmd.movement.is_err());

        let (out, rpt) = pid.proc(&InputData {
            rotation: cmd.rotation.clone().ok(),
            movement: cmd.movement.clone().ok(),
            dt_s: DT,
        }).unwrap();

        // Rotation none applied, movement untouched
        assert_eq!(out.steering_cmd, 0.0);
        assert!(!rpt.movement.new_cmd);
        assert_eq!(out.speed_cmd, 0.0);
    }

    #[test]
    fn test_idle_output_clamped() {
        let mut params = test_params();
        params.rotation.idle_output = 5.0;
        let mut pid = PidCtrl::new(params);

        let (out, _) = pid.proc(&input_from("none|none")).unwrap();
        assert_eq!(out.steering_cmd, 2.0);

        let right = AxisCmd::Act { action: Action::Right, magnitude: 400 };
        let (out, rpt) = pid.proc(&InputData {
            rotation: Some(right),
            movement: None,
            dt_s: DT,
        }).unwrap();

        // error = (0 - -400) * 0.01 = 4, clamped to 2
        assert!(rpt.rotation.clamped);
        assert_eq!(out.steering_cmd, 2.0);
    }

    #[test]
    fn test_invalid_dt() {
        let mut pid = PidCtrl::new(test_params());
        assert!(matches!(
            pid.proc(&InputData::default()),
            Err(PidCtrlError::InvalidDt(_))
        ));
    }
}
