//! # Cycle processing
//!
//! Runs the control chain for one cycle: PID control, then the actuator model, then pose
//! integration. Every module works from the fixed cycle period held in the data store.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;

use crate::{act_model, data_store::DataStore, loc};
use util::{archive::Archived, module::State};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Process the control chain for the current cycle.
///
/// A module error is reported and the module's previous output is used, so the chain keeps running
/// with the last good values.
pub fn proc_cycle(ds: &mut DataStore) {
    let dt_s = ds.cycle_period_s;

    // ---- PID CONTROL ----

    match ds.pid_ctrl.proc(&ds.pid_ctrl_input) {
        Ok((o, r)) => {
            ds.pid_ctrl_output = o;
            ds.pid_ctrl_status_rpt = r;
        },
        Err(e) => warn!("Error during PidCtrl processing: {}", e)
    }

    // ---- ACTUATOR MODEL ----

    let act_input = act_model::InputData {
        speed_cmd: ds.pid_ctrl_output.speed_cmd,
        steering_cmd: ds.pid_ctrl_output.steering_cmd,
        dt_s,
    };

    match ds.act_model.proc(&act_input) {
        Ok((o, r)) => {
            ds.act_model_output = o;
            ds.act_model_status_rpt = r;
        },
        Err(e) => warn!("Error during ActModel processing: {}", e)
    }

    // ---- LOCALISATION ----

    let loc_input = loc::InputData {
        act_state: ds.act_model_output,
        dt_s,
    };

    match ds.loc.proc(&loc_input) {
        Ok((pose, _)) => ds.pose = pose,
        Err(e) => warn!("Error during pose integration: {}", e)
    }
}

/// Write the archives of all control modules.
pub fn write_archives(ds: &mut DataStore) {
    if let Err(e) = ds.pid_ctrl.write() {
        warn!("Could not write PidCtrl archive: {}", e);
    }
    if let Err(e) = ds.act_model.write() {
        warn!("Could not write ActModel archive: {}", e);
    }
    if let Err(e) = ds.loc.write() {
        warn!("Could not write pose archive: {}", e);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{act_model, pid_ctrl, tc_processor};
    use comms_if::tc::Command;

    fn data_store() -> DataStore {
        let mut ds = DataStore::new(0.1);

        ds.pid_ctrl = pid_ctrl::PidCtrl::new(pid_ctrl::Params {
            pixel_scale: 0.01,
            rotation: pid_ctrl::AxisParams {
                k_p: 1.0,
                dead_band_min_px: -5.0,
                dead_band_max_px: 5.0,
                output_limit: 2.0,
                ..Default::default()
            },
            movement: pid_ctrl::AxisParams {
                k_p: 1.0,
                setpoint_px: 40.0,
                dead_band_min_px: 35.0,
                dead_band_max_px: 45.0,
                output_limit: 1.5,
                max_rate: Some(1.0),
                ..Default::default()
            },
        });
        ds.act_model = act_model::ActModel::new(act_model::Params::default());

        ds
    }

    #[test]
    fn test_chain_moves_robot() {
        let mut ds = data_store();

        // Measured 0 px against a setpoint of 40 px, error (40 - 0) * 0.01 = 0.4
        ds.cycle_start();
        tc_processor::exec(&mut ds, &Command::parse("none|distance#0").unwrap());
        proc_cycle(&mut ds);
        ds.cycle_end();

        assert!(ds.pid_ctrl_output.speed_cmd > 0.0);
        assert!(ds.act_model_output.speed_ms > 0.0);
        assert!(ds.pose.position_m_lm.x > 0.0);

        // Keep driving with the held command
        for _ in 0..20 {
            ds.cycle_start();
            proc_cycle(&mut ds);
            ds.cycle_end();
        }

        assert_eq!(ds.num_cycles, 21);
        assert!((ds.sim_time_s - 2.0).abs() < 1e-9);
        assert!(ds.pose.position_m_lm.x > 1.0);
        assert!(ds.pose.position_m_lm.y.abs() < 1e-9);
    }

    #[test]
    fn test_left_command_turns_left() {
        let mut ds = data_store();

        for _ in 0..10 {
            ds.cycle_start();
            tc_processor::exec(&mut ds, &Command::parse("left#100|distance#0").unwrap());
            proc_cycle(&mut ds);
            ds.cycle_end();
        }

        // error = (0 - 100) * 0.01, a negative steering angle turns towards +Y
        assert!(ds.act_model_output.steering_angle_deg < 0.0);
        assert!(ds.pose.heading_rad() > 0.0);
        assert!(ds.pose.position_m_lm.y > 0.0);
    }
}
