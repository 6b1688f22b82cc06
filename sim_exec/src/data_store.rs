//! # Data Store

use log::{error, info};

use crate::{
    act_model,
    loc::{self, Pose},
    pid_ctrl,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Fixed period of one cycle
    pub cycle_period_s: f64,

    /// Simulation elapsed time, advanced by exactly one period per cycle
    pub sim_time_s: f64,

    // Network
    /// Id of the connected client's session, if any
    pub active_session: Option<u64>,

    /// The acceptor stopped and no further client can connect
    pub acceptor_halted: bool,

    // PidCtrl
    pub pid_ctrl: pid_ctrl::PidCtrl,
    pub pid_ctrl_input: pid_ctrl::InputData,
    pub pid_ctrl_output: pid_ctrl::OutputData,
    pub pid_ctrl_status_rpt: pid_ctrl::StatusReport,

    // ActModel
    pub act_model: act_model::ActModel,
    pub act_model_output: act_model::ActuatorState,
    pub act_model_status_rpt: act_model::StatusReport,

    // Localisation
    pub loc: loc::PoseIntegrator,
    pub pose: Pose,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a new data store for the given cycle period.
    pub fn new(cycle_period_s: f64) -> Self {
        Self {
            cycle_period_s,
            ..Default::default()
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the module inputs, which only hold the commands received during the cycle, and sets
    /// the simulation time.
    pub fn cycle_start(&mut self) {
        self.pid_ctrl_input = pid_ctrl::InputData {
            dt_s: self.cycle_period_s,
            ..Default::default()
        };

        self.sim_time_s = self.num_cycles as f64 * self.cycle_period_s;
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Record that a client session started.
    pub fn session_started(&mut self, session_id: u64) {
        if let Some(old) = self.active_session.replace(session_id) {
            info!("Session {} replaces session {}", session_id, old);
        }
    }

    /// Record that a client session ended. Ends of sessions other than the active one are ignored.
    ///
    /// Returns true if the active session ended.
    pub fn session_ended(&mut self, session_id: u64) -> bool {
        if self.active_session == Some(session_id) {
            self.active_session = None;
            true
        }
        else {
            false
        }
    }

    /// Record that the acceptor halted.
    pub fn halt_acceptor(&mut self, reason: &str) {
        if !self.acceptor_halted {
            error!("No further clients can connect: {}", reason);
        }
        self.acceptor_halted = true;
    }
}
