//! Main simulator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Start the command server, unless commands come from a script
//!     - Main loop, at a fixed period:
//!         - Command processing:
//!             - Network events drained from the action queue, or
//!             - Commands due in the script
//!         - PID control processing
//!         - Actuator model processing
//!         - Pose integration
//!         - Pose publication for the simulated camera
//!         - Archiving
//!
//! # Modules
//!
//! All modules (e.g. `pid_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use structopt::StructOpt;

// Internal
use comms_if::net::{ActionQueue, CmdServer, NetParams, ServerEvent};
use sim_lib::{
    cycle,
    data_store::DataStore,
    loc::Pose,
    params::SimExecParams,
    sim_cam::{SharedPose, SimCam},
    tc_processor,
};
use util::{
    host,
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session,
    script_interpreter::{ScriptInterpreter, PendingCmds},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive overruns after which a warning is raised to error level.
const MAX_CONSEC_OVERRUNS_WARN: u64 = 50;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options of the executable.
#[derive(Debug, StructOpt)]
#[structopt(name = "sim_exec", about = "RF robot simulator")]
struct Opts {
    /// Command script to run instead of accepting a network controller
    #[structopt(parse(from_os_str))]
    script: Option<PathBuf>,

    /// Minimum log level, one of info, debug or trace
    #[structopt(long, default_value = "trace")]
    log_level: LevelFilter,

    /// Stop after this number of cycles
    #[structopt(long)]
    max_cycles: Option<u64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the commands incoming to the exec.
enum TcSource {
    Remote {
        queue: ActionQueue<ServerEvent>,
        server: CmdServer,
    },
    Script(ScriptInterpreter)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "sim_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("RF Simulator Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;
    net_params.validate().wrap_err("Invalid net params")?;
    let exec_params: SimExecParams = util::params::load("sim_exec.toml")
        .wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s.is_finite() && exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "The cycle period must be positive, found {} s", exec_params.cycle_period_s
        ));
    }
    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::new(exec_params.cycle_period_s);

    // ---- INITIALISE MODULES ----

    ds.pid_ctrl.init("pid_ctrl.toml", &session)
        .wrap_err("Failed to initialise PidCtrl")?;
    info!("PidCtrl init complete");

    ds.act_model.init("act_model.toml", &session)
        .wrap_err("Failed to initialise ActModel")?;
    info!("ActModel init complete");

    let initial_pose = Pose::from_xy_heading(
        exec_params.initial_pos_m[0],
        exec_params.initial_pos_m[1],
        exec_params.initial_heading_rad
    );
    ds.loc.init(initial_pose, &session)
        .wrap_err("Failed to initialise the pose integrator")?;
    ds.pose = initial_pose;
    info!("PoseIntegrator init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE TC SOURCE ----

    let shared_pose: SharedPose = Arc::new(Mutex::new(initial_pose));

    let mut tc_source = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path)
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script {:?} lasts {:.02} s and contains {} commands\n",
                si.script_path(),
                si.get_duration(),
                si.get_num_cmds()
            );

            TcSource::Script(si)
        },
        None => {
            info!("No script provided, remote control via the CmdServer will be used");

            let queue = ActionQueue::new();
            let cam = SimCam::new(exec_params.cam.clone(), shared_pose.clone());
            let server = CmdServer::new(&net_params, cam, queue.sender())
                .wrap_err("Failed to initialise the CmdServer")?;

            info!("CmdServer initialised on {}\n", server.local_addr());

            TcSource::Remote { queue, server }
        }
    };

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        // ---- TELECOMMAND PROCESSING ----

        match tc_source {
            TcSource::Remote { ref queue, .. } => {
                for event in queue.drain() {
                    tc_processor::handle_event(&mut ds, event);
                }
            },
            TcSource::Script(ref mut si) =>
                match si.get_pending(ds.sim_time_s) {
                    PendingCmds::None => (),
                    PendingCmds::Some(cmds) => {
                        for cmd in cmds.iter() {
                            tc_processor::exec(&mut ds, cmd);
                        }
                    }
                    // Exit if end of script reached
                    PendingCmds::EndOfScript => {
                        info!("End of command script reached, stopping");
                        break
                    }
                }
        };

        // ---- CONTROL PROCESSING ----

        cycle::proc_cycle(&mut ds);

        // Publish the pose for the camera
        match shared_pose.lock() {
            Ok(mut p) => *p = ds.pose,
            Err(_) => error!("Shared pose poisoned, camera images will not be updated")
        }

        // ---- WRITE ARCHIVES ----

        if exec_params.archive {
            cycle::write_archives(&mut ds);
        }

        // ---- CYCLE MANAGEMENT ----

        ds.cycle_end();

        if let Some(max) = opts.max_cycles {
            if ds.num_cycles >= max {
                info!("Maximum number of cycles ({}) reached, stopping", max);
                break
            }
        }

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                ds.num_consec_cycle_overruns += 1;

                let overrun_s = cycle_dur.as_secs_f64() - cycle_period.as_secs_f64();
                if ds.num_consec_cycle_overruns >= MAX_CONSEC_OVERRUNS_WARN {
                    error!(
                        "Cycle overran by {:.06} s, {} consecutive overruns",
                        overrun_s,
                        ds.num_consec_cycle_overruns
                    );
                }
                else {
                    warn!("Cycle overran by {:.06} s", overrun_s);
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    if let TcSource::Remote { ref mut server, .. } = tc_source {
        server.shutdown();
    }

    info!("End of execution");

    Ok(())
}
