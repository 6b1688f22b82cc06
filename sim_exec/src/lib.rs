//! # Simulator library.
//!
//! This library allows other crates in the workspace, as well as the tests and benchmarks, to
//! access items defined inside the simulator crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Actuator model - converts speed and steering commands into the robot's speed and steering angle
pub mod act_model;

/// Cycle processing - runs the control chain once per cycle
pub mod cycle;

/// Global data store of the executable
pub mod data_store;

/// Localisation module - integrates the robot's pose
pub mod loc;

/// Executable parameters
pub mod params;

/// PID control module - converts commands into speed and steering commands
pub mod pid_ctrl;

/// Simulated camera - renders the images sent to the controller
pub mod sim_cam;

/// Telecommand processor - applies commands and network events to the data store
pub mod tc_processor;
