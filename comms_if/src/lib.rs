//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the simulator and its controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command grammar shared by the controller and the simulator
pub mod tc;

/// Interfaces to equipment (like cameras)
pub mod eqpt;

/// Network module
pub mod net;
