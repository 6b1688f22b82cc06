//! # Equipment Interface
//!
//! This module defines the interfaces the simulator core needs from its equipment collaborators.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cam;
