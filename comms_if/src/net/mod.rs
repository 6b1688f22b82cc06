//! # Network Module
//!
//! This module provides the networking used between the simulator and its controller: a plain
//! TCP stream carrying length-prefixed frames in both directions.
//!
//! - [`frame`]: framing of the byte stream
//! - [`queue`]: the action queue which carries network events into the control thread
//! - [`server`]: the command server, accepting a single client and running its session

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod frame;
pub mod queue;
pub mod server;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;
use serde::Deserialize;

pub use queue::{ActionQueue, ActionSender};
pub use server::{CmdServer, CmdServerError, DisconnectReason, ServerEvent};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Errors in the network parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetParamsError {
    #[error("{0} must be a finite, non-negative number of seconds, found {1}")]
    InvalidDuration(&'static str, f64),
}

/// Network parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Endpoint the command server listens on, for example `"127.0.0.1:2737"`.
    pub cmd_endpoint: String,

    /// Period between two telemetry (image) frames sent to the client.
    ///
    /// Units: seconds
    pub telemetry_interval_s: f64,

    /// Maximum time the session waits for data from the client before dropping it. A value of 0
    /// disables the timeout.
    ///
    /// Units: seconds
    #[serde(default)]
    pub read_timeout_s: f64,

    /// Largest command frame body accepted from the client.
    ///
    /// Units: bytes
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NetParams {
    /// Check that every duration in the parameters can be used.
    pub fn validate(&self) -> Result<(), NetParamsError> {
        self.telemetry_interval()?;
        self.read_timeout()?;
        Ok(())
    }

    /// The telemetry interval as a duration.
    pub fn telemetry_interval(&self) -> Result<Duration, NetParamsError> {
        to_duration("telemetry_interval_s", self.telemetry_interval_s)
    }

    /// The read timeout as a duration, or `None` if disabled.
    pub fn read_timeout(&self) -> Result<Option<Duration>, NetParamsError> {
        let timeout = to_duration("read_timeout_s", self.read_timeout_s)?;

        if timeout.is_zero() {
            Ok(None)
        }
        else {
            Ok(Some(timeout))
        }
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            cmd_endpoint: String::from("127.0.0.1:2737"),
            telemetry_interval_s: 0.1,
            read_timeout_s: 0.0,
            max_frame_len: default_max_frame_len(),
        }
    }
}

fn default_max_frame_len() -> usize {
    64 * 1024
}

fn to_duration(name: &'static str, secs: f64) -> Result<Duration, NetParamsError> {
    Duration::try_from_secs_f64(secs).map_err(|_| NetParamsError::InvalidDuration(name, secs))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_durations() {
        let params = NetParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.telemetry_interval(), Ok(Duration::from_millis(100)));
        assert_eq!(params.read_timeout(), Ok(None));
    }

    #[test]
    fn test_invalid_durations() {
        let mut params = NetParams {
            read_timeout_s: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(NetParamsError::InvalidDuration("read_timeout_s", f64::INFINITY))
        );

        params.read_timeout_s = 2.5;
        assert_eq!(params.read_timeout(), Ok(Some(Duration::from_millis(2500))));

        params.telemetry_interval_s = -0.1;
        assert!(matches!(
            params.telemetry_interval(),
            Err(NetParamsError::InvalidDuration("telemetry_interval_s", _))
        ));

        params.telemetry_interval_s = f64::NAN;
        assert!(params.validate().is_err());
    }
}
