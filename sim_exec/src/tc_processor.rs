//! # Telecommand processor module
//!
//! The telecommand processor handles commands and network events coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::{
    net::ServerEvent,
    tc::{Axis, Command},
};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a command.
///
/// Valid fields are set in the PID control input, replacing any field received earlier in the same
/// cycle. Invalid fields are skipped with a warning, the other field still applies.
pub fn exec(ds: &mut DataStore, cmd: &Command) {
    debug!("Executing command \"{}\"", cmd);

    for axis in [Axis::Rotation, Axis::Movement] {
        match cmd.field(axis) {
            Ok(c) => match axis {
                Axis::Rotation => ds.pid_ctrl_input.rotation = Some(*c),
                Axis::Movement => ds.pid_ctrl_input.movement = Some(*c),
            },
            Err(e) => warn!("Skipping {:?} field: {}", axis, e)
        }
    }
}

/// Handle an event from the command server.
pub fn handle_event(ds: &mut DataStore, event: ServerEvent) {
    match event {
        ServerEvent::ClientConnected { session_id, peer } => {
            info!("Controller connected from {} (session {})", peer, session_id);
            ds.session_started(session_id);
        },
        ServerEvent::Command { session_id, cmd } => {
            if ds.active_session == Some(session_id) {
                exec(ds, &cmd);
            }
            else {
                debug!("Ignoring command from inactive session {}", session_id);
            }
        },
        ServerEvent::ClientDisconnected { session_id, reason } => {
            if ds.session_ended(session_id) {
                info!(
                    "Controller disconnected ({}), holding the last command",
                    reason
                );
            }
            else {
                debug!("Ignoring disconnect of inactive session {}", session_id);
            }
        },
        ServerEvent::AcceptorHalted(reason) => ds.halt_acceptor(&reason),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{
        net::DisconnectReason,
        tc::{Action, AxisCmd},
    };

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn test_later_valid_fields_win() {
        let mut ds = DataStore::new(0.1);
        ds.cycle_start();

        exec(&mut ds, &Command::parse("left#5|forward#10").unwrap());
        exec(&mut ds, &Command::parse("none|forward").unwrap());

        assert_eq!(ds.pid_ctrl_input.rotation, Some(AxisCmd::None));
        assert_eq!(
            ds.pid_ctrl_input.movement,
            Some(AxisCmd::Act { action: Action::Forward, magnitude: 10 })
        );
    }

    #[test]
    fn test_session_events() {
        let mut ds = DataStore::new(0.1);
        ds.cycle_start();

        handle_event(&mut ds, ServerEvent::ClientConnected { session_id: 1, peer: peer() });
        handle_event(&mut ds, ServerEvent::ClientDisconnected {
            session_id: 1,
            reason: DisconnectReason::Superseded,
        });
        handle_event(&mut ds, ServerEvent::ClientConnected { session_id: 2, peer: peer() });
        assert_eq!(ds.active_session, Some(2));

        // Commands from an old session are dropped
        handle_event(&mut ds, ServerEvent::Command {
            session_id: 1,
            cmd: Command::parse("left#5|none").unwrap(),
        });
        assert_eq!(ds.pid_ctrl_input.rotation, None);

        handle_event(&mut ds, ServerEvent::Command {
            session_id: 2,
            cmd: Command::parse("left#5|none").unwrap(),
        });
        assert!(ds.pid_ctrl_input.rotation.is_some());

        // A late disconnect of the old session does not end the new one
        handle_event(&mut ds, ServerEvent::ClientDisconnected {
            session_id: 1,
            reason: DisconnectReason::PeerClosed,
        });
        assert_eq!(ds.active_session, Some(2));

        handle_event(&mut ds, ServerEvent::ClientDisconnected {
            session_id: 2,
            reason: DisconnectReason::PeerClosed,
        });
        assert_eq!(ds.active_session, None);

        handle_event(&mut ds, ServerEvent::AcceptorHalted("test".into()));
        assert!(ds.acceptor_halted);
    }
}
