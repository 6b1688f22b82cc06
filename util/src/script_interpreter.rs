//! # Command script interpreter module
//!
//! This module provides an interpreter for command scripts, allowing the simulator to be driven
//! without a network client. A script is a list of entries of the form:
//!
//! ```text
//! <time_s>: <command>;
//! ```
//!
//! where `<command>` uses the same text grammar as the network commands, for example
//! `1.5: none|forward#100;`. Anything which does not match this form is ignored, so lines can be
//! commented out with any leading character.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::tc::{Command, CmdParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
struct ScriptedCmd {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    cmd: Command
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending` to
/// acquire a list of commands that need executing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: PathBuf,
    cmds: VecDeque<ScriptedCmd>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, CmdParseError),

    #[error("Script entries are not in time order ({0} s comes after {1} s)")]
    OutOfOrder(f64, f64),
}

/// Commands due at a given time.
#[derive(Debug, PartialEq)]
pub enum PendingCmds {
    None,
    Some(Vec<Command>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref().to_path_buf();
        
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(path, &script)
    }

    /// Create a new interpreter from the text of a script.
    ///
    /// `script_path` is only used for reporting.
    pub fn from_str<P: AsRef<Path>>(script_path: P, script: &str) -> Result<Self, ScriptError> {
        let mut cmd_queue: VecDeque<ScriptedCmd> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Group 1 and 3 always participate in a match
            let exec_time_s: f64 = cap[1].parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            let cmd = Command::parse(cap[3].trim())
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            if let Some(prev) = cmd_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s, prev.exec_time_s))
                }
            }

            cmd_queue.push_back(ScriptedCmd {
                exec_time_s,
                cmd
            });
        }

        if cmd_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            script_path: script_path.as_ref().to_path_buf(),
            cmds: cmd_queue
        })
    }

    /// Return the commands which are due at `current_time_s`, in script order.
    ///
    /// Commands are due once the current time reaches their execution time. Each command is
    /// returned only once.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingCmds {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript
        }

        let mut cmd_vec: Vec<Command> = vec![];

        while let Some(front) = self.cmds.front() {
            if front.exec_time_s > current_time_s {
                break;
            }

            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        if cmd_vec.is_empty() {
            PendingCmds::None
        }
        else {
            PendingCmds::Some(cmd_vec)
        }
    }

    /// Path of the script being interpreted
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::{Action, AxisCmd};

    const SCRIPT: &str = "\
        # Drive forward then turn
        0.0: none|forward#100;
        0.5: left#20|none;
        0.5: none|none;
        # 1.0: none|backward#10;
        2: distance#-5|distance#7;
    ";

    #[test]
    fn test_load() {
        let si = ScriptInterpreter::from_str("test.rfs", SCRIPT).unwrap();
        assert_eq!(si.get_num_cmds(), 4);
        assert_eq!(si.get_duration(), 2.0);
    }

    #[test]
    fn test_pending() {
        let mut si = ScriptInterpreter::from_str("test.rfs", SCRIPT).unwrap();

        assert_eq!(
            si.get_pending(0.0),
            PendingCmds::Some(vec![Command::new(
                AxisCmd::None,
                AxisCmd::Act { action: Action::Forward, magnitude: 100 }
            )])
        );
        assert_eq!(si.get_pending(0.1), PendingCmds::None);

        match si.get_pending(0.6) {
            PendingCmds::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[1], Command::new(AxisCmd::None, AxisCmd::None));
            },
            p => panic!("Expected two commands, got {:?}", p)
        }

        assert!(matches!(si.get_pending(5.0), PendingCmds::Some(ref v) if v.len() == 1));
        assert_eq!(si.get_pending(6.0), PendingCmds::EndOfScript);
    }

    #[test]
    fn test_invalid_cmd() {
        assert!(matches!(
            ScriptInterpreter::from_str("bad.rfs", "1.0: forward#10;"),
            Err(ScriptError::InvalidCmd(t, CmdParseError::InvalidFieldCount(1))) if t == 1.0
        ));
    }

    #[test]
    fn test_empty_and_out_of_order() {
        assert!(matches!(
            ScriptInterpreter::from_str("empty.rfs", "nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_str("order.rfs", "2.0: none|none;\n1.0: none|none;"),
            Err(ScriptError::OutOfOrder(..))
        ));
    }
}
