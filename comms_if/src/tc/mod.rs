//! # Telecommand module
//!
//! This module provides the command grammar used by the external controller to drive the robot.
//!
//! A command is a single line of text made of two fields separated by `|`, the first for rotation
//! and the second for movement:
//!
//! ```text
//! <rotation_field>|<movement_field>
//! ```
//!
//! Each field is either `none` or `<action>#<magnitude>`, where the magnitude is an integer
//! number of pixels.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::fmt;
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Separates the rotation field from the movement field.
pub const FIELD_DELIMITER: char = '|';

/// Separates an action from its magnitude.
pub const MAGNITUDE_DELIMITER: char = '#';

/// Literal used to state that an axis has no command.
pub const NONE_LITERAL: &str = "none";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A parsed command, i.e. one instruction sent to the simulator by the controller.
///
/// Each field is kept independently so that a malformed field does not prevent the other one
/// from being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The rotation (steering) field
    pub rotation: Result<AxisCmd, FieldParseError>,

    /// The movement (speed) field
    pub movement: Result<AxisCmd, FieldParseError>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two axes that can be commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    Rotation,
    Movement,
}

/// Actions which may appear in a command field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,

    /// Raw signed pixel distance, valid on both axes
    Distance,
}

/// The intent for a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisCmd {
    /// No command for this axis, the axis goes to its idle value.
    None,

    /// An action with a magnitude in pixels.
    Act {
        action: Action,
        magnitude: i64,
    },
}

/// Errors for a whole command frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmdParseError {
    #[error("Expected exactly 2 fields separated by '|', found {0}")]
    InvalidFieldCount(usize),
}

/// Errors for an individual field of a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("Field \"{0}\" has no magnitude (expected <action>#<magnitude>)")]
    MissingMagnitude(String),

    #[error("Field \"{0}\" has a magnitude which is not an integer")]
    InvalidMagnitude(String),

    #[error("Unknown action \"{0}\"")]
    UnknownAction(String),

    #[error("Action {0:?} cannot be used on the {1:?} axis")]
    ActionNotValidForAxis(Action, Axis),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Command {
    /// Parse a command from its textual representation.
    ///
    /// Only a wrong number of fields is an error for the whole command, errors inside a field are
    /// stored in that field.
    pub fn parse(raw: &str) -> Result<Self, CmdParseError> {
        let fields: Vec<&str> = raw.trim().split(FIELD_DELIMITER).collect();

        if fields.len() != 2 {
            return Err(CmdParseError::InvalidFieldCount(fields.len()));
        }

        Ok(Self {
            rotation: AxisCmd::parse(fields[0], Axis::Rotation),
            movement: AxisCmd::parse(fields[1], Axis::Movement),
        })
    }

    /// Build a command from two valid axis commands.
    pub fn new(rotation: AxisCmd, movement: AxisCmd) -> Self {
        Self {
            rotation: Ok(rotation),
            movement: Ok(movement),
        }
    }

    /// Get the field for the given axis.
    pub fn field(&self, axis: Axis) -> &Result<AxisCmd, FieldParseError> {
        match axis {
            Axis::Rotation => &self.rotation,
            Axis::Movement => &self.movement,
        }
    }
}

impl fmt::Display for Command {
    /// Renders the command in wire format. Invalid fields are rendered as `none`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |field: &Result<AxisCmd, FieldParseError>| match field {
            Ok(c) => c.to_string(),
            Err(_) => NONE_LITERAL.to_string(),
        };

        write!(
            f,
            "{}{}{}",
            render(&self.rotation),
            FIELD_DELIMITER,
            render(&self.movement)
        )
    }
}

impl AxisCmd {
    /// Parse a single field for the given axis.
    pub fn parse(field: &str, axis: Axis) -> Result<Self, FieldParseError> {
        let field = field.trim();

        if field.eq_ignore_ascii_case(NONE_LITERAL) {
            return Ok(AxisCmd::None);
        }

        let (token, magnitude_str) = match field.split_once(MAGNITUDE_DELIMITER) {
            Some(p) => p,
            None => return Err(FieldParseError::MissingMagnitude(field.to_string())),
        };

        let action = Action::from_token(token)
            .ok_or_else(|| FieldParseError::UnknownAction(token.trim().to_string()))?;

        if !action.valid_for(axis) {
            return Err(FieldParseError::ActionNotValidForAxis(action, axis));
        }

        let magnitude = magnitude_str
            .trim()
            .parse::<i64>()
            .map_err(|_| FieldParseError::InvalidMagnitude(field.to_string()))?;

        Ok(AxisCmd::Act { action, magnitude })
    }

    /// The signed measurement in pixels carried by this command, or `None` for the none command.
    ///
    /// Forward and left map to positive values, backward and right to negative ones, distance is
    /// passed through unchanged.
    pub fn measurement_px(&self) -> Option<f64> {
        match *self {
            AxisCmd::None => None,
            AxisCmd::Act { action, magnitude } => {
                let m = magnitude as f64;
                Some(match action {
                    Action::Forward | Action::Left | Action::Distance => m,
                    Action::Backward | Action::Right => -m,
                })
            }
        }
    }
}

impl fmt::Display for AxisCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisCmd::None => write!(f, "{}", NONE_LITERAL),
            AxisCmd::Act { action, magnitude } => {
                write!(f, "{}{}{}", action.token(), MAGNITUDE_DELIMITER, magnitude)
            }
        }
    }
}

impl Action {
    fn from_token(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Some(Action::Forward),
            "backward" => Some(Action::Backward),
            "left" => Some(Action::Left),
            "right" => Some(Action::Right),
            "distance" => Some(Action::Distance),
            _ => None,
        }
    }

    /// The wire token of this action.
    pub fn token(&self) -> &'static str {
        match self {
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Left => "left",
            Action::Right => "right",
            Action::Distance => "distance",
        }
    }

    /// Whether this action may appear on the given axis.
    pub fn valid_for(&self, axis: Axis) -> bool {
        match (self, axis) {
            (Action::Distance, _) => true,
            (Action::Forward | Action::Backward, Axis::Movement) => true,
            (Action::Left | Action::Right, Axis::Rotation) => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
