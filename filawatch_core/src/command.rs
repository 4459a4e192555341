//! Operator command grammar shared by the console front ends and fuzzing.
//!
//! Commands follow the machine-console convention: an upper-case command
//! word followed by KEY=VALUE parameters. Parsing is case-insensitive.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    /// Read the motion statistics report.
    QueryFilamentMotion,
    /// Reset the motion statistics store to its empty state.
    ResetFilamentMotionStats,
    /// Override the detection length (mm) until the process restarts.
    SetFilamentMotionDetectLength(f64),
    /// Dump the merged status snapshot.
    Status,
    /// End the monitoring session.
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandParseError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} requires VALUE=<mm>")]
    MissingValue(&'static str),
    #[error("VALUE must be a positive number of millimeters, got {0:?}")]
    InvalidValue(String),
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<OperatorCommand>, CommandParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    match head.to_ascii_uppercase().as_str() {
        "QUERY_FILAMENT_MOTION" => Ok(Some(OperatorCommand::QueryFilamentMotion)),
        "RESET_FILAMENT_MOTION_STATS" => Ok(Some(OperatorCommand::ResetFilamentMotionStats)),
        "SET_FILAMENT_MOTION_DETECT_LENGTH" => {
            for word in words {
                let Some((key, raw)) = word.split_once('=') else {
                    continue;
                };
                if !key.eq_ignore_ascii_case("VALUE") {
                    continue;
                }
                let value: f64 = raw
                    .parse()
                    .map_err(|_| CommandParseError::InvalidValue(raw.to_string()))?;
                if !value.is_finite() || value <= 0.0 {
                    return Err(CommandParseError::InvalidValue(raw.to_string()));
                }
                return Ok(Some(OperatorCommand::SetFilamentMotionDetectLength(value)));
            }
            Err(CommandParseError::MissingValue(
                "SET_FILAMENT_MOTION_DETECT_LENGTH",
            ))
        }
        "STATUS" => Ok(Some(OperatorCommand::Status)),
        "QUIT" | "EXIT" => Ok(Some(OperatorCommand::Quit)),
        _ => Err(CommandParseError::Unknown(head.to_string())),
    }
}
