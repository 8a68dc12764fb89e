use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::common::{Coordinate, Phase};
use crate::ship::ShipKind;

/// Why a ship placement was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum PlacementError {
    #[error("cell {0} is outside the board")]
    OutOfBounds(Coordinate),

    #[error("ship cells are not on a single row or column")]
    NotStraight,

    #[error("ship cells are not contiguous")]
    NotContiguous,

    #[error("{kind} needs {expected} cells, got {actual}")]
    WrongLength {
        kind: ShipKind,
        expected: usize,
        actual: usize,
    },

    #[error("ship overlaps another ship at {0}")]
    Overlaps(Coordinate),

    #[error("no {0} left to place in this fleet")]
    NotInFleet(ShipKind),
}

/// Errors returned by core operations. All of them are recoverable and leave
/// the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GameError {
    #[error("invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    #[error("coordinate was already targeted")]
    DuplicateShot,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("action not allowed while session is {phase}")]
    InvalidPhase { phase: Phase },

    #[error("coordinate is outside the board")]
    OutOfBounds,

    #[error("player is not waiting for a match")]
    NotWaiting,

    #[error("player has no active session")]
    NoActiveSession,

    #[error("player is not part of this session")]
    NotAParticipant,

    #[error("player is already waiting for a match")]
    AlreadyQueued,

    #[error("player is already in a session")]
    AlreadyInSession,

    #[error("internal contract violated: {0}")]
    ContractViolation(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_error_display() {
        let err = GameError::from(PlacementError::WrongLength {
            kind: ShipKind::Destroyer,
            expected: 2,
            actual: 3,
        });
        assert_eq!(
            err.to_string(),
            "invalid placement: Destroyer needs 2 cells, got 3"
        );
    }

    #[test]
    fn test_phase_error_display() {
        let err = GameError::InvalidPhase {
            phase: Phase::Finished,
        };
        assert_eq!(err.to_string(), "action not allowed while session is finished");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("board_size must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: board_size must be > 0"
        );
    }
}
