//! Move validation and turn arbitration.
//!
//! Stateless checks over a borrowed session state. The session calls these
//! before it touches anything, so a rejected action never mutates state.

use crate::common::{Coordinate, Outcome, Phase, PlayerId};
use crate::error::GameError;
use crate::session::SessionState;

/// An accepted shot: who fires, whose board is hit and what it will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Verdict {
    pub(crate) shooter: usize,
    pub(crate) defender: usize,
    pub(crate) outcome: Outcome,
}

/// Validate a shot by `player` at `target`.
pub(crate) fn adjudicate(
    state: &SessionState,
    player: PlayerId,
    target: Coordinate,
) -> Result<Verdict, GameError> {
    let shooter = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
    if state.phase != Phase::Active {
        return Err(GameError::InvalidPhase { phase: state.phase });
    }
    if state.turn != Some(shooter) {
        return Err(GameError::NotYourTurn);
    }
    let defender = state.opponent_of(shooter).ok_or_else(|| {
        GameError::ContractViolation(format!("{} is active with a single seat", state.id))
    })?;
    let board = &state.seats[defender].board;
    if !board.is_ready() {
        return Err(GameError::ContractViolation(format!(
            "{} is active with an incomplete fleet",
            state.id
        )));
    }
    let outcome = board.preview_shot(target)?;
    Ok(Verdict {
        shooter,
        defender,
        outcome,
    })
}

/// Check that `player` may place ships now; returns their seat.
pub(crate) fn may_place(state: &SessionState, player: PlayerId) -> Result<usize, GameError> {
    let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
    if state.phase != Phase::Setup {
        return Err(GameError::InvalidPhase { phase: state.phase });
    }
    Ok(seat)
}

/// Check that `player` may abandon the session; returns their seat.
pub(crate) fn may_forfeit(state: &SessionState, player: PlayerId) -> Result<usize, GameError> {
    let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
    if state.phase == Phase::Finished {
        return Err(GameError::InvalidPhase { phase: state.phase });
    }
    Ok(seat)
}
