//! Game session state machine.
//!
//! A [`Session`] is a cheap, cloneable handle to one match. All of its state
//! sits behind a single per-session lock, so validation and application of an
//! action happen in one critical section and actions can never interleave.
//!
//! ```text
//! WaitingForPlayers --(2nd seat)--> Setup --(both fleets ready)--> Active
//!        |                            |                             |  ^
//!        |                            |                             +--+ shot (turn toggles)
//!        +------ forfeit / timeout ---+-----------------------------+--> Finished
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::arbiter;
use crate::board::{Board, OwnBoardView, TargetView};
use crate::common::{Coordinate, Outcome, Phase, PlayerId, SessionId};
use crate::config::{Ruleset, StartRule};
use crate::dispatcher::{self, Dispatcher, EventStream, Transition};
use crate::error::GameError;
use crate::ship::ShipPlacement;

/// One applied shot, as recorded in the session's move log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub seq: u32,
    pub player: PlayerId,
    pub target: Coordinate,
    pub outcome: Outcome,
}

/// Why a session reached `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishCause {
    /// A shot sank the last ship of the losing board.
    FleetDestroyed,
    /// A player gave up.
    Forfeit,
    /// A player's connection went away.
    Disconnect,
    /// Nobody moved within the idle timeout.
    Timeout,
}

impl FinishCause {
    /// Whether the session was cut short rather than played out.
    pub fn is_forced(&self) -> bool {
        !matches!(self, FinishCause::FleetDestroyed)
    }
}

/// Terminal record of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRecord {
    pub winner: Option<PlayerId>,
    pub cause: FinishCause,
}

/// Why a player leaves a running session early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForfeitReason {
    Voluntary,
    Disconnect,
}

impl From<ForfeitReason> for FinishCause {
    fn from(reason: ForfeitReason) -> Self {
        match reason {
            ForfeitReason::Voluntary => FinishCause::Forfeit,
            ForfeitReason::Disconnect => FinishCause::Disconnect,
        }
    }
}

/// Point-in-time summary of a session, without any board contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub phase: Phase,
    pub players: Vec<PlayerId>,
    pub turn: Option<PlayerId>,
    pub moves: usize,
    pub finish: Option<FinishRecord>,
}

pub(crate) struct Seat {
    pub(crate) player: PlayerId,
    pub(crate) board: Board,
    pub(crate) acknowledged: bool,
}

pub(crate) struct SessionState {
    pub(crate) id: SessionId,
    pub(crate) ruleset: Ruleset,
    pub(crate) phase: Phase,
    pub(crate) seats: Vec<Seat>,
    /// Seat index holding the turn while `Active`.
    pub(crate) turn: Option<usize>,
    /// Seat indices in the order their fleets became complete.
    pub(crate) ready_order: Vec<usize>,
    pub(crate) moves: Vec<Move>,
    pub(crate) finish: Option<FinishRecord>,
    last_activity: Instant,
    finished_at: Option<Instant>,
    released: bool,
    dispatcher: Dispatcher,
}

impl SessionState {
    pub(crate) fn seat_of(&self, player: PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| s.player == player)
    }

    /// Seat index of the other player, if seated.
    pub(crate) fn opponent_of(&self, seat: usize) -> Option<usize> {
        let other = 1 - seat;
        (other < self.seats.len()).then_some(other)
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn publish(&mut self, transition: Transition) {
        let out = dispatcher::render(&transition, self);
        self.dispatcher.deliver(out);
    }

    fn start(&mut self) {
        let first = match self.ruleset.start_rule {
            StartRule::FirstJoiner => 0,
            StartRule::FirstReady => self.ready_order.first().copied().unwrap_or(0),
        };
        self.phase = Phase::Active;
        self.turn = Some(first);
        log::info!(
            "{}: all fleets ready, {} fires first",
            self.id,
            self.seats[first].player
        );
        self.publish(Transition::Started);
    }

    fn conclude(&mut self, winner: Option<PlayerId>, cause: FinishCause) {
        self.phase = Phase::Finished;
        self.turn = None;
        self.finish = Some(FinishRecord { winner, cause });
        self.finished_at = Some(Instant::now());
        match winner {
            Some(w) => log::info!("{}: finished ({:?}), winner {}", self.id, cause, w),
            None => log::info!("{}: finished ({:?}) without a winner", self.id, cause),
        }
        self.publish(Transition::Finished);
    }
}

/// Handle to one live match. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Create an empty session waiting for its two players.
    pub(crate) fn new(id: SessionId, ruleset: Ruleset) -> Self {
        let state = SessionState {
            id,
            ruleset,
            phase: Phase::WaitingForPlayers,
            seats: Vec::with_capacity(2),
            turn: None,
            ready_order: Vec::with_capacity(2),
            moves: Vec::new(),
            finish: None,
            last_activity: Instant::now(),
            finished_at: None,
            released: false,
            dispatcher: Dispatcher::default(),
        };
        Session {
            id,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Put `player` into the next free seat. The second seat moves the
    /// session to `Setup`.
    pub(crate) fn seat(&self, player: PlayerId) -> Result<Phase, GameError> {
        let mut state = self.state.lock();
        if state.phase != Phase::WaitingForPlayers {
            return Err(GameError::InvalidPhase { phase: state.phase });
        }
        if state.seat_of(player).is_some() {
            return Err(GameError::AlreadyInSession);
        }
        let board = Board::new(&state.ruleset);
        state.seats.push(Seat {
            player,
            board,
            acknowledged: false,
        });
        state.touch();
        if state.seats.len() == 2 {
            state.phase = Phase::Setup;
            state.publish(Transition::Matched);
        }
        Ok(state.phase)
    }

    /// Place ships on `player`'s board. The call is all-or-nothing. Returns
    /// whether the player's fleet is complete.
    pub fn place_ships(&self, player: PlayerId, ships: &[ShipPlacement]) -> Result<bool, GameError> {
        let mut state = self.state.lock();
        let seat = arbiter::may_place(&state, player)?;
        let ready = state.seats[seat].board.place_fleet(ships)?;
        state.touch();

        let newly_ready = ready && !state.ready_order.contains(&seat);
        if newly_ready {
            state.ready_order.push(seat);
        }
        state.publish(Transition::FleetPlaced { seat, newly_ready });

        let all_ready = state.seats.len() == 2 && state.seats.iter().all(|s| s.board.is_ready());
        if all_ready {
            state.start();
        }
        Ok(ready)
    }

    /// Fire at `target` on the opponent's board.
    pub fn submit_move(&self, player: PlayerId, target: Coordinate) -> Result<Outcome, GameError> {
        let mut state = self.state.lock();
        let verdict = arbiter::adjudicate(&state, player, target)?;
        let outcome = state.seats[verdict.defender].board.apply_shot(target)?;
        if outcome != verdict.outcome {
            return Err(GameError::ContractViolation(format!(
                "shot at {} resolved to {:?}, arbiter predicted {:?}",
                target, outcome, verdict.outcome
            )));
        }

        let mv = Move {
            seq: state.moves.len() as u32,
            player,
            target,
            outcome,
        };
        state.moves.push(mv);
        state.touch();
        log::debug!("{}: {} fired at {} -> {:?}", state.id, player, target, outcome);

        if matches!(outcome, Outcome::Win(_)) {
            state.publish(Transition::ShotApplied {
                mv,
                shooter: verdict.shooter,
                defender: verdict.defender,
            });
            state.conclude(Some(player), FinishCause::FleetDestroyed);
        } else {
            state.turn = Some(verdict.defender);
            state.publish(Transition::ShotApplied {
                mv,
                shooter: verdict.shooter,
                defender: verdict.defender,
            });
        }
        Ok(outcome)
    }

    /// End the session early on behalf of `player`. The other player, if
    /// seated, is recorded as the winner. Honored in any phase but
    /// `Finished`, regardless of whose turn it is.
    pub fn forfeit(&self, player: PlayerId, reason: ForfeitReason) -> Result<FinishRecord, GameError> {
        let mut state = self.state.lock();
        let seat = arbiter::may_forfeit(&state, player)?;
        let winner = state.opponent_of(seat).map(|o| state.seats[o].player);
        state.conclude(winner, reason.into());
        state
            .finish
            .ok_or_else(|| GameError::ContractViolation("finish record missing".into()))
    }

    /// Record that `player` has seen the final result. Returns `true` once
    /// every seated player has acknowledged.
    pub fn acknowledge(&self, player: PlayerId) -> Result<bool, GameError> {
        let mut state = self.state.lock();
        let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
        if state.phase != Phase::Finished {
            return Err(GameError::InvalidPhase { phase: state.phase });
        }
        state.seats[seat].acknowledged = true;
        Ok(state.seats.iter().all(|s| s.acknowledged))
    }

    /// Stream of events for `player`. The stream starts with a snapshot of the
    /// player's current view and ends when the session is released.
    pub fn subscribe(&self, player: PlayerId) -> Result<EventStream, GameError> {
        let mut state = self.state.lock();
        let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
        if state.released {
            return Err(GameError::NoActiveSession);
        }
        let snapshot = dispatcher::snapshot(&state, seat);
        Ok(state.dispatcher.subscribe(player, snapshot))
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Players in seat order (first joiner first).
    pub fn players(&self) -> Vec<PlayerId> {
        self.state.lock().seats.iter().map(|s| s.player).collect()
    }

    /// Player holding the turn, while `Active`.
    pub fn current_turn(&self) -> Option<PlayerId> {
        let state = self.state.lock();
        state.turn.map(|t| state.seats[t].player)
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.state.lock().finish.and_then(|f| f.winner)
    }

    pub fn finish_record(&self) -> Option<FinishRecord> {
        self.state.lock().finish
    }

    /// Copy of the move log, oldest first.
    pub fn moves(&self) -> Vec<Move> {
        self.state.lock().moves.clone()
    }

    pub fn ruleset(&self) -> Ruleset {
        self.state.lock().ruleset.clone()
    }

    /// Full view of `player`'s own board.
    pub fn own_view(&self, player: PlayerId) -> Result<OwnBoardView, GameError> {
        let state = self.state.lock();
        let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
        Ok(state.seats[seat].board.own_view())
    }

    /// What `player` may know about the opponent's board.
    pub fn tracking_view(&self, player: PlayerId) -> Result<TargetView, GameError> {
        let state = self.state.lock();
        let seat = state.seat_of(player).ok_or(GameError::NotAParticipant)?;
        let opponent = state
            .opponent_of(seat)
            .ok_or(GameError::InvalidPhase { phase: state.phase })?;
        Ok(state.seats[opponent].board.target_view())
    }

    pub fn summary(&self) -> SessionSummary {
        let state = self.state.lock();
        SessionSummary {
            id: state.id,
            phase: state.phase,
            players: state.seats.iter().map(|s| s.player).collect(),
            turn: state.turn.map(|t| state.seats[t].player),
            moves: state.moves.len(),
            finish: state.finish,
        }
    }

    /// Force an unfinished session that has been idle for `idle_timeout` to
    /// end. Returns `true` if the session was expired by this call.
    pub(crate) fn expire_if_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.phase == Phase::Finished
            || now.saturating_duration_since(state.last_activity) < idle_timeout
        {
            return false;
        }
        let winner = match state.phase {
            // the idle player is the one holding the turn
            Phase::Active => state
                .turn
                .and_then(|t| state.opponent_of(t))
                .map(|o| state.seats[o].player),
            Phase::Setup if state.ready_order.len() == 1 => {
                Some(state.seats[state.ready_order[0]].player)
            }
            _ => None,
        };
        log::warn!("{}: idle for {:?}, forcing finish", state.id, idle_timeout);
        state.conclude(winner, FinishCause::Timeout);
        true
    }

    /// Whether the session is finished and either fully acknowledged or past
    /// its linger period.
    pub(crate) fn is_releasable(&self, now: Instant, linger: Duration) -> bool {
        let state = self.state.lock();
        if state.phase != Phase::Finished {
            return false;
        }
        let acked = !state.seats.is_empty() && state.seats.iter().all(|s| s.acknowledged);
        let lingered = state
            .finished_at
            .map(|at| now.saturating_duration_since(at) >= linger)
            .unwrap_or(false);
        acked || lingered
    }

    /// Notify subscribers that the session is gone and close their streams.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if state.released {
            return;
        }
        state.released = true;
        state.publish(Transition::Released);
        state.dispatcher.close();
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
