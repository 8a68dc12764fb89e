//! Turns session transitions into per-player outbound events.
//!
//! Every event is rendered for one recipient. A player's own board travels
//! only to that player; the opponent sees shot results and sunk ships through
//! a [`TargetView`], never the cells of a ship that is still afloat.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::board::{OwnBoardView, TargetView};
use crate::common::{Coordinate, Outcome, Phase, PlayerId, SessionId};
use crate::config::Ruleset;
use crate::session::{FinishCause, FinishRecord, Move, SessionState};

/// Message pushed to a single player's connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundEvent {
    /// Current view of the session, sent first on every subscription.
    Snapshot {
        session: SessionId,
        phase: Phase,
        opponent: Option<PlayerId>,
        your_turn: bool,
        board: OwnBoardView,
        tracking: Option<TargetView>,
        finish: Option<FinishRecord>,
    },
    /// Both seats are filled; ships may be placed.
    Matched {
        session: SessionId,
        opponent: PlayerId,
        ruleset: Ruleset,
    },
    /// Your ships were accepted.
    FleetPlaced { board: OwnBoardView, ready: bool },
    /// The opponent's fleet is complete.
    OpponentReady,
    GameStarted { first: PlayerId, your_turn: bool },
    /// Result of your own shot.
    ShotFired {
        target: Coordinate,
        outcome: Outcome,
        tracking: TargetView,
        your_turn: bool,
    },
    /// The opponent fired at your board.
    ShotReceived {
        target: Coordinate,
        outcome: Outcome,
        board: OwnBoardView,
        your_turn: bool,
    },
    SessionFinished {
        winner: Option<PlayerId>,
        cause: FinishCause,
        you_won: bool,
    },
    /// The session was released; the stream ends after this event.
    Released { session: SessionId },
}

/// State changes the dispatcher knows how to announce.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Transition {
    Matched,
    FleetPlaced { seat: usize, newly_ready: bool },
    Started,
    ShotApplied {
        mv: Move,
        shooter: usize,
        defender: usize,
    },
    Finished,
    Released,
}

/// Render `transition` into one event per affected player, reading the
/// already-updated session state.
pub(crate) fn render(transition: &Transition, state: &SessionState) -> Vec<(PlayerId, OutboundEvent)> {
    let mut out = Vec::with_capacity(2);
    match *transition {
        Transition::Matched => {
            for (i, seat) in state.seats.iter().enumerate() {
                if let Some(o) = state.opponent_of(i) {
                    out.push((
                        seat.player,
                        OutboundEvent::Matched {
                            session: state.id,
                            opponent: state.seats[o].player,
                            ruleset: state.ruleset.clone(),
                        },
                    ));
                }
            }
        }
        Transition::FleetPlaced { seat, newly_ready } => {
            let board = &state.seats[seat].board;
            out.push((
                state.seats[seat].player,
                OutboundEvent::FleetPlaced {
                    board: board.own_view(),
                    ready: board.is_ready(),
                },
            ));
            if newly_ready {
                if let Some(o) = state.opponent_of(seat) {
                    out.push((state.seats[o].player, OutboundEvent::OpponentReady));
                }
            }
        }
        Transition::Started => {
            if let Some(turn) = state.turn {
                let first = state.seats[turn].player;
                for (i, seat) in state.seats.iter().enumerate() {
                    out.push((
                        seat.player,
                        OutboundEvent::GameStarted {
                            first,
                            your_turn: i == turn,
                        },
                    ));
                }
            }
        }
        Transition::ShotApplied {
            mv,
            shooter,
            defender,
        } => {
            let live = state.phase == Phase::Active && !matches!(mv.outcome, Outcome::Win(_));
            let board = &state.seats[defender].board;
            out.push((
                state.seats[shooter].player,
                OutboundEvent::ShotFired {
                    target: mv.target,
                    outcome: mv.outcome,
                    tracking: board.target_view(),
                    your_turn: live && state.turn == Some(shooter),
                },
            ));
            out.push((
                state.seats[defender].player,
                OutboundEvent::ShotReceived {
                    target: mv.target,
                    outcome: mv.outcome,
                    board: board.own_view(),
                    your_turn: live && state.turn == Some(defender),
                },
            ));
        }
        Transition::Finished => {
            if let Some(record) = state.finish {
                for seat in &state.seats {
                    out.push((
                        seat.player,
                        OutboundEvent::SessionFinished {
                            winner: record.winner,
                            cause: record.cause,
                            you_won: record.winner == Some(seat.player),
                        },
                    ));
                }
            }
        }
        Transition::Released => {
            for seat in &state.seats {
                out.push((seat.player, OutboundEvent::Released { session: state.id }));
            }
        }
    }
    out
}

/// Snapshot event for the player in `seat`.
pub(crate) fn snapshot(state: &SessionState, seat: usize) -> OutboundEvent {
    let opponent = state.opponent_of(seat);
    OutboundEvent::Snapshot {
        session: state.id,
        phase: state.phase,
        opponent: opponent.map(|o| state.seats[o].player),
        your_turn: state.phase == Phase::Active && state.turn == Some(seat),
        board: state.seats[seat].board.own_view(),
        tracking: opponent.map(|o| state.seats[o].board.target_view()),
        finish: state.finish,
    }
}

/// Per-session fan-out of events to subscribed players.
#[derive(Default)]
pub(crate) struct Dispatcher {
    subscribers: HashMap<PlayerId, Vec<mpsc::UnboundedSender<OutboundEvent>>>,
}

impl Dispatcher {
    pub(crate) fn subscribe(&mut self, player: PlayerId, first: OutboundEvent) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(first);
        self.subscribers.entry(player).or_default().push(tx);
        EventStream { rx }
    }

    /// Send each event to its recipient's live streams, dropping streams
    /// whose receiver is gone.
    pub(crate) fn deliver(&mut self, out: Vec<(PlayerId, OutboundEvent)>) {
        for (player, event) in out {
            if let Some(senders) = self.subscribers.get_mut(&player) {
                senders.retain(|tx| tx.send(event.clone()).is_ok());
            }
        }
    }

    /// Drop every sender so the streams end once drained.
    pub(crate) fn close(&mut self) {
        self.subscribers.clear();
    }
}

/// Endless per-player event stream. Ends only when the session is released.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl EventStream {
    /// Wait for the next event; `None` once the session is released.
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<OutboundEvent> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now, oldest first.
    pub fn drain(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = OutboundEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
