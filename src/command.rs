//! Typed command interface: the closed set of player requests and the single
//! place they are routed into the registry and sessions.

use serde::{Deserialize, Serialize};

use crate::common::{Coordinate, Outcome, PlayerId, SessionId};
use crate::error::GameError;
use crate::registry::{Enqueued, PairingTicket, PlayerStatus, Registry};
use crate::session::{FinishRecord, ForfeitReason};
use crate::ship::ShipPlacement;

/// A request issued by a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Enqueue,
    Dequeue,
    PlaceShips(Vec<ShipPlacement>),
    SubmitMove(Coordinate),
    Forfeit,
    Acknowledge,
    Status,
}

/// Successful answer to a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Queued,
    Matched(SessionId),
    Dequeued,
    Placed { ready: bool },
    Fired(Outcome),
    Forfeited(FinishRecord),
    Acknowledged { released: bool },
    Status(PlayerStatus),
}

/// Reply to a command plus, for a player left waiting, the ticket that
/// resolves when an opponent arrives.
#[derive(Debug)]
pub struct Executed {
    pub reply: Reply,
    pub pairing: Option<PairingTicket>,
}

impl From<Reply> for Executed {
    fn from(reply: Reply) -> Self {
        Executed {
            reply,
            pairing: None,
        }
    }
}

impl Registry {
    /// Route `command` from `player` to the registry or the player's session.
    pub fn execute(&self, player: PlayerId, command: Command) -> Result<Executed, GameError> {
        let executed = match command {
            Command::Enqueue => match self.enqueue(player)? {
                Enqueued::Matched(session) => Reply::Matched(session.id()).into(),
                Enqueued::Waiting(ticket) => Executed {
                    reply: Reply::Queued,
                    pairing: Some(ticket),
                },
            },
            Command::Dequeue => {
                self.dequeue(player)?;
                Reply::Dequeued.into()
            }
            Command::PlaceShips(ships) => {
                let ready = self.lookup(player)?.place_ships(player, &ships)?;
                Reply::Placed { ready }.into()
            }
            Command::SubmitMove(target) => {
                let outcome = self.lookup(player)?.submit_move(player, target)?;
                Reply::Fired(outcome).into()
            }
            Command::Forfeit => {
                let record = self.lookup(player)?.forfeit(player, ForfeitReason::Voluntary)?;
                Reply::Forfeited(record).into()
            }
            Command::Acknowledge => {
                let session = self.lookup(player)?;
                let released = session.acknowledge(player)? && self.release(session.id()).is_ok();
                Reply::Acknowledged { released }.into()
            }
            Command::Status => Reply::Status(self.status(player)).into(),
        };
        Ok(executed)
    }
}
