use serde::{Deserialize, Serialize};

use crate::command::{Command, Reply};
use crate::common::PlayerId;
use crate::config::Ruleset;
use crate::dispatcher::OutboundEvent;
use crate::error::GameError;

/// Wire protocol version; both ends must agree during the handshake.
pub const PROTOCOL_VERSION: u16 = 1;

/// Frames exchanged between a client and the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Client opens the connection and names its player.
    Hello { version: u16, player: PlayerId },
    /// Gateway accepts the handshake and announces its rules.
    HelloAck { version: u16, ruleset: Ruleset },
    /// Client request, tagged so the reply can be matched to it.
    Command { seq: u64, command: Command },
    /// Answer to the command with the same `seq`.
    Reply {
        seq: u64,
        result: Result<Reply, GameError>,
    },
    /// Asynchronous session event.
    Event(OutboundEvent),
    /// Fatal protocol error; the sender closes the connection after it.
    Error { reason: String },
}
