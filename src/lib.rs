mod arbiter;
mod bitboard;
mod board;
pub mod bot;
pub mod command;
mod common;
mod config;
pub mod dispatcher;
mod error;
pub mod gateway;
mod logging;
pub mod prelude;
pub mod protocol;
pub mod registry;
pub mod session;
mod ship;
pub mod transport;

pub use bitboard::{BitBoard, BitBoardError};
pub use board::*;
pub use bot::{play_local, Bot, BotReport};
pub use command::{Command, Executed, Reply};
pub use common::*;
pub use config::*;
pub use dispatcher::{EventStream, OutboundEvent};
pub use error::{ConfigError, GameError, PlacementError};
pub use gateway::Gateway;
pub use logging::{init_logging, init_logging_with};
pub use protocol::*;
pub use registry::{Enqueued, PairingTicket, PlayerStatus, Registry, SweepReport};
pub use session::{FinishCause, FinishRecord, ForfeitReason, Move, Session, SessionSummary};
pub use ship::*;
pub use transport::tcp::TcpTransport;
