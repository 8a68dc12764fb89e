//! Commonly used types and utilities for ease of import.

pub use crate::{
    Board, Command, Coordinate, EngineConfig, GameError, Outcome, OutboundEvent, Phase, PlayerId,
    Registry, Reply, Ruleset, Session, SessionId, ShipKind, ShipPlacement,
};

pub use crate::transport::{in_memory::InMemoryTransport, tcp::TcpTransport, Transport};
