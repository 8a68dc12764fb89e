use std::future::pending;
use std::sync::Arc;

use anyhow::anyhow;

use crate::command::{Command, Reply};
use crate::common::PlayerId;
use crate::dispatcher::{EventStream, OutboundEvent};
use crate::error::GameError;
use crate::protocol::{Message, PROTOCOL_VERSION};
use crate::registry::{PairingTicket, Registry};
use crate::session::Session;
use crate::transport::Transport;

/// Serves one client connection: forwards its commands into the registry and
/// relays its session's events back out.
pub struct Gateway<T: Transport> {
    registry: Arc<Registry>,
    transport: T,
}

impl<T: Transport> Gateway<T> {
    pub fn new(registry: Arc<Registry>, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Run until the client goes away or breaks the protocol. A player who
    /// drops mid-game forfeits; a player still queued leaves the queue.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let player = self.handshake().await?;
        log::info!("{} connected", player);
        let result = self.serve(player).await;
        self.disconnect(player);
        result
    }

    async fn handshake(&mut self) -> anyhow::Result<PlayerId> {
        match self.transport.recv().await? {
            Message::Hello { version, player } if version == PROTOCOL_VERSION => {
                self.transport
                    .send(Message::HelloAck {
                        version: PROTOCOL_VERSION,
                        ruleset: self.registry.config().ruleset.clone(),
                    })
                    .await?;
                Ok(player)
            }
            Message::Hello { version, .. } => {
                log::warn!(
                    "handshake protocol version mismatch: expected {}, client sent {}",
                    PROTOCOL_VERSION,
                    version
                );
                let reason = format!("unsupported protocol version {}", version);
                self.transport.send(Message::Error { reason }).await?;
                Err(anyhow!(
                    "Protocol version mismatch in Hello: expected {}, got {}",
                    PROTOCOL_VERSION,
                    version
                ))
            }
            other => {
                log::warn!("expected Hello, got {:?}", other);
                let reason = "expected Hello".to_string();
                self.transport.send(Message::Error { reason }).await?;
                Err(anyhow!("Expected Hello, got unexpected message (closing connection)"))
            }
        }
    }

    async fn serve(&mut self, player: PlayerId) -> anyhow::Result<()> {
        let mut pairing: Option<PairingTicket> = None;
        // a reconnecting player picks up the session it already has
        let mut events: Option<EventStream> = self
            .registry
            .lookup(player)
            .and_then(|s| s.subscribe(player))
            .ok();

        loop {
            tokio::select! {
                msg = self.transport.recv() => {
                    let msg = match msg {
                        Ok(msg) => msg,
                        Err(e) => {
                            log::debug!("{}: connection closed: {}", player, e);
                            return Ok(());
                        }
                    };
                    match msg {
                        Message::Command { seq, command } => {
                            let result = self.execute(player, command, &mut pairing, &mut events);
                            self.transport.send(Message::Reply { seq, result }).await?;
                        }
                        other => {
                            log::warn!("{}: unexpected frame {:?}", player, other);
                            let reason = "expected Command".to_string();
                            self.transport.send(Message::Error { reason }).await?;
                            return Err(anyhow!("Unexpected frame from {} (closing connection)", player));
                        }
                    }
                }
                paired = wait_pairing(&mut pairing), if pairing.is_some() => {
                    pairing = None;
                    if let Ok(session) = paired {
                        events = session.subscribe(player).ok();
                    }
                }
                event = next_event(&mut events), if events.is_some() => {
                    match event {
                        Some(event) => self.transport.send(Message::Event(event)).await?,
                        None => events = None,
                    }
                }
            }
        }
    }

    fn execute(
        &self,
        player: PlayerId,
        command: Command,
        pairing: &mut Option<PairingTicket>,
        events: &mut Option<EventStream>,
    ) -> Result<Reply, GameError> {
        let executed = self.registry.execute(player, command)?;
        if executed.pairing.is_some() {
            *pairing = executed.pairing;
        }
        if let Reply::Matched(id) = executed.reply {
            *events = self
                .registry
                .session(id)
                .and_then(|s: Session| s.subscribe(player))
                .ok();
        }
        Ok(executed.reply)
    }

    fn disconnect(&self, player: PlayerId) {
        match self.registry.abandon(player) {
            Ok(Some(record)) => log::info!("{} disconnected and forfeits ({:?})", player, record.cause),
            Ok(None) | Err(GameError::NoActiveSession) => log::info!("{} disconnected", player),
            Err(e) => log::debug!("{}: forfeit on disconnect failed: {}", player, e),
        }
    }
}

async fn wait_pairing(pairing: &mut Option<PairingTicket>) -> Result<Session, GameError> {
    match pairing {
        Some(ticket) => ticket.await,
        None => pending().await,
    }
}

async fn next_event(events: &mut Option<EventStream>) -> Option<OutboundEvent> {
    match events {
        Some(stream) => stream.recv().await,
        None => pending().await,
    }
}
