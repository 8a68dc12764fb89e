//! Automated client: joins the queue, lays out a random fleet and fires at
//! random untried cells whenever it holds the turn.

use std::sync::Arc;

use anyhow::anyhow;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::board::random_fleet;
use crate::command::{Command, Reply};
use crate::common::{Coordinate, Phase, PlayerId, SessionId};
use crate::config::{EngineConfig, Ruleset};
use crate::dispatcher::OutboundEvent;
use crate::error::GameError;
use crate::gateway::Gateway;
use crate::protocol::{Message, PROTOCOL_VERSION};
use crate::registry::{PlayerStatus, Registry};
use crate::session::FinishCause;
use crate::transport::in_memory::InMemoryTransport;
use crate::transport::Transport;

/// How a bot's game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotReport {
    pub player: PlayerId,
    pub session: Option<SessionId>,
    pub won: bool,
    pub cause: Option<FinishCause>,
    pub shots: usize,
}

pub struct Bot<T: Transport> {
    transport: T,
    player: PlayerId,
    rng: SmallRng,
    seq: u64,
    untried: Vec<Coordinate>,
    /// Shot sent and not yet answered.
    pending: Option<(u64, Coordinate)>,
    placed: bool,
}

impl<T: Transport> Bot<T> {
    pub fn new(transport: T, player: PlayerId, rng: SmallRng) -> Self {
        Self {
            transport,
            player,
            rng,
            seq: 0,
            untried: Vec::new(),
            pending: None,
            placed: false,
        }
    }

    /// Play one full game and report the result.
    pub async fn run(mut self) -> anyhow::Result<BotReport> {
        let ruleset = self.handshake().await?;
        let size = ruleset.board_size;
        self.untried = (0..size)
            .flat_map(|r| (0..size).map(move |c| Coordinate::new(r, c)))
            .collect();

        let mut report = BotReport {
            player: self.player,
            session: None,
            won: false,
            cause: None,
            shots: 0,
        };
        self.command(Command::Enqueue).await?;

        loop {
            match self.transport.recv().await? {
                Message::Reply { seq, result } => self.on_reply(seq, result, &mut report)?,
                Message::Event(event) => {
                    if self.on_event(event, &ruleset, &mut report).await? {
                        return Ok(report);
                    }
                }
                Message::Error { reason } => return Err(anyhow!("server error: {}", reason)),
                other => return Err(anyhow!("unexpected frame {:?}", other)),
            }
        }
    }

    async fn handshake(&mut self) -> anyhow::Result<Ruleset> {
        self.transport
            .send(Message::Hello {
                version: PROTOCOL_VERSION,
                player: self.player,
            })
            .await?;
        match self.transport.recv().await? {
            Message::HelloAck { version, ruleset } if version == PROTOCOL_VERSION => Ok(ruleset),
            Message::HelloAck { version, .. } => Err(anyhow!(
                "Protocol version mismatch in HelloAck: expected {}, got {}",
                PROTOCOL_VERSION,
                version
            )),
            Message::Error { reason } => Err(anyhow!("handshake rejected: {}", reason)),
            other => Err(anyhow!("Expected HelloAck, got {:?}", other)),
        }
    }

    async fn command(&mut self, command: Command) -> anyhow::Result<u64> {
        let seq = self.seq;
        self.seq += 1;
        self.transport.send(Message::Command { seq, command }).await?;
        Ok(seq)
    }

    fn on_reply(
        &mut self,
        seq: u64,
        result: Result<Reply, GameError>,
        report: &mut BotReport,
    ) -> anyhow::Result<()> {
        let shot = match self.pending {
            Some((pending_seq, target)) if pending_seq == seq => {
                self.pending = None;
                Some(target)
            }
            _ => None,
        };
        match result {
            Ok(Reply::Fired(_)) => report.shots += 1,
            Ok(Reply::Matched(id)) => report.session = Some(id),
            Ok(_) => {}
            Err(e) => {
                // a rejected shot was never fired; keep the cell
                if let Some(target) = shot {
                    self.untried.push(target);
                }
                match e {
                    GameError::NotYourTurn | GameError::InvalidPhase { .. } => {
                        log::debug!("{}: command {} rejected: {}", self.player, seq, e)
                    }
                    other => return Err(anyhow!("command {} failed: {}", seq, other)),
                }
            }
        }
        Ok(())
    }

    /// Returns `true` once the game is over and the session released.
    async fn on_event(
        &mut self,
        event: OutboundEvent,
        ruleset: &Ruleset,
        report: &mut BotReport,
    ) -> anyhow::Result<bool> {
        match event {
            OutboundEvent::Snapshot {
                session,
                phase,
                your_turn,
                ..
            } => {
                report.session = Some(session);
                if phase == Phase::Setup {
                    self.place_fleet(ruleset).await?;
                }
                if your_turn {
                    self.fire().await?;
                }
            }
            OutboundEvent::Matched { session, .. } => {
                report.session = Some(session);
                self.place_fleet(ruleset).await?;
            }
            OutboundEvent::GameStarted { your_turn, .. }
            | OutboundEvent::ShotFired { your_turn, .. }
            | OutboundEvent::ShotReceived { your_turn, .. } => {
                if your_turn {
                    self.fire().await?;
                }
            }
            OutboundEvent::SessionFinished { you_won, cause, .. } => {
                report.won = you_won;
                report.cause = Some(cause);
                self.command(Command::Acknowledge).await?;
            }
            OutboundEvent::Released { .. } => return Ok(true),
            OutboundEvent::FleetPlaced { .. } | OutboundEvent::OpponentReady => {}
        }
        Ok(false)
    }

    async fn place_fleet(&mut self, ruleset: &Ruleset) -> anyhow::Result<()> {
        if self.placed {
            return Ok(());
        }
        self.placed = true;
        let fleet = random_fleet(ruleset, &mut self.rng)?;
        self.command(Command::PlaceShips(fleet)).await?;
        Ok(())
    }

    async fn fire(&mut self) -> anyhow::Result<()> {
        if self.pending.is_some() || self.untried.is_empty() {
            return Ok(());
        }
        let idx = self.rng.random_range(0..self.untried.len());
        let target = self.untried.swap_remove(idx);
        let seq = self.command(Command::SubmitMove(target)).await?;
        self.pending = Some((seq, target));
        Ok(())
    }
}

/// Play one game between two bots against an in-process registry, each bot
/// talking to its own gateway over an in-memory channel.
///
/// Player 1 is queued before player 2 connects, so under
/// `StartRule::FirstJoiner` the same seeds always replay the same game.
pub async fn play_local(config: EngineConfig, seeds: (u64, u64)) -> anyhow::Result<(BotReport, BotReport)> {
    let registry = Arc::new(Registry::new(config)?);
    let first = spawn_local_bot(&registry, PlayerId(1), seeds.0);
    while registry.status(PlayerId(1)) != PlayerStatus::Waiting {
        if first.is_finished() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let second = spawn_local_bot(&registry, PlayerId(2), seeds.1);
    let (a, b) = tokio::try_join!(first, second)?;
    Ok((a?, b?))
}

fn spawn_local_bot(registry: &Arc<Registry>, player: PlayerId, seed: u64) -> JoinHandle<anyhow::Result<BotReport>> {
    let (client, server) = InMemoryTransport::pair();
    let gateway = Gateway::new(registry.clone(), server);
    tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            log::warn!("local gateway for {} ended with an error: {}", player, e);
        }
    });
    tokio::spawn(Bot::new(client, player, SmallRng::seed_from_u64(seed)).run())
}
