//! Matchmaker and session registry.
//!
//! The registry owns the FIFO waiting pool and the table of live sessions.
//! Both sit behind one registry-wide lock; sessions carry their own lock, and
//! the registry is always locked before a session, never after.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::common::{Phase, PlayerId, SessionId};
use crate::config::EngineConfig;
use crate::error::{ConfigError, GameError};
use crate::session::{FinishRecord, ForfeitReason, Session};

/// Where a player currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Idle,
    Waiting,
    Playing { session: SessionId, phase: Phase },
}

/// Result of joining the queue.
#[derive(Debug)]
pub enum Enqueued {
    /// An opponent was waiting; the new session is already in `Setup`.
    Matched(Session),
    /// No opponent yet; the ticket resolves once one arrives.
    Waiting(PairingTicket),
}

/// Resolves to the session a waiting player was paired into, or to
/// `NotWaiting` if the player left the queue first.
#[derive(Debug)]
pub struct PairingTicket {
    rx: oneshot::Receiver<Session>,
}

impl Future for PairingTicket {
    type Output = Result<Session, GameError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| GameError::NotWaiting))
    }
}

/// Sessions touched by one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: Vec<SessionId>,
    pub released: Vec<SessionId>,
}

struct Waiter {
    player: PlayerId,
    notify: oneshot::Sender<Session>,
}

#[derive(Default)]
struct Pool {
    waiting: VecDeque<Waiter>,
    sessions: HashMap<SessionId, Session>,
    assignments: HashMap<PlayerId, SessionId>,
}

/// Owns the waiting pool and the live sessions. Share it with `Arc`.
pub struct Registry {
    config: EngineConfig,
    next_session: AtomicU64,
    pool: Mutex<Pool>,
}

impl Registry {
    /// Build a registry for `config`, rejecting rules no game could be
    /// played under.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_checked_config(config))
    }

    fn with_checked_config(config: EngineConfig) -> Self {
        Self {
            config,
            next_session: AtomicU64::new(1),
            pool: Mutex::new(Pool::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add `player` to the waiting pool, pairing them with the longest
    /// waiting player if there is one.
    pub fn enqueue(&self, player: PlayerId) -> Result<Enqueued, GameError> {
        let mut pool = self.pool.lock();
        if pool.assignments.contains_key(&player) {
            return Err(GameError::AlreadyInSession);
        }
        if pool.waiting.iter().any(|w| w.player == player) {
            return Err(GameError::AlreadyQueued);
        }

        let Some(waiter) = pool.waiting.pop_front() else {
            let (tx, rx) = oneshot::channel();
            pool.waiting.push_back(Waiter { player, notify: tx });
            log::debug!("{} is waiting for an opponent", player);
            return Ok(Enqueued::Waiting(PairingTicket { rx }));
        };

        let id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let session = Session::new(id, self.config.ruleset.clone());
        session.seat(waiter.player)?;
        session.seat(player)?;
        pool.sessions.insert(id, session.clone());
        pool.assignments.insert(waiter.player, id);
        pool.assignments.insert(player, id);
        log::info!("{}: paired {} with {}", id, waiter.player, player);

        // the waiter may have stopped listening; it can still find the
        // session through `lookup`
        let _ = waiter.notify.send(session.clone());
        Ok(Enqueued::Matched(session))
    }

    /// Remove a player who is still waiting for an opponent.
    pub fn dequeue(&self, player: PlayerId) -> Result<(), GameError> {
        let mut pool = self.pool.lock();
        let pos = pool
            .waiting
            .iter()
            .position(|w| w.player == player)
            .ok_or(GameError::NotWaiting)?;
        pool.waiting.remove(pos);
        log::debug!("{} left the queue", player);
        Ok(())
    }

    /// Handle a player who went away: take them out of the queue, or forfeit
    /// their unfinished session on their behalf. Returns the finish record
    /// when a forfeit happened.
    pub fn abandon(&self, player: PlayerId) -> Result<Option<FinishRecord>, GameError> {
        match self.dequeue(player) {
            Ok(()) => Ok(None),
            // paired before the dequeue could run
            Err(GameError::NotWaiting) => {
                let session = self.lookup(player)?;
                if session.phase() == Phase::Finished {
                    return Ok(None);
                }
                session.forfeit(player, ForfeitReason::Disconnect).map(Some)
            }
            Err(e) => Err(e),
        }
    }

    /// The player's live session.
    pub fn lookup(&self, player: PlayerId) -> Result<Session, GameError> {
        let pool = self.pool.lock();
        pool.assignments
            .get(&player)
            .and_then(|id| pool.sessions.get(id))
            .cloned()
            .ok_or(GameError::NoActiveSession)
    }

    /// Live session by id.
    pub fn session(&self, id: SessionId) -> Result<Session, GameError> {
        self.pool
            .lock()
            .sessions
            .get(&id)
            .cloned()
            .ok_or(GameError::NoActiveSession)
    }

    pub fn status(&self, player: PlayerId) -> PlayerStatus {
        let pool = self.pool.lock();
        if pool.waiting.iter().any(|w| w.player == player) {
            return PlayerStatus::Waiting;
        }
        match pool.assignments.get(&player).and_then(|id| pool.sessions.get(id)) {
            Some(session) => PlayerStatus::Playing {
                session: session.id(),
                phase: session.phase(),
            },
            None => PlayerStatus::Idle,
        }
    }

    /// Remove a finished session from the live set and close its event
    /// streams.
    pub fn release(&self, id: SessionId) -> Result<(), GameError> {
        let mut pool = self.pool.lock();
        let session = pool.sessions.get(&id).ok_or(GameError::NoActiveSession)?;
        let phase = session.phase();
        if phase != Phase::Finished {
            return Err(GameError::InvalidPhase { phase });
        }
        if let Some(session) = pool.sessions.remove(&id) {
            pool.assignments.retain(|_, sid| *sid != id);
            session.close();
            log::info!("{}: released", id);
        }
        Ok(())
    }

    pub fn waiting_count(&self) -> usize {
        self.pool.lock().waiting.len()
    }

    pub fn live_sessions(&self) -> usize {
        self.pool.lock().sessions.len()
    }

    /// Expire idle sessions and release finished ones whose players have
    /// acknowledged or whose linger period is over.
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let sessions: Vec<Session> = self.pool.lock().sessions.values().cloned().collect();
        let mut report = SweepReport::default();

        for session in sessions {
            if session.expire_if_idle(now, self.config.idle_timeout()) {
                report.expired.push(session.id());
            }
            if session.is_releasable(now, self.config.linger()) && self.release(session.id()).is_ok() {
                report.released.push(session.id());
            }
        }
        if !report.expired.is_empty() || !report.released.is_empty() {
            log::info!(
                "sweep: {} expired, {} released",
                report.expired.len(),
                report.released.len()
            );
        }
        report
    }

    /// Run [`Registry::sweep`] every `sweep_interval` on the current tokio
    /// runtime until the returned handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.sweep(Instant::now());
            }
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_checked_config(EngineConfig::default())
    }
}
