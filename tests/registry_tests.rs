use std::time::{Duration, Instant};

use broadside::{
    Command, Coordinate, EngineConfig, Enqueued, FinishCause, ForfeitReason, GameError, Phase,
    PlayerId, PlayerStatus, Registry, Reply, Ruleset, Session, ShipKind, ShipPlacement, StartRule,
};

const A: PlayerId = PlayerId(1);
const B: PlayerId = PlayerId(2);
const C: PlayerId = PlayerId(3);

fn matched(result: Result<Enqueued, GameError>) -> Session {
    match result.unwrap() {
        Enqueued::Matched(session) => session,
        Enqueued::Waiting(_) => panic!("expected a match"),
    }
}

fn destroyer() -> Vec<ShipPlacement> {
    vec![ShipPlacement::new(
        ShipKind::Destroyer,
        vec![Coordinate::new(0, 0), Coordinate::new(0, 1)],
    )]
}

fn small_registry() -> Registry {
    Registry::new(EngineConfig {
        ruleset: Ruleset {
            board_size: 10,
            fleet: vec![ShipKind::Destroyer],
            start_rule: StartRule::FirstJoiner,
        },
        ..EngineConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_pairing_hands_both_players_the_session() {
    let registry = Registry::default();
    let ticket = match registry.enqueue(A).unwrap() {
        Enqueued::Waiting(ticket) => ticket,
        Enqueued::Matched(_) => panic!("nobody to match with yet"),
    };
    assert_eq!(registry.status(A), PlayerStatus::Waiting);
    assert_eq!(registry.lookup(A).unwrap_err(), GameError::NoActiveSession);

    let session = matched(registry.enqueue(B));
    let waiter_session = ticket.await.unwrap();
    assert_eq!(waiter_session.id(), session.id());
    assert_eq!(session.phase(), Phase::Setup);
    assert_eq!(session.players(), vec![A, B]);
    assert_eq!(registry.lookup(A).unwrap().id(), session.id());
    assert_eq!(registry.lookup(B).unwrap().id(), session.id());
    assert_eq!(registry.waiting_count(), 0);
    assert_eq!(registry.live_sessions(), 1);
}

#[test]
fn test_fifo_pairing() {
    let registry = Registry::default();
    registry.enqueue(A).unwrap();
    registry.enqueue(B).unwrap();
    registry.enqueue(C).unwrap();
    // A and B were first in line
    assert_eq!(registry.status(C), PlayerStatus::Waiting);
    let session = registry.lookup(B).unwrap();
    assert_eq!(session.players(), vec![A, B]);
}

#[test]
fn test_double_enqueue_rejected() {
    let registry = Registry::default();
    registry.enqueue(A).unwrap();
    assert_eq!(registry.enqueue(A).unwrap_err(), GameError::AlreadyQueued);
    registry.enqueue(B).unwrap();
    assert_eq!(registry.enqueue(B).unwrap_err(), GameError::AlreadyInSession);
}

#[tokio::test]
async fn test_dequeue() {
    let registry = Registry::default();
    let ticket = match registry.enqueue(A).unwrap() {
        Enqueued::Waiting(ticket) => ticket,
        Enqueued::Matched(_) => panic!("nobody to match with yet"),
    };
    registry.dequeue(A).unwrap();
    assert_eq!(registry.status(A), PlayerStatus::Idle);
    assert_eq!(ticket.await.unwrap_err(), GameError::NotWaiting);
    assert_eq!(registry.dequeue(A).unwrap_err(), GameError::NotWaiting);

    // B now waits alone rather than pairing with A
    assert!(matches!(registry.enqueue(B).unwrap(), Enqueued::Waiting(_)));
    matched(registry.enqueue(C));
    assert_eq!(registry.dequeue(B).unwrap_err(), GameError::NotWaiting);
}

#[test]
fn test_release_requires_finished() {
    let registry = small_registry();
    registry.enqueue(A).unwrap();
    let session = matched(registry.enqueue(B));

    assert_eq!(
        registry.release(session.id()),
        Err(GameError::InvalidPhase { phase: Phase::Setup })
    );
    session.forfeit(A, ForfeitReason::Voluntary).unwrap();
    registry.release(session.id()).unwrap();

    assert_eq!(registry.lookup(A).unwrap_err(), GameError::NoActiveSession);
    assert_eq!(registry.lookup(B).unwrap_err(), GameError::NoActiveSession);
    assert_eq!(registry.release(session.id()), Err(GameError::NoActiveSession));
    assert!(matches!(session.subscribe(A), Err(GameError::NoActiveSession)));
    // both players may queue again
    registry.enqueue(A).unwrap();
}

#[test]
fn test_commands_play_a_game() {
    let registry = small_registry();
    assert_eq!(registry.execute(A, Command::Enqueue).unwrap().reply, Reply::Queued);
    let id = match registry.execute(B, Command::Enqueue).unwrap().reply {
        Reply::Matched(id) => id,
        other => panic!("unexpected reply {:?}", other),
    };

    for p in [A, B] {
        let reply = registry.execute(p, Command::PlaceShips(destroyer())).unwrap().reply;
        assert_eq!(reply, Reply::Placed { ready: true });
    }
    assert_eq!(
        registry.execute(B, Command::SubmitMove(Coordinate::new(0, 0))).unwrap_err(),
        GameError::NotYourTurn
    );
    registry.execute(A, Command::SubmitMove(Coordinate::new(0, 0))).unwrap();
    registry.execute(B, Command::SubmitMove(Coordinate::new(9, 9))).unwrap();
    registry.execute(A, Command::SubmitMove(Coordinate::new(0, 1))).unwrap();

    assert_eq!(
        registry.execute(A, Command::Status).unwrap().reply,
        Reply::Status(PlayerStatus::Playing {
            session: id,
            phase: Phase::Finished,
        })
    );
    assert_eq!(
        registry.execute(A, Command::Acknowledge).unwrap().reply,
        Reply::Acknowledged { released: false }
    );
    assert_eq!(
        registry.execute(B, Command::Acknowledge).unwrap().reply,
        Reply::Acknowledged { released: true }
    );
    assert_eq!(registry.status(A), PlayerStatus::Idle);
    assert_eq!(registry.live_sessions(), 0);
}

#[test]
fn test_forfeit_command() {
    let registry = small_registry();
    registry.execute(A, Command::Enqueue).unwrap();
    registry.execute(B, Command::Enqueue).unwrap();
    match registry.execute(B, Command::Forfeit).unwrap().reply {
        Reply::Forfeited(record) => {
            assert_eq!(record.winner, Some(A));
            assert_eq!(record.cause, FinishCause::Forfeit);
        }
        other => panic!("unexpected reply {:?}", other),
    }
    assert_eq!(
        registry.execute(C, Command::Forfeit).unwrap_err(),
        GameError::NoActiveSession
    );
}

#[test]
fn test_sweep_expires_and_releases_idle_sessions() {
    let registry = small_registry();
    registry.enqueue(A).unwrap();
    let session = matched(registry.enqueue(B));
    session.place_ships(A, &destroyer()).unwrap();
    session.place_ships(B, &destroyer()).unwrap();
    assert_eq!(session.current_turn(), Some(A));

    let report = registry.sweep(Instant::now());
    assert!(report.expired.is_empty());
    assert!(report.released.is_empty());

    let idle = registry.config().idle_timeout() + registry.config().linger();
    let report = registry.sweep(Instant::now() + idle + Duration::from_secs(1));
    assert_eq!(report.expired, vec![session.id()]);
    assert_eq!(report.released, vec![session.id()]);

    // A held the turn and let it lapse
    let record = session.finish_record().unwrap();
    assert_eq!(record.winner, Some(B));
    assert_eq!(record.cause, FinishCause::Timeout);
    assert_eq!(registry.lookup(A).unwrap_err(), GameError::NoActiveSession);
}

#[test]
fn test_sweep_releases_after_linger() {
    let registry = small_registry();
    registry.enqueue(A).unwrap();
    let session = matched(registry.enqueue(B));
    session.forfeit(A, ForfeitReason::Voluntary).unwrap();

    assert!(registry.sweep(Instant::now()).released.is_empty());
    assert_eq!(registry.live_sessions(), 1);

    let later = Instant::now() + registry.config().linger() + Duration::from_secs(1);
    assert_eq!(registry.sweep(later).released, vec![session.id()]);
    assert_eq!(registry.live_sessions(), 0);
}

#[test]
fn test_new_rejects_unplayable_rules() {
    let config = EngineConfig {
        ruleset: Ruleset {
            fleet: Vec::new(),
            ..Ruleset::default()
        },
        ..EngineConfig::default()
    };
    assert!(matches!(
        Registry::new(config),
        Err(broadside::ConfigError::Validation(_))
    ));
}

#[test]
fn test_abandon_while_waiting_leaves_queue() {
    let registry = Registry::default();
    registry.enqueue(A).unwrap();
    assert_eq!(registry.abandon(A), Ok(None));
    assert_eq!(registry.status(A), PlayerStatus::Idle);
    assert_eq!(registry.abandon(A), Err(GameError::NoActiveSession));
}

#[test]
fn test_abandon_after_being_paired_forfeits() {
    let registry = small_registry();
    registry.enqueue(A).unwrap();
    // A still believes it is queued when B arrives
    let session = matched(registry.enqueue(B));

    let record = registry.abandon(A).unwrap().unwrap();
    assert_eq!(record.winner, Some(B));
    assert_eq!(record.cause, FinishCause::Disconnect);
    assert_eq!(session.phase(), Phase::Finished);

    // nothing left to forfeit
    assert_eq!(registry.abandon(A), Ok(None));
}
