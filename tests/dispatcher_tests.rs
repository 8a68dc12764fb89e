use broadside::{
    Coordinate, EngineConfig, Enqueued, EventStream, FinishCause, ForfeitReason, OutboundEvent,
    Outcome, Phase, PlayerId, Registry, Ruleset, Session, ShipKind, ShipPlacement, StartRule,
};
use futures_util::StreamExt;

const A: PlayerId = PlayerId(1);
const B: PlayerId = PlayerId(2);

fn at(row: u8, col: u8) -> Coordinate {
    Coordinate::new(row, col)
}

fn setup() -> (Registry, Session) {
    let registry = Registry::new(EngineConfig {
        ruleset: Ruleset {
            board_size: 10,
            fleet: vec![ShipKind::Destroyer, ShipKind::Cruiser],
            start_rule: StartRule::FirstJoiner,
        },
        ..EngineConfig::default()
    })
    .unwrap();
    registry.enqueue(A).unwrap();
    let session = match registry.enqueue(B).unwrap() {
        Enqueued::Matched(s) => s,
        Enqueued::Waiting(_) => panic!("expected a match"),
    };
    (registry, session)
}

fn fleet() -> Vec<ShipPlacement> {
    vec![
        ShipPlacement::new(ShipKind::Destroyer, vec![at(0, 0), at(0, 1)]),
        ShipPlacement::new(ShipKind::Cruiser, vec![at(2, 5), at(3, 5), at(4, 5)]),
    ]
}

fn start(session: &Session) -> (EventStream, EventStream) {
    let mut a = session.subscribe(A).unwrap();
    let mut b = session.subscribe(B).unwrap();
    assert!(matches!(a.try_recv(), Some(OutboundEvent::Snapshot { phase: Phase::Setup, .. })));
    assert!(matches!(b.try_recv(), Some(OutboundEvent::Snapshot { phase: Phase::Setup, .. })));
    session.place_ships(A, &fleet()).unwrap();
    session.place_ships(B, &fleet()).unwrap();
    (a, b)
}

#[test]
fn test_setup_events() {
    let (_registry, session) = setup();
    let (mut a, mut b) = start(&session);

    let a_events = a.drain();
    assert!(matches!(a_events[0], OutboundEvent::FleetPlaced { ready: true, .. }));
    assert_eq!(a_events[1], OutboundEvent::OpponentReady);
    assert_eq!(
        a_events[2],
        OutboundEvent::GameStarted {
            first: A,
            your_turn: true,
        }
    );

    let b_events = b.drain();
    assert_eq!(b_events[0], OutboundEvent::OpponentReady);
    assert!(matches!(b_events[1], OutboundEvent::FleetPlaced { ready: true, .. }));
    assert_eq!(
        b_events[2],
        OutboundEvent::GameStarted {
            first: A,
            your_turn: false,
        }
    );
}

#[test]
fn test_shot_events_are_asymmetric() {
    let (_registry, session) = setup();
    let (mut a, mut b) = start(&session);
    a.drain();
    b.drain();

    session.submit_move(A, at(2, 5)).unwrap();

    match a.try_recv() {
        Some(OutboundEvent::ShotFired {
            target,
            outcome,
            tracking,
            your_turn,
        }) => {
            assert_eq!(target, at(2, 5));
            assert_eq!(outcome, Outcome::Hit);
            assert!(!your_turn);
            // only the hit cell is known, not the rest of the cruiser
            assert_eq!(tracking.hits, vec![at(2, 5)]);
            assert!(tracking.sunk.is_empty());
            assert_eq!(tracking.ships_afloat, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
    let leaked = serde_json::to_string(&a.drain()).unwrap();
    assert_eq!(leaked, "[]");

    match b.try_recv() {
        Some(OutboundEvent::ShotReceived {
            target,
            board,
            your_turn,
            ..
        }) => {
            assert_eq!(target, at(2, 5));
            assert!(your_turn);
            // the owner sees the whole fleet
            assert_eq!(board.ships.len(), 2);
            assert_eq!(board.ships[1].cells.len(), 3);
            assert_eq!(board.ships[1].hits, vec![at(2, 5)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_sunk_ship_is_revealed() {
    let (_registry, session) = setup();
    let (mut a, _b) = start(&session);
    a.drain();

    session.submit_move(A, at(0, 0)).unwrap();
    session.submit_move(B, at(9, 9)).unwrap();
    session.submit_move(A, at(0, 1)).unwrap();

    let tracking = a
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            OutboundEvent::ShotFired { tracking, .. } => Some(tracking),
            _ => None,
        })
        .last()
        .unwrap();
    assert_eq!(tracking.sunk.len(), 1);
    assert_eq!(tracking.sunk[0].kind, ShipKind::Destroyer);
    assert_eq!(tracking.sunk[0].cells, vec![at(0, 0), at(0, 1)]);
    assert_eq!(tracking.ships_afloat, 1);
}

#[test]
fn test_late_subscriber_gets_snapshot() {
    let (_registry, session) = setup();
    let (_a, _b) = start(&session);
    session.submit_move(A, at(5, 5)).unwrap();

    let mut late = session.subscribe(B).unwrap();
    match late.try_recv() {
        Some(OutboundEvent::Snapshot {
            phase,
            opponent,
            your_turn,
            tracking,
            ..
        }) => {
            assert_eq!(phase, Phase::Active);
            assert_eq!(opponent, Some(A));
            assert!(your_turn);
            let tracking = tracking.unwrap();
            assert!(tracking.hits.is_empty());
            assert_eq!(tracking.ships_afloat, 2);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_ends_on_release() {
    let (registry, session) = setup();
    let (mut a, _b) = start(&session);
    a.drain();

    session.forfeit(B, ForfeitReason::Voluntary).unwrap();
    registry.release(session.id()).unwrap();

    assert_eq!(
        a.next().await,
        Some(OutboundEvent::SessionFinished {
            winner: Some(A),
            cause: FinishCause::Forfeit,
            you_won: true,
        })
    );
    assert_eq!(
        a.next().await,
        Some(OutboundEvent::Released { session: session.id() })
    );
    assert_eq!(a.next().await, None);
}
