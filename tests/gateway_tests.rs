use std::sync::Arc;

use broadside::transport::in_memory::InMemoryTransport;
use broadside::transport::Transport;
use broadside::{
    play_local, Command, EngineConfig, FinishCause, Gateway, Message, OutboundEvent, Phase,
    PlayerId, PlayerStatus, Registry, Reply, PROTOCOL_VERSION,
};
use tokio::task::JoinHandle;

fn spawn_gateway(registry: &Arc<Registry>) -> (InMemoryTransport, JoinHandle<anyhow::Result<()>>) {
    let (client, server) = InMemoryTransport::pair();
    let handle = tokio::spawn(Gateway::new(registry.clone(), server).run());
    (client, handle)
}

async fn hello(client: &mut InMemoryTransport, player: PlayerId) -> anyhow::Result<()> {
    client
        .send(Message::Hello {
            version: PROTOCOL_VERSION,
            player,
        })
        .await?;
    match client.recv().await? {
        Message::HelloAck { version, .. } => assert_eq!(version, PROTOCOL_VERSION),
        other => panic!("unexpected frame {:?}", other),
    }
    Ok(())
}

/// Next reply, skipping any events queued before it.
async fn reply(client: &mut InMemoryTransport) -> anyhow::Result<(u64, Reply)> {
    loop {
        match client.recv().await? {
            Message::Reply { seq, result } => return Ok((seq, result?)),
            Message::Event(_) => continue,
            other => panic!("unexpected frame {:?}", other),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_bots_play_to_the_end() -> anyhow::Result<()> {
    let (a, b) = play_local(EngineConfig::default(), (1, 2)).await?;
    assert_ne!(a.won, b.won);
    assert_eq!(a.session, b.session);
    assert!(a.session.is_some());
    assert_eq!(a.cause, Some(FinishCause::FleetDestroyed));
    assert_eq!(b.cause, Some(FinishCause::FleetDestroyed));
    let winner = if a.won { &a } else { &b };
    assert!(winner.shots >= 17);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_seeds_replay_the_same_game() -> anyhow::Result<()> {
    let first = play_local(EngineConfig::default(), (7, 8)).await?;
    for _ in 0..10 {
        let again = play_local(EngineConfig::default(), (7, 8)).await?;
        assert_eq!(again, first);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_version_mismatch_is_rejected() -> anyhow::Result<()> {
    let registry = Arc::new(Registry::default());
    let (mut client, handle) = spawn_gateway(&registry);
    client
        .send(Message::Hello {
            version: PROTOCOL_VERSION + 1,
            player: PlayerId(1),
        })
        .await?;
    assert!(matches!(client.recv().await?, Message::Error { .. }));
    assert!(handle.await?.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_command_replies_carry_seq() -> anyhow::Result<()> {
    let registry = Arc::new(Registry::default());
    let (mut client, _handle) = spawn_gateway(&registry);
    hello(&mut client, PlayerId(1)).await?;

    client
        .send(Message::Command {
            seq: 7,
            command: Command::Status,
        })
        .await?;
    assert_eq!(reply(&mut client).await?, (7, Reply::Status(PlayerStatus::Idle)));

    client
        .send(Message::Command {
            seq: 8,
            command: Command::Dequeue,
        })
        .await?;
    match client.recv().await? {
        Message::Reply { seq, result } => {
            assert_eq!(seq, 8);
            assert_eq!(result, Err(broadside::GameError::NotWaiting));
        }
        other => panic!("unexpected frame {:?}", other),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_forfeits_running_game() -> anyhow::Result<()> {
    let registry = Arc::new(Registry::default());
    let (mut a, _ha) = spawn_gateway(&registry);
    let (mut b, hb) = spawn_gateway(&registry);
    hello(&mut a, PlayerId(1)).await?;
    hello(&mut b, PlayerId(2)).await?;

    a.send(Message::Command { seq: 0, command: Command::Enqueue }).await?;
    assert_eq!(reply(&mut a).await?, (0, Reply::Queued));
    b.send(Message::Command { seq: 0, command: Command::Enqueue }).await?;
    let (_, matched) = reply(&mut b).await?;
    assert!(matches!(matched, Reply::Matched(_)));

    // A learns about the pairing through a snapshot
    match a.recv().await? {
        Message::Event(OutboundEvent::Snapshot { phase, opponent, .. }) => {
            assert_eq!(phase, Phase::Setup);
            assert_eq!(opponent, Some(PlayerId(2)));
        }
        other => panic!("unexpected frame {:?}", other),
    }

    // B's gateway may fail mid-send once the client is gone; either way it forfeits
    drop(b);
    let _ = hb.await?;

    loop {
        match a.recv().await? {
            Message::Event(OutboundEvent::SessionFinished { winner, cause, you_won }) => {
                assert_eq!(winner, Some(PlayerId(1)));
                assert_eq!(cause, FinishCause::Disconnect);
                assert!(you_won);
                break;
            }
            Message::Event(_) => continue,
            other => panic!("unexpected frame {:?}", other),
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_leaves_queue() -> anyhow::Result<()> {
    let registry = Arc::new(Registry::default());
    let (mut a, ha) = spawn_gateway(&registry);
    hello(&mut a, PlayerId(1)).await?;
    a.send(Message::Command { seq: 0, command: Command::Enqueue }).await?;
    assert_eq!(reply(&mut a).await?, (0, Reply::Queued));
    assert_eq!(registry.waiting_count(), 1);

    drop(a);
    ha.await??;
    assert_eq!(registry.waiting_count(), 0);
    assert_eq!(registry.status(PlayerId(1)), PlayerStatus::Idle);
    Ok(())
}
