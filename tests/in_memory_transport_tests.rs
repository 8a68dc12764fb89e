use broadside::transport::in_memory::InMemoryTransport;
use broadside::transport::Transport;
use broadside::{Command, Message, PlayerId, PROTOCOL_VERSION};

#[tokio::test]
async fn test_pair_delivers_in_order() -> anyhow::Result<()> {
    let (mut left, mut right) = InMemoryTransport::pair();

    left.send(Message::Hello {
        version: PROTOCOL_VERSION,
        player: PlayerId(4),
    })
    .await?;
    left.send(Message::Command {
        seq: 1,
        command: Command::Enqueue,
    })
    .await?;

    assert_eq!(
        right.recv().await?,
        Message::Hello {
            version: PROTOCOL_VERSION,
            player: PlayerId(4),
        }
    );
    assert!(matches!(right.recv().await?, Message::Command { seq: 1, .. }));

    right.send(Message::Error { reason: "bye".into() }).await?;
    assert!(matches!(left.recv().await?, Message::Error { .. }));
    Ok(())
}

#[tokio::test]
async fn test_closed_peer() {
    let (mut left, right) = InMemoryTransport::pair();
    drop(right);
    assert!(left.recv().await.is_err());
    assert!(left
        .send(Message::Command {
            seq: 0,
            command: Command::Status,
        })
        .await
        .is_err());
}

#[tokio::test]
async fn test_boxed_transport() -> anyhow::Result<()> {
    let (left, right) = InMemoryTransport::pair();
    let mut left: Box<dyn Transport> = Box::new(left);
    let mut right: Box<dyn Transport> = Box::new(right);
    left.send(Message::Error { reason: "x".into() }).await?;
    assert_eq!(right.recv().await?, Message::Error { reason: "x".into() });
    Ok(())
}
