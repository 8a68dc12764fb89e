//! Message transports between a client and the gateway.

use crate::protocol::Message;

/// A bidirectional, ordered message channel.
///
/// `recv` must be cancel-safe: the gateway polls it inside `tokio::select!`
/// next to the session's event stream.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Message>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        (**self).send(msg).await
    }

    async fn recv(&mut self) -> anyhow::Result<Message> {
        (**self).recv().await
    }
}

pub mod in_memory;
pub mod tcp;
