//! The transport seam: publish/subscribe over the logical channels.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use credo_core::errors::CredoResult;

use crate::channel::Channel;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Publish/subscribe transport over the four logical channels.
///
/// Implementations carry raw strings; envelope encoding happens above this
/// trait so the transport stays oblivious to message semantics.
pub trait MessageBus: Send + Sync {
    /// Publish a message, returning how many subscribers received it.
    fn publish(&self, channel: Channel, message: String) -> CredoResult<usize>;

    /// Subscribe to a channel.
    fn subscribe(&self, channel: Channel) -> BusReceiver;
}

/// Receiving half of a channel subscription.
pub struct BusReceiver {
    receiver: broadcast::Receiver<String>,
    channel: Channel,
}

impl BusReceiver {
    /// Receive the next message.
    ///
    /// Returns `None` once the bus is gone. A lagged subscriber skips the
    /// overwritten messages and keeps receiving.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(channel = %self.channel, lagged = count, "subscriber lagged");
                }
            }
        }
    }

    /// Receive without waiting; `None` when nothing is buffered.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    debug!(channel = %self.channel, lagged = count, "subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

/// In-process bus over `tokio::sync::broadcast`.
///
/// Suitable for tests and single-process deployments; a distributed
/// deployment implements `MessageBus` over its own pub/sub fabric.
pub struct InMemoryBus {
    senders: HashMap<Channel, broadcast::Sender<String>>,
}

impl InMemoryBus {
    /// Create a bus with the default per-channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given per-channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let senders = Channel::ALL
            .into_iter()
            .map(|c| {
                let (tx, _) = broadcast::channel(capacity);
                (c, tx)
            })
            .collect();
        Self { senders }
    }

    /// Shared handle for handing to multiple components.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.senders[&channel].receiver_count()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for InMemoryBus {
    fn publish(&self, channel: Channel, message: String) -> CredoResult<usize> {
        match self.senders[&channel].send(message) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                // No subscribers; the message is dropped.
                debug!(channel = %channel, "message dropped, no subscribers");
                Ok(0)
            }
        }
    }

    fn subscribe(&self, channel: Channel) -> BusReceiver {
        BusReceiver {
            receiver: self.senders[&channel].subscribe(),
            channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_messages_reach_subscribers() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe(Channel::NetworkToEngine);

        let receivers = bus
            .publish(Channel::NetworkToEngine, "hello".to_string())
            .unwrap();
        assert_eq!(receivers, 1);
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let bus = InMemoryBus::new();
        let mut host_rx = bus.subscribe(Channel::EngineToHost);

        bus.publish(Channel::EngineToNetwork, "peer traffic".to_string())
            .unwrap();
        bus.publish(Channel::EngineToHost, "verdict".to_string())
            .unwrap();

        assert_eq!(host_rx.recv().await.as_deref(), Some("verdict"));
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = InMemoryBus::new();
        let receivers = bus
            .publish(Channel::EngineToNetwork, "nobody home".to_string())
            .unwrap();
        assert_eq!(receivers, 0);
    }
}
