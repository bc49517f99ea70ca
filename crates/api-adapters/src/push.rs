//! In-process push hub.
//!
//! Stands in for the hosted pub/sub service: named channels backed by tokio
//! broadcast senders, created lazily on first subscribe. A channel whose
//! subscribers have all gone is dropped on the next publish to it.

use dashmap::DashMap;
use domains::{PushChannel, PushEvent};
use tokio::sync::broadcast;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub struct InProcessPushHub {
    channels: DashMap<String, broadcast::Sender<PushEvent>>,
    capacity: usize,
}

impl Default for InProcessPushHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl InProcessPushHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<PushEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Delivers `event` to every current subscriber of `channel`. Returns how
    /// many received it; zero when nobody is listening.
    pub fn publish(&self, channel: &str, event: PushEvent) -> usize {
        let name = event.name();
        let sender = self.channels.get(channel).map(|tx| tx.clone());
        match sender.map(|tx| tx.send(event)) {
            Some(Ok(delivered)) => {
                tracing::debug!(channel, event = name, delivered, "push event published");
                delivered
            }
            Some(Err(_)) => {
                self.channels.remove_if(channel, |_, tx| tx.receiver_count() == 0);
                tracing::debug!(channel, event = name, "push channel has no subscribers, dropped");
                0
            }
            None => {
                tracing::trace!(channel, event = name, "push event dropped, no subscribers");
                0
            }
        }
    }

    /// Number of channels currently held open.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

impl PushChannel for InProcessPushHub {
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<PushEvent> {
        self.sender(channel).subscribe()
    }
}
