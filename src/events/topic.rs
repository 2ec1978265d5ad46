//! Event topic - fans events out to registered subscribers.
//!
//! The topic is split in two: an `EventTopic` handle used to register,
//! publish, and shut down from any thread, and a `TopicPump` that does the
//! fan-out and is meant to be spawned onto the event loop.

use std::collections::HashMap;

use tokio::sync::mpsc;

use super::types::MeshEvent;
use crate::error::{MeshloopError, Result};

enum TopicCommand {
    Register(String, mpsc::Sender<MeshEvent>),
    Unregister(String),
    Publish(MeshEvent),
    Shutdown,
}

/// Counters reported when the pump exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicStats {
    /// Events handed to a subscriber channel
    pub delivered: u64,
    /// Events skipped because a subscriber's channel was full
    pub dropped: u64,
}

/// Handle for publishing to and subscribing on a topic. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventTopic {
    commands: mpsc::UnboundedSender<TopicCommand>,
    capacity: usize,
}

impl EventTopic {
    /// Create a topic whose subscribers buffer up to `capacity` events each.
    pub fn new(capacity: usize) -> (Self, TopicPump) {
        let (commands, rx) = mpsc::unbounded_channel();
        let topic = Self {
            commands,
            capacity: capacity.max(1),
        };
        let pump = TopicPump {
            commands: rx,
            subscribers: HashMap::new(),
            stats: TopicStats::default(),
        };
        (topic, pump)
    }

    /// Register a subscriber under `id`, replacing any previous one.
    pub fn register(&self, id: impl Into<String>) -> Result<mpsc::Receiver<MeshEvent>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.send(TopicCommand::Register(id.into(), tx))?;
        Ok(rx)
    }

    pub fn unregister(&self, id: impl Into<String>) -> Result<()> {
        self.send(TopicCommand::Unregister(id.into()))
    }

    pub fn publish(&self, event: impl Into<MeshEvent>) -> Result<()> {
        self.send(TopicCommand::Publish(event.into()))
    }

    /// Ask the pump to exit after the commands already queued.
    pub fn shutdown(&self) -> Result<()> {
        self.send(TopicCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: TopicCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| MeshloopError::InvalidState("event topic is shut down".to_string()))
    }
}

/// Fan-out side of a topic.
pub struct TopicPump {
    commands: mpsc::UnboundedReceiver<TopicCommand>,
    subscribers: HashMap<String, mpsc::Sender<MeshEvent>>,
    stats: TopicStats,
}

impl TopicPump {
    /// Process commands until shutdown or until every `EventTopic` is dropped.
    ///
    /// A full subscriber never blocks the pump: the event is dropped for
    /// that subscriber and a warning logged. Closed subscribers are removed.
    pub async fn run(mut self) -> TopicStats {
        while let Some(command) = self.commands.recv().await {
            match command {
                TopicCommand::Register(id, tx) => {
                    log::debug!("Subscriber [{}] registered", id);
                    self.subscribers.insert(id, tx);
                }
                TopicCommand::Unregister(id) => {
                    if self.subscribers.remove(&id).is_some() {
                        log::debug!("Subscriber [{}] unregistered", id);
                    }
                }
                TopicCommand::Publish(event) => self.fan_out(event),
                TopicCommand::Shutdown => break,
            }
        }
        self.commands.close();
        log::debug!(
            "Event topic stopped: {} delivered, {} dropped",
            self.stats.delivered,
            self.stats.dropped
        );
        self.stats
    }

    fn fan_out(&mut self, event: MeshEvent) {
        let mut closed = Vec::new();
        for (id, tx) in &self.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => self.stats.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("Subscriber [{}] is full, dropping {} event", id, event.kind());
                    self.stats.dropped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id.clone()),
            }
        }
        for id in closed {
            log::debug!("Subscriber [{}] went away", id);
            self.subscribers.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{ContextEvent, RouterEvent, RouterStatus};

    fn router_event(name: &str) -> RouterEvent {
        RouterEvent {
            name: name.to_string(),
            address: format!("tls:{}:443", name),
            version: None,
            status: RouterStatus::Connected,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let (topic, pump) = EventTopic::new(8);
        let pump = tokio::spawn(pump.run());

        let mut ui = topic.register("ui").unwrap();
        let mut metrics = topic.register("metrics").unwrap();
        topic.publish(ContextEvent::ok()).unwrap();
        topic.shutdown().unwrap();

        let stats = pump.await.unwrap();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.dropped, 0);
        assert!(ui.recv().await.unwrap().as_context().is_some());
        assert!(metrics.recv().await.unwrap().as_context().is_some());
    }

    #[tokio::test]
    async fn test_full_subscriber_drops_instead_of_blocking() {
        let (topic, pump) = EventTopic::new(1);
        let pump = tokio::spawn(pump.run());

        let mut slow = topic.register("slow").unwrap();
        topic.publish(router_event("first")).unwrap();
        topic.publish(router_event("second")).unwrap();
        topic.shutdown().unwrap();

        let stats = pump.await.unwrap();
        assert_eq!(stats, TopicStats { delivered: 1, dropped: 1 });

        let received = slow.recv().await.unwrap();
        assert_eq!(received.as_router().unwrap().name, "first");
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let (topic, pump) = EventTopic::new(4);
        let pump = tokio::spawn(pump.run());

        let mut sub = topic.register("sub").unwrap();
        topic.unregister("sub").unwrap();
        topic.publish(ContextEvent::ok()).unwrap();
        topic.shutdown().unwrap();

        let stats = pump.await.unwrap();
        assert_eq!(stats.delivered, 0);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_removed() {
        let (topic, pump) = EventTopic::new(4);
        let pump = tokio::spawn(pump.run());

        let sub = topic.register("gone").unwrap();
        drop(sub);
        topic.publish(ContextEvent::ok()).unwrap();
        topic.publish(ContextEvent::ok()).unwrap();
        topic.shutdown().unwrap();

        let stats = pump.await.unwrap();
        assert_eq!(stats, TopicStats::default());
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_fails() {
        let (topic, pump) = EventTopic::new(4);
        topic.shutdown().unwrap();
        pump.run().await;

        assert!(topic.is_closed());
        let err = topic.publish(ContextEvent::ok()).unwrap_err();
        assert!(err.to_string().contains("shut down"));
    }

    #[tokio::test]
    async fn test_pump_exits_when_handles_dropped() {
        let (topic, pump) = EventTopic::new(4);
        drop(topic);
        let stats = pump.run().await;
        assert_eq!(stats, TopicStats::default());
    }
}
