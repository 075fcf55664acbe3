//! In-process bus and registry, for tests and running without Redis.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{AppResult, BusError};
use crate::models::presence::{distinct_user_ids, PresenceMember};
use crate::repositories::{EventBus, PresenceRegistry};

/// Records every accepted publish as a `(topic, message)` pair.
#[derive(Default)]
pub struct MemoryBus {
    published: Mutex<Vec<(String, String)>>,
    attempts: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes to any of `topics` fail with [`BusError::Rejected`].
    pub fn failing_on<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: topics.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub async fn published(&self) -> Vec<(String, String)> {
        self.published.lock().await.clone()
    }

    /// Every topic a publish was attempted on, failed ones included.
    pub async fn attempts(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), BusError> {
        self.attempts.lock().await.push(topic.to_string());
        if self.failing.contains(topic) {
            return Err(BusError::Rejected(format!("topic {} unavailable", topic)));
        }
        self.published
            .lock()
            .await
            .push((topic.to_string(), message.to_string()));
        debug!(topic = %topic, "published to memory bus");
        Ok(())
    }
}

/// Channel -> connection id -> member.
#[derive(Default)]
pub struct MemoryRegistry {
    channels: RwLock<HashMap<String, Vec<PresenceMember>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, channel: &str, member: PresenceMember) {
        let mut channels = self.channels.write().await;
        let members = channels.entry(channel.to_string()).or_default();
        members.retain(|m| m.socket_id != member.socket_id);
        members.push(member);
    }

    pub async fn leave(&self, channel: &str, socket_id: &str) {
        let mut channels = self.channels.write().await;
        if let Some(members) = channels.get_mut(channel) {
            members.retain(|m| m.socket_id != socket_id);
            if members.is_empty() {
                channels.remove(channel);
            }
        }
    }
}

#[async_trait]
impl PresenceRegistry for MemoryRegistry {
    async fn occupied_channels(&self) -> AppResult<Vec<String>> {
        Ok(self.channels.read().await.keys().cloned().collect())
    }

    async fn connection_ids(&self, channel: &str) -> AppResult<HashSet<String>> {
        Ok(self
            .channels
            .read()
            .await
            .get(channel)
            .map(|members| members.iter().map(|m| m.socket_id.clone()).collect())
            .unwrap_or_default())
    }

    async fn subscribers(&self, channel: &str) -> AppResult<Vec<String>> {
        Ok(self
            .channels
            .read()
            .await
            .get(channel)
            .map(|members| distinct_user_ids(members))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_bus_records_and_fails_by_topic() {
        let bus = MemoryBus::failing_on(["down"]);
        bus.publish("up", "m1").await.unwrap();
        assert!(matches!(
            bus.publish("down", "m2").await,
            Err(BusError::Rejected(_))
        ));
        assert_eq!(bus.published().await, vec![("up".to_string(), "m1".to_string())]);
        assert_eq!(bus.attempts().await, vec!["up", "down"]);
    }

    #[tokio::test]
    async fn test_memory_registry_tracks_join_and_leave() {
        let registry = MemoryRegistry::new();
        registry.join("room", PresenceMember::new("alice", "1.1")).await;
        registry.join("room", PresenceMember::new("alice", "1.2")).await;
        assert_eq!(registry.connection_ids("room").await.unwrap().len(), 2);
        assert_eq!(registry.subscribers("room").await.unwrap(), vec!["alice"]);

        registry.leave("room", "1.1").await;
        registry.leave("room", "1.2").await;
        assert!(registry.occupied_channels().await.unwrap().is_empty());
        assert!(registry.subscribers("room").await.unwrap().is_empty());
    }
}
