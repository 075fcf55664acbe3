//! Backends the gateway talks to: the pub/sub bus and the presence registry.

pub mod memory;
pub mod redis_repo;

pub use memory::{MemoryBus, MemoryRegistry};
pub use redis_repo::RedisRepository;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{AppResult, BusError};

/// Outbound pub/sub bus. Must accept concurrent publishes from independent requests.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `message` on `topic`. Succeeds with zero subscribers.
    async fn publish(&self, topic: &str, message: &str) -> Result<(), BusError>;
}

/// Read-only view of which connections and users occupy which channels.
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    async fn occupied_channels(&self) -> AppResult<Vec<String>>;
    async fn connection_ids(&self, channel: &str) -> AppResult<HashSet<String>>;
    async fn subscribers(&self, channel: &str) -> AppResult<Vec<String>>;
}
