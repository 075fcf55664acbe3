//! Channel occupancy: read-only pass-through to the presence registry.

use std::sync::Arc;

use crate::error::AppResult;
use crate::repositories::PresenceRegistry;

#[derive(Clone)]
pub struct OccupancyService {
    registry: Arc<dyn PresenceRegistry>,
}

impl OccupancyService {
    pub fn new(registry: Arc<dyn PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// Occupied channel names, sorted.
    pub async fn occupied_channels(&self) -> AppResult<Vec<String>> {
        let mut channels = self.registry.occupied_channels().await?;
        channels.sort();
        channels.dedup();
        Ok(channels)
    }

    pub async fn user_count(&self, channel: &str) -> AppResult<usize> {
        Ok(self.registry.connection_ids(channel).await?.len())
    }

    /// `None` when the registry reports nobody.
    pub async fn users(&self, channel: &str) -> AppResult<Option<Vec<String>>> {
        let users = self.registry.subscribers(channel).await?;
        Ok(if users.is_empty() { None } else { Some(users) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presence::PresenceMember;
    use crate::repositories::MemoryRegistry;

    #[tokio::test]
    async fn test_reports_counts_and_users() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.join("room1", PresenceMember::new("alice", "1.1")).await;
        registry.join("room1", PresenceMember::new("bob", "1.2")).await;
        registry.join("lobby", PresenceMember::new("carol", "1.3")).await;
        let occupancy = OccupancyService::new(registry);

        assert_eq!(occupancy.occupied_channels().await.unwrap(), vec!["lobby", "room1"]);
        assert_eq!(occupancy.user_count("room1").await.unwrap(), 2);
        assert_eq!(
            occupancy.users("room1").await.unwrap(),
            Some(vec!["alice".to_string(), "bob".to_string()])
        );
    }

    #[tokio::test]
    async fn test_empty_channel_has_no_users() {
        let occupancy = OccupancyService::new(Arc::new(MemoryRegistry::new()));
        assert_eq!(occupancy.user_count("nobody").await.unwrap(), 0);
        assert_eq!(occupancy.users("nobody").await.unwrap(), None);
    }
}
