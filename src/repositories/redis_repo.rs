//! Redis pub/sub for event publication and presence lookups.

use std::collections::HashSet;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, BusError};
use crate::models::presence::{distinct_user_ids, PresenceMember};
use crate::repositories::{EventBus, PresenceRegistry};

/// Connection-id SET per channel, written by the delivery subsystem.
pub const PRESENCE_SET_PREFIX: &str = "notif:presence:";
/// Connection-id -> member JSON HASH per channel.
pub const PRESENCE_HASH_PREFIX: &str = "notif:presence_hash:";

const SCAN_BATCH: usize = 200;

fn presence_set_key(channel: &str) -> String {
    format!("{}{}", PRESENCE_SET_PREFIX, channel)
}

fn presence_hash_key(channel: &str) -> String {
    format!("{}{}", PRESENCE_HASH_PREFIX, channel)
}

/// Redis-backed bus and registry. Cloning shares one multiplexed connection.
#[derive(Clone)]
pub struct RedisRepository {
    conn: ConnectionManager,
}

impl RedisRepository {
    /// Connect to Redis. The manager reconnects on its own after failures.
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl EventBus for RedisRepository {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let receivers: u64 = conn.publish(topic, message).await?;
        debug!(topic = %topic, receivers, "published");
        Ok(())
    }
}

#[async_trait]
impl PresenceRegistry for RedisRepository {
    async fn occupied_channels(&self) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", PRESENCE_SET_PREFIX);
        let mut channels = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            channels.extend(
                keys.iter()
                    .filter_map(|k| k.strip_prefix(PRESENCE_SET_PREFIX))
                    .map(str::to_string),
            );
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(channels)
    }

    async fn connection_ids(&self, channel: &str) -> AppResult<HashSet<String>> {
        let mut conn = self.conn.clone();
        let ids: HashSet<String> = conn.smembers(presence_set_key(channel)).await?;
        Ok(ids)
    }

    async fn subscribers(&self, channel: &str) -> AppResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.hvals(presence_hash_key(channel)).await?;
        let mut members = Vec::with_capacity(raw.len());
        for data in raw {
            match serde_json::from_str::<PresenceMember>(&data) {
                Ok(member) => members.push(member),
                Err(e) => warn!(channel = %channel, error = %e, "skipping unreadable presence member"),
            }
        }
        Ok(distinct_user_ids(&members))
    }
}
