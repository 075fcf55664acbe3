//! Event publication: one envelope per channel, handed to the bus.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::value::RawValue;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, AppResult, BusError};
use crate::models::event::EventEnvelope;
use crate::repositories::EventBus;

/// Builds envelopes and forwards them to the bus, bounded by a per-publish timeout.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
    timeout: Duration,
}

/// Per-channel outcome of a multi-channel publish.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, BusError)>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// `Ok` only if every channel reached the bus.
    pub fn ensure_delivered(&self) -> AppResult<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(AppError::Publish {
            failed: self.failed.iter().map(|(c, _)| c.clone()).collect(),
            attempted: self.attempted(),
        })
    }
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    /// Publish one event on `channel`. Zero subscribers is still success.
    pub async fn publish(
        &self,
        channel: &str,
        event: &str,
        data: Option<&RawValue>,
        socket_id: Option<&str>,
    ) -> Result<(), BusError> {
        let payload = EventEnvelope::new(channel, event, data, socket_id).to_json()?;
        tokio::time::timeout(self.timeout, self.bus.publish(channel, &payload))
            .await
            .map_err(|_| BusError::Timeout(self.timeout))??;
        debug!(channel = %channel, event = %event, bytes = payload.len(), "event published");
        Ok(())
    }

    /// Publish to every channel, concurrently. A failure on one channel never
    /// stops the others; succeeded publishes are not rolled back.
    #[instrument(skip(self, channels, data, socket_id), fields(channels = channels.len()))]
    pub async fn publish_all(
        &self,
        channels: &[String],
        event: &str,
        data: Option<&RawValue>,
        socket_id: Option<&str>,
    ) -> PublishReport {
        let outcomes = join_all(channels.iter().map(|channel| async move {
            let outcome = self.publish(channel, event, data, socket_id).await;
            (channel.clone(), outcome)
        }))
        .await;

        let mut report = PublishReport::default();
        for (channel, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered.push(channel),
                Err(e) => {
                    warn!(channel = %channel, event = %event, error = %e, "publish failed");
                    report.failed.push((channel, e));
                }
            }
        }
        report
    }
}
