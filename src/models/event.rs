//! Event envelope forwarded to the bus and the HTTP publish payload.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{AppError, AppResult};
use crate::models::channel::validate_channel_name;

/// Event record published on a channel topic.
///
/// `data` is carried as raw JSON and written back unchanged. Absent optional
/// fields are left out of the serialized form.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope<'a> {
    pub event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a RawValue>,
    pub channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<&'a str>,
}

impl<'a> EventEnvelope<'a> {
    /// An empty `socket_id` counts as absent.
    pub fn new(
        channel: &'a str,
        event: &'a str,
        data: Option<&'a RawValue>,
        socket_id: Option<&'a str>,
    ) -> Self {
        Self {
            event,
            data,
            channel,
            socket_id: socket_id.filter(|id| !id.is_empty()),
        }
    }

    /// Compact JSON, fields in `event`, `data`, `channel`, `socket_id` order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Wrap raw request text as a JSON string value.
pub fn text_data(text: &str) -> Result<Box<RawValue>, serde_json::Error> {
    serde_json::value::to_raw_value(text)
}

/// Body of `POST /apps/:app_id/events`.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub name: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
    #[serde(default)]
    pub channels: Option<Vec<String>>,
    /// Single-channel form, used when `channels` is absent.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub socket_id: Option<String>,
}

impl PublishRequest {
    /// Channels to publish to, validated. Duplicates are kept.
    pub fn target_channels(&self) -> AppResult<Vec<String>> {
        let channels = match (&self.channels, &self.channel) {
            (Some(list), _) => list.clone(),
            (None, Some(single)) => vec![single.clone()],
            (None, None) => Vec::new(),
        };
        if channels.is_empty() {
            return Err(AppError::MalformedRequest("no channels given".to_string()));
        }
        for channel in &channels {
            validate_channel_name(channel)?;
        }
        if self.name.is_empty() {
            return Err(AppError::MalformedRequest("event name is empty".to_string()));
        }
        Ok(channels)
    }
}
