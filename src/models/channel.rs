//! Channel naming rules and the occupancy responses.

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Longest accepted channel name.
pub const MAX_CHANNEL_NAME_LEN: usize = 200;

/// Pusher-style names: `[A-Za-z0-9_\-=@,.;]`, 1 to 200 characters.
pub fn validate_channel_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::InvalidChannel("empty channel name".to_string()));
    }
    if name.len() > MAX_CHANNEL_NAME_LEN {
        return Err(AppError::InvalidChannel(format!(
            "channel name longer than {} characters",
            MAX_CHANNEL_NAME_LEN
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_-=@,.;".contains(c);
    if !name.chars().all(allowed) {
        return Err(AppError::InvalidChannel(name.to_string()));
    }
    Ok(())
}

/// `GET /apps/:app_id/channels`
#[derive(Debug, Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<String>,
}

/// `GET /apps/:app_id/channels/:channel_id`
#[derive(Debug, Serialize)]
pub struct ChannelInfoResponse {
    pub user_count: usize,
}

/// `GET /apps/:app_id/channels/:channel_id/users`. `users` is `null` when nobody is subscribed.
#[derive(Debug, Serialize)]
pub struct ChannelUsersResponse {
    pub users: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_pusher_channel_names() {
        assert!(validate_channel_name("room1").is_ok());
        assert!(validate_channel_name("presence-chat").is_ok());
        assert!(validate_channel_name("private-user=1@a,b.c;d_e").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_oversized_names() {
        assert!(validate_channel_name("").is_err());
        assert!(validate_channel_name(&"a".repeat(MAX_CHANNEL_NAME_LEN)).is_ok());
        assert!(validate_channel_name(&"a".repeat(MAX_CHANNEL_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        assert!(validate_channel_name("room 1").is_err());
        assert!(validate_channel_name("room/1").is_err());
        assert!(validate_channel_name("ròom").is_err());
    }

    #[test]
    fn test_empty_users_serialize_as_null() {
        let json = serde_json::to_string(&ChannelUsersResponse { users: None }).unwrap();
        assert_eq!(json, r#"{"users":null}"#);
    }
}
