//! Presence member records as the delivery subsystem stores them in the registry.

use serde::{Deserialize, Serialize};

/// Stored presence member, one per connection (`socket_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceMember {
    pub user_id: String,
    #[serde(default)]
    pub user_info: Option<serde_json::Value>,
    pub socket_id: String,
}

impl PresenceMember {
    pub fn new(user_id: impl Into<String>, socket_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_info: None,
            socket_id: socket_id.into(),
        }
    }
}

/// Distinct user ids in first-seen order. One user may hold several connections.
pub fn distinct_user_ids<'a, I>(members: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a PresenceMember>,
{
    let mut seen = std::collections::HashSet::new();
    let mut ids = Vec::new();
    for member in members {
        if seen.insert(member.user_id.as_str()) {
            ids.push(member.user_id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_user_ids_collapses_connections() {
        let members = vec![
            PresenceMember::new("alice", "1.1"),
            PresenceMember::new("bob", "1.2"),
            PresenceMember::new("alice", "1.3"),
        ];
        assert_eq!(distinct_user_ids(&members), vec!["alice", "bob"]);
    }

    #[test]
    fn test_member_decodes_without_user_info() {
        let m: PresenceMember =
            serde_json::from_str(r#"{"user_id":"u","socket_id":"1.2"}"#).unwrap();
        assert!(m.user_info.is_none());
    }
}
