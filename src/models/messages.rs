use serde::{Deserialize, Serialize};
use crate::models::ActiveUser;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdateMessage {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TitleUpdateMessage {
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActiveUsersMessage {
    pub users: Vec<ActiveUser>,
}

/// Socket envelope shared by both directions.
///
/// ```text
/// { "type": "content_update", "content": "<string>" }
/// { "type": "title_update",   "title":   "<string>" }
/// { "type": "active_users",   "users":   [ <user>, ... ] }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SyncMessage {
    #[serde(rename = "content_update")]
    ContentUpdate(ContentUpdateMessage),
    #[serde(rename = "title_update")]
    TitleUpdate(TitleUpdateMessage),
    #[serde(rename = "active_users")]
    ActiveUsers(ActiveUsersMessage),
}

impl SyncMessage {
    pub fn content_update(content: impl Into<String>) -> Self {
        SyncMessage::ContentUpdate(ContentUpdateMessage { content: content.into() })
    }

    pub fn title_update(title: impl Into<String>) -> Self {
        SyncMessage::TitleUpdate(TitleUpdateMessage { title: title.into() })
    }

    pub fn active_users(users: Vec<ActiveUser>) -> Self {
        SyncMessage::ActiveUsers(ActiveUsersMessage { users })
    }

    /// Wire name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::ContentUpdate(_) => "content_update",
            SyncMessage::TitleUpdate(_) => "title_update",
            SyncMessage::ActiveUsers(_) => "active_users",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_content_update_wire_shape() {
        let json = SyncMessage::content_update("Hello").encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "content_update");
        assert_eq!(value["content"], "Hello");
    }

    #[test]
    fn test_decode_title_update() {
        let msg = SyncMessage::decode(r#"{"type":"title_update","title":"Draft"}"#).unwrap();
        assert_eq!(msg, SyncMessage::title_update("Draft"));
        assert_eq!(msg.kind(), "title_update");
    }

    #[test]
    fn test_active_users_carries_roster() {
        let user = ActiveUser {
            session_id: Uuid::new_v4(),
            user_id: "u-1".to_string(),
            name: Some("Asha".to_string()),
            attached_at: Utc::now(),
        };
        let json = SyncMessage::active_users(vec![user.clone()]).encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "active_users");
        assert_eq!(value["users"][0]["userId"], "u-1");
        assert_eq!(value["users"][0]["sessionId"], user.session_id.to_string());
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        assert!(SyncMessage::decode("not json").is_err());
        assert!(SyncMessage::decode(r#"{"content":"no type"}"#).is_err());
        assert!(SyncMessage::decode(r#"{"type":"cursor_move","x":1}"#).is_err());
        assert!(SyncMessage::decode(r#"{"type":"content_update"}"#).is_err());
    }
}
