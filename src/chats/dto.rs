use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::chats::repo::Chat;

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub label: String,
    pub description: Option<String>,
    /// Slug, at most 50 characters; stored with an "@" prefix.
    pub name: String,
    pub avatar: Option<String>,
}

/// Partial update; `name` may be sent but must match the stored name.
#[derive(Debug, Deserialize)]
pub struct UpdateChatRequest {
    pub label: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: i64,
    pub owner: Option<i64>,
    pub label: String,
    pub description: Option<String>,
    pub name: String,
    pub avatar: String,
    pub created_at: OffsetDateTime,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            owner: chat.owner_id,
            label: chat.label,
            description: chat.description,
            name: chat.name,
            avatar: chat.avatar,
            created_at: chat.created_at,
        }
    }
}

/// Compact listing entry, also embedded in profile pages.
#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub id: i64,
    pub label: String,
    pub name: String,
    pub avatar: String,
}

impl From<Chat> for ChatSummary {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            label: chat.label,
            name: chat.name,
            avatar: chat.avatar,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    16
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn chat_response_carries_prefixed_name() {
        let chat = Chat {
            id: 3,
            owner_id: Some(10),
            moderators: vec![],
            members: vec![10, 11],
            label: "Test Chat".into(),
            description: Some("words".into()),
            name: "@chat1".into(),
            avatar: "chats_avatars/default_chat_avatar.png".into(),
            created_at: datetime!(2024-03-01 12:00 UTC),
        };
        let json = serde_json::to_string(&ChatResponse::from(chat)).unwrap();
        assert!(json.contains("\"@chat1\""));
        // The member list is a dedicated sub-resource, not part of this payload.
        assert!(!json.contains("members"));
    }
}
