use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: i64,
    /// Nulled when the owning profile is deleted; the chat survives.
    pub owner_id: Option<i64>,
    pub moderators: Vec<i64>,
    pub members: Vec<i64>,
    pub label: String,
    pub description: Option<String>,
    /// Unique "@"-prefixed slug, immutable after creation.
    pub name: String,
    pub avatar: String,
    pub created_at: OffsetDateTime,
}

const CHAT_COLUMNS: &str =
    "id, owner_id, moderators, members, label, description, name, avatar, created_at";

impl Chat {
    /// Sole mutator of the member list: appends iff absent, preserving
    /// the position of the first add. In-memory only; persist with
    /// [`Chat::save_members`].
    pub fn add_member(&mut self, user_id: i64) {
        if !self.members.contains(&user_id) {
            self.members.push(user_id);
        }
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Chat>> {
        sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_name(db: &PgPool, name: &str) -> sqlx::Result<Option<Chat>> {
        sqlx::query_as::<_, Chat>(&format!("SELECT {CHAT_COLUMNS} FROM chats WHERE name = $1"))
            .bind(name)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<Chat>> {
        sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Chats the profile owns or is a member of.
    pub async fn list_for_profile(db: &PgPool, profile_id: i64) -> sqlx::Result<Vec<Chat>> {
        sqlx::query_as::<_, Chat>(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats \
             WHERE owner_id = $1 OR $1 = ANY(members) \
             ORDER BY created_at DESC"
        ))
        .bind(profile_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        owner_id: i64,
        label: &str,
        description: Option<&str>,
        name: &str,
        avatar: Option<&str>,
    ) -> sqlx::Result<Chat> {
        sqlx::query_as::<_, Chat>(&format!(
            "INSERT INTO chats (owner_id, label, description, name, avatar) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'chats_avatars/default_chat_avatar.png')) \
             RETURNING {CHAT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(label)
        .bind(description)
        .bind(name)
        .bind(avatar)
        .fetch_one(db)
        .await
    }

    pub async fn update_details(
        db: &PgPool,
        id: i64,
        label: &str,
        description: Option<&str>,
        avatar: &str,
    ) -> sqlx::Result<Chat> {
        sqlx::query_as::<_, Chat>(&format!(
            "UPDATE chats SET label = $2, description = $3, avatar = $4 \
             WHERE id = $1 RETURNING {CHAT_COLUMNS}"
        ))
        .bind(id)
        .bind(label)
        .bind(description)
        .bind(avatar)
        .fetch_one(db)
        .await
    }

    pub async fn save_members(&self, db: &PgPool) -> sqlx::Result<()> {
        sqlx::query("UPDATE chats SET members = $2 WHERE id = $1")
            .bind(self.id)
            .bind(&self.members)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn chat() -> Chat {
        Chat {
            id: 1,
            owner_id: Some(10),
            moderators: vec![],
            members: vec![],
            label: "Test Chat".into(),
            description: None,
            name: "@chat1".into(),
            avatar: "chats_avatars/default_chat_avatar.png".into(),
            created_at: datetime!(2024-03-01 12:00 UTC),
        }
    }

    #[test]
    fn add_member_is_idempotent() {
        let mut c = chat();
        c.add_member(42);
        c.add_member(42);
        assert_eq!(c.members, vec![42]);
    }

    #[test]
    fn add_member_preserves_first_add_position() {
        let mut c = chat();
        c.add_member(1);
        c.add_member(2);
        c.add_member(3);
        c.add_member(1);
        c.add_member(2);
        assert_eq!(c.members, vec![1, 2, 3]);
    }
}
