use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::chats::dto::{CreateChatRequest, UpdateChatRequest};
use crate::chats::repo::Chat;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const NAME_MAX_LENGTH: usize = 50;
pub const LABEL_MAX_LENGTH: usize = 70;
pub const DESCRIPTION_MAX_LENGTH: usize = 200;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[\w-]+$").unwrap();
}

/// Validate the requested chat name and apply the "@" prefix. The
/// prefix is applied exactly once, at creation; a leading "@" in the
/// input is tolerated.
pub fn normalize_name(raw: &str) -> AppResult<String> {
    let bare = raw.trim().trim_start_matches('@');
    if bare.is_empty() || !SLUG_RE.is_match(bare) {
        return Err(AppError::Validation(
            "Enter a valid name consisting of letters, numbers, underscores or hyphens.".into(),
        ));
    }
    if bare.len() > NAME_MAX_LENGTH {
        return Err(AppError::Validation(
            "Ensure name has at most 50 characters.".into(),
        ));
    }
    Ok(format!("@{bare}"))
}

pub fn validate_label(label: &str) -> AppResult<()> {
    if label.split_whitespace().next().is_none() {
        return Err(AppError::Validation("Field is empty.".into()));
    }
    if label.len() > LABEL_MAX_LENGTH {
        return Err(AppError::Validation(
            "Ensure label has at most 70 characters.".into(),
        ));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> AppResult<()> {
    if let Some(d) = description {
        if d.len() > DESCRIPTION_MAX_LENGTH {
            return Err(AppError::Validation(
                "Ensure description has at most 200 characters.".into(),
            ));
        }
    }
    Ok(())
}

/// The name is immutable for every actor once the chat exists. A
/// request may repeat the current name; anything else is rejected.
pub fn ensure_name_unchanged(current: &str, requested: &str) -> AppResult<()> {
    let requested = requested.trim();
    let matches_current =
        requested == current || requested.trim_start_matches('@') == current.trim_start_matches('@');
    if matches_current {
        Ok(())
    } else {
        Err(AppError::Validation("Name cannot be changed.".into()))
    }
}

fn ensure_owner(chat: &Chat, actor: i64) -> AppResult<()> {
    if chat.owner_id == Some(actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the chat owner can do that.".into(),
        ))
    }
}

async fn load(state: &AppState, id: i64) -> AppResult<Chat> {
    Chat::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found.".into()))
}

pub async fn create_chat(
    state: &AppState,
    owner_id: i64,
    req: CreateChatRequest,
) -> AppResult<Chat> {
    validate_label(&req.label)?;
    validate_description(req.description.as_deref())?;
    let name = normalize_name(&req.name)?;

    if Chat::find_by_name(&state.db, &name).await?.is_some() {
        return Err(AppError::Validation(
            "Chat with this name already exists.".into(),
        ));
    }

    let chat = Chat::create(
        &state.db,
        owner_id,
        req.label.trim(),
        req.description.as_deref(),
        &name,
        req.avatar.as_deref(),
    )
    .await?;
    info!(chat_id = chat.id, name = %chat.name, owner_id, "chat created");
    Ok(chat)
}

pub async fn get_chat(state: &AppState, id: i64) -> AppResult<Chat> {
    load(state, id).await
}

pub async fn list_chats(state: &AppState, limit: i64, offset: i64) -> AppResult<Vec<Chat>> {
    Ok(Chat::list(&state.db, limit.clamp(1, 100), offset.max(0)).await?)
}

/// Owner-only edit of label/description/avatar. The name check runs
/// first so a change attempt is rejected the same way for every actor.
pub async fn update_chat(
    state: &AppState,
    actor: i64,
    id: i64,
    req: UpdateChatRequest,
) -> AppResult<Chat> {
    let chat = load(state, id).await?;

    if let Some(name) = req.name.as_deref() {
        ensure_name_unchanged(&chat.name, name)?;
    }
    ensure_owner(&chat, actor)?;

    let label = req.label.as_deref().unwrap_or(&chat.label);
    validate_label(label)?;
    let description = req.description.as_deref().or(chat.description.as_deref());
    validate_description(description)?;
    let avatar = req.avatar.as_deref().unwrap_or(&chat.avatar);

    Ok(Chat::update_details(&state.db, id, label.trim(), description, avatar).await?)
}

pub async fn delete_chat(state: &AppState, actor: i64, id: i64) -> AppResult<()> {
    let chat = load(state, id).await?;
    ensure_owner(&chat, actor)?;
    Chat::delete(&state.db, id).await?;
    info!(chat_id = id, actor, "chat deleted");
    Ok(())
}

/// Idempotent self-join: mutate the in-memory list, then persist.
pub async fn join_chat(state: &AppState, profile_id: i64, id: i64) -> AppResult<Chat> {
    let mut chat = load(state, id).await?;
    chat.add_member(profile_id);
    chat.save_members(&state.db).await?;
    Ok(chat)
}

/// The member list verbatim: raw ids, original order, no enrichment.
pub async fn list_members(state: &AppState, id: i64) -> AppResult<Vec<i64>> {
    Ok(load(state, id).await?.members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_gets_prefixed_once() {
        assert_eq!(normalize_name("chat1").unwrap(), "@chat1");
        assert_eq!(normalize_name("@chat1").unwrap(), "@chat1");
        assert_eq!(normalize_name("test_chat").unwrap(), "@test_chat");
    }

    #[test]
    fn name_rejects_bad_slugs() {
        assert!(normalize_name("").is_err());
        assert!(normalize_name("@").is_err());
        assert!(normalize_name("has spaces").is_err());
        assert!(normalize_name("semi;colon").is_err());
        assert!(normalize_name(&"a".repeat(51)).is_err());
        assert!(normalize_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn blank_label_is_rejected() {
        let err = validate_label("   ").unwrap_err();
        assert_eq!(err.to_string(), "Field is empty.");
        let err = validate_label("").unwrap_err();
        assert_eq!(err.to_string(), "Field is empty.");
        assert!(validate_label("Test Chat").is_ok());
    }

    #[test]
    fn label_length_boundary() {
        assert!(validate_label(&"a".repeat(70)).is_ok());
        assert!(validate_label(&"a".repeat(71)).is_err());
    }

    #[test]
    fn description_length_boundary() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some(&"d".repeat(200))).is_ok());
        assert!(validate_description(Some(&"d".repeat(201))).is_err());
    }

    #[test]
    fn name_is_immutable() {
        assert!(ensure_name_unchanged("@chat1", "@chat1").is_ok());
        assert!(ensure_name_unchanged("@chat1", "chat1").is_ok());
        let err = ensure_name_unchanged("@chat1", "@chat2").unwrap_err();
        assert_eq!(err.to_string(), "Name cannot be changed.");
    }
}
