use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::chats::dto::{
    ChatResponse, ChatSummary, CreateChatRequest, Pagination, UpdateChatRequest,
};
use crate::chats::services;
use crate::error::AppResult;
use crate::state::AppState;
use crate::users::extract::SessionUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats).post(create_chat))
        .route(
            "/chats/:id",
            get(get_chat).put(update_chat).delete(delete_chat),
        )
        .route("/chats/:id/members", get(list_members).post(join_chat))
}

#[instrument(skip(state))]
async fn list_chats(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<ChatSummary>>> {
    let chats = services::list_chats(&state, p.limit, p.offset).await?;
    Ok(Json(chats.into_iter().map(ChatSummary::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create_chat(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(payload): Json<CreateChatRequest>,
) -> AppResult<(StatusCode, Json<ChatResponse>)> {
    let chat = services::create_chat(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(chat.into())))
}

#[instrument(skip(state))]
async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ChatResponse>> {
    let chat = services::get_chat(&state, id).await?;
    Ok(Json(chat.into()))
}

#[instrument(skip(state, payload))]
async fn update_chat(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let chat = services::update_chat(&state, user_id, id, payload).await?;
    Ok(Json(chat.into()))
}

#[instrument(skip(state))]
async fn delete_chat(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    services::delete_chat(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Raw member ids, in insertion order.
#[instrument(skip(state))]
async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<i64>>> {
    Ok(Json(services::list_members(&state, id).await?))
}

#[instrument(skip(state))]
async fn join_chat(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<i64>>> {
    let chat = services::join_chat(&state, user_id, id).await?;
    Ok(Json(chat.members))
}
