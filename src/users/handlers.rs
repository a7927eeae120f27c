use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::chats::dto::ChatSummary;
use crate::chats::repo::Chat;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::dto::{
    AvatarRequest, ChangePasswordRequest, LoginRequest, MeResponse, MessageResponse,
    PrivacyUpdateRequest, ProfileDetails, RecoveryRequest, RegisterRequest, ResendQuery,
    ResetPasswordRequest,
};
use crate::users::extract::SessionUser;
use crate::users::repo::{PrivacySettings, Profile};
use crate::users::services;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/emailverification/:token", get(confirm_email))
        .route("/auth/resend-confirmation", get(resend_confirmation))
        .route("/auth/password-recovery", post(request_recovery))
        .route("/auth/password-recovery/:token", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/me/privacy", put(update_privacy))
        .route("/me/password", post(change_password))
        .route("/me/avatar", put(update_avatar))
        .route("/profiles/:id", get(profile_details))
}

impl From<Profile> for MeResponse {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            email: p.email,
            avatar: p.avatar,
            email_confirmed: p.email_confirmed,
            date_joined: p.date_joined,
        }
    }
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "We sent email confirmation link to your email box. \
             (Don't forget to check spam box)",
        )),
    ))
}

#[instrument(skip(state, session, payload))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<MeResponse>> {
    let profile = services::login(&state, &session, payload).await?;
    Ok(Json(profile.into()))
}

#[instrument(skip(session))]
async fn logout(SessionUser(_): SessionUser, session: Session) -> AppResult<StatusCode> {
    services::logout(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    services::confirm_email(&state, &token).await?;
    Ok(Json(MessageResponse::new(
        "Email successfully confirmed, now you can login.",
    )))
}

#[instrument(skip(state, query))]
async fn resend_confirmation(
    State(state): State<AppState>,
    Query(query): Query<ResendQuery>,
) -> AppResult<Redirect> {
    // Both parameters are required, whoever the user is.
    let (Some(redirect_to), Some(username)) = (query.redirect_to, query.username) else {
        return Err(AppError::NotFound("Page does not exist.".into()));
    };

    services::resend_confirmation(&state, &username).await?;
    Ok(Redirect::to(&redirect_to))
}

#[instrument(skip(state, session, payload))]
async fn request_recovery(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RecoveryRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::request_recovery(&state, &session, &payload.email).await?;
    Ok(Json(MessageResponse::new(
        "Now check your email for password recovery message.",
    )))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::reset_password(&state, &token, &payload.new_password).await?;
    Ok(Json(MessageResponse::new(
        "Password changed. You can login now.",
    )))
}

async fn current_profile(state: &AppState, user_id: i64) -> AppResult<Profile> {
    Profile::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Login required.".into()))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> AppResult<Json<MeResponse>> {
    let profile = current_profile(&state, user_id).await?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state, payload))]
async fn update_privacy(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(payload): Json<PrivacyUpdateRequest>,
) -> AppResult<Json<MessageResponse>> {
    PrivacySettings::update(
        &state.db,
        user_id,
        payload.show_username,
        payload.show_email,
        payload.show_date_joined,
    )
    .await?;
    Ok(Json(MessageResponse::new("Form successfully saved.")))
}

#[instrument(skip(state, payload))]
async fn change_password(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let profile = current_profile(&state, user_id).await?;
    services::change_password(&state, &profile, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Password changed. You can login now.",
    )))
}

#[instrument(skip(state, payload))]
async fn update_avatar(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Json(payload): Json<AvatarRequest>,
) -> AppResult<Json<MessageResponse>> {
    Profile::update_avatar(&state.db, user_id, &payload.avatar).await?;
    Ok(Json(MessageResponse::new("Avatar updated.")))
}

#[instrument(skip(state))]
async fn profile_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProfileDetails>> {
    let profile = Profile::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Page does not exist.".into()))?;

    let privacy = PrivacySettings::for_profile(&state.db, profile.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("profile {} has no privacy settings", profile.id))?;

    let chats = Chat::list_for_profile(&state.db, profile.id)
        .await?
        .into_iter()
        .map(ChatSummary::from)
        .collect();

    Ok(Json(ProfileDetails {
        id: profile.id,
        avatar: profile.avatar.clone(),
        info: services::public_info(&profile, &privacy),
        chats,
    }))
}
