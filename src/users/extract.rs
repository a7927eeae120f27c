use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;

pub const USER_ID_KEY: &str = "user_id";

/// Extracts the authenticated profile id from the session.
pub struct SessionUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;

        let user_id = session
            .get::<i64>(USER_ID_KEY)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Login required.".into()))?;

        Ok(SessionUser(user_id))
    }
}
