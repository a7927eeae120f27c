use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::mail::{confirmation_email, recovery_email, OutgoingEmail};
use crate::state::AppState;
use crate::users::dto::{LoginRequest, PublicInfo, RegisterRequest};
use crate::users::extract::USER_ID_KEY;
use crate::users::password::{hash_password, verify_password};
use crate::users::repo::{self, PrivacySettings, Profile};
use crate::users::token::{self, TokenKind};
use crate::users::validate::{
    no_such_user_message, validate_email, validate_password, validate_username,
};

/// Sentinel shown in place of fields the profile chose to hide.
pub const HIDDEN: &str = "Hidden";

/// Create the profile in the unconfirmed state and dispatch the
/// confirmation mail. Profile, privacy settings and verification token
/// are written in one transaction; the mail is fire-and-forget.
pub async fn register(state: &AppState, mut req: RegisterRequest) -> AppResult<Profile> {
    req.email = req.email.trim().to_lowercase();

    validate_username(&req.username)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    if Profile::find_by_username_or_email(&state.db, &req.username)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "A user with that username already exists.".into(),
        ));
    }
    if Profile::find_by_username_or_email(&state.db, &req.email)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "User with this Email already exists.".into(),
        ));
    }

    let hash = hash_password(&req.password)?;
    let verification = token::issue();
    let profile = Profile::create(&state.db, &req.username, &req.email, &hash, &verification).await?;

    info!(profile_id = profile.id, username = %profile.username, "profile registered");
    dispatch(
        state,
        confirmation_email(&state.config.base_url, &profile.email, &verification.value),
    )
    .await;

    Ok(profile)
}

/// Session login, gated on a confirmed email.
pub async fn login(state: &AppState, session: &Session, req: LoginRequest) -> AppResult<Profile> {
    let profile = Profile::find_by_username_or_email(&state.db, &req.username)
        .await?
        .ok_or_else(|| AppError::NotFound(no_such_user_message(&req.username)))?;

    if !verify_password(&req.password, &profile.password_hash)? {
        return Err(AppError::Unauthorized("Enter correct password.".into()));
    }

    if !profile.email_confirmed {
        return Err(AppError::EmailNotConfirmed {
            resend: resend_confirmation_link(&profile.username),
        });
    }

    session.insert(USER_ID_KEY, profile.id).await?;
    info!(profile_id = profile.id, "logged in");
    Ok(profile)
}

pub async fn logout(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// Consume an email-verification token: grant login and delete the row.
/// An expired token is left in place so it can still be refreshed.
pub async fn confirm_email(state: &AppState, token_value: &str) -> AppResult<()> {
    let row = repo::find_token_by_value(&state.db, TokenKind::EmailVerification, token_value).await?;
    let row = token::check(row, TokenKind::EmailVerification, OffsetDateTime::now_utc())?;

    Profile::confirm_email(&state.db, row.profile_id).await?;
    info!(profile_id = row.profile_id, "email confirmed");
    Ok(())
}

/// Refresh the verification token and redispatch the confirmation mail.
/// Only applicable while the profile is still unconfirmed.
pub async fn resend_confirmation(state: &AppState, username: &str) -> AppResult<()> {
    let profile = Profile::find_by_username_or_email(&state.db, username)
        .await?
        .ok_or_else(|| AppError::NotFound(no_such_user_message(username)))?;

    let pending =
        repo::find_token_for_profile(&state.db, TokenKind::EmailVerification, profile.id).await?;
    if pending.is_none() {
        return Err(AppError::NotApplicable("Email already confirmed.".into()));
    }

    let fresh = token::issue();
    repo::refresh_token(&state.db, TokenKind::EmailVerification, profile.id, &fresh).await?;
    dispatch(
        state,
        confirmation_email(&state.config.base_url, &profile.email, &fresh.value),
    )
    .await;
    Ok(())
}

/// Start (or restart) a password recovery and dispatch the recovery
/// mail. The caller's session is terminated before the lookup, whoever
/// they were logged in as.
pub async fn request_recovery(
    state: &AppState,
    session: &Session,
    identifier: &str,
) -> AppResult<()> {
    session.flush().await?;

    let profile = Profile::find_by_username_or_email(&state.db, identifier)
        .await?
        .ok_or_else(|| AppError::NotFound(no_such_user_message(identifier)))?;

    let fresh = token::issue();
    let existing =
        repo::find_token_for_profile(&state.db, TokenKind::PasswordRecovery, profile.id).await?;
    if existing.is_some() {
        repo::refresh_token(&state.db, TokenKind::PasswordRecovery, profile.id, &fresh).await?;
    } else {
        repo::insert_token(&state.db, TokenKind::PasswordRecovery, profile.id, &fresh).await?;
    }

    info!(profile_id = profile.id, "password recovery requested");
    dispatch(
        state,
        recovery_email(&state.config.base_url, &profile.email, &fresh.value),
    )
    .await;
    Ok(())
}

/// Complete a recovery: consume the token, force-confirm the email if
/// still pending and store the new password hash as one unit.
pub async fn reset_password(
    state: &AppState,
    token_value: &str,
    new_password: &str,
) -> AppResult<()> {
    let row = repo::find_token_by_value(&state.db, TokenKind::PasswordRecovery, token_value).await?;
    let row = token::check(row, TokenKind::PasswordRecovery, OffsetDateTime::now_utc())?;

    validate_password(new_password)?;

    let hash = hash_password(new_password)?;
    Profile::apply_password_reset(&state.db, row.profile_id, &hash).await?;
    info!(profile_id = row.profile_id, "password reset completed");
    Ok(())
}

/// Authenticated password change; requires the current password.
pub async fn change_password(
    state: &AppState,
    profile: &Profile,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    if !verify_password(old_password, &profile.password_hash)? {
        return Err(AppError::Unauthorized("Enter correct password.".into()));
    }
    validate_password(new_password)?;

    let hash = hash_password(new_password)?;
    Profile::update_password(&state.db, profile.id, &hash).await?;
    Ok(())
}

/// Map each privacy flag to the real value or the hidden sentinel.
pub fn public_info(profile: &Profile, privacy: &PrivacySettings) -> PublicInfo {
    let shown = |flag: bool, value: String| if flag { value } else { HIDDEN.to_owned() };
    PublicInfo {
        username: shown(privacy.show_username, profile.username.clone()),
        email: shown(privacy.show_email, profile.email.clone()),
        date_joined: shown(
            privacy.show_date_joined,
            profile
                .date_joined
                .format(&Rfc3339)
                .unwrap_or_else(|_| profile.date_joined.to_string()),
        ),
    }
}

pub fn resend_confirmation_link(username: &str) -> String {
    format!("/auth/resend-confirmation?redirect_to=/auth/login&username={username}")
}

async fn dispatch(state: &AppState, mail: OutgoingEmail) {
    // Delivery failure never rolls back the state transition.
    if let Err(e) = state.mailer.send(mail).await {
        warn!(error = %e, "mail dispatch failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn profile() -> Profile {
        Profile {
            id: 7,
            username: "temp2".into(),
            email: "temp2@mail.com".into(),
            password_hash: "x".into(),
            avatar: "user_avatars/default_user_avatar.png".into(),
            email_confirmed: false,
            date_joined: datetime!(2024-03-01 12:00 UTC),
        }
    }

    fn privacy(show_username: bool, show_email: bool, show_date_joined: bool) -> PrivacySettings {
        PrivacySettings {
            profile_id: 7,
            show_username,
            show_email,
            show_date_joined,
        }
    }

    #[test]
    fn public_info_shows_allowed_fields() {
        let info = public_info(&profile(), &privacy(true, true, true));
        assert_eq!(info.username, "temp2");
        assert_eq!(info.email, "temp2@mail.com");
        assert_eq!(info.date_joined, "2024-03-01T12:00:00Z");
    }

    #[test]
    fn public_info_hides_cleared_flags() {
        let info = public_info(&profile(), &privacy(true, false, false));
        assert_eq!(info.username, "temp2");
        assert_eq!(info.email, HIDDEN);
        assert_eq!(info.date_joined, HIDDEN);

        let info = public_info(&profile(), &privacy(false, false, false));
        assert_eq!(
            info,
            PublicInfo {
                username: HIDDEN.into(),
                email: HIDDEN.into(),
                date_joined: HIDDEN.into(),
            }
        );
    }

    #[test]
    fn resend_link_carries_redirect_and_username() {
        assert_eq!(
            resend_confirmation_link("temp2"),
            "/auth/resend-confirmation?redirect_to=/auth/login&username=temp2"
        );
    }
}
