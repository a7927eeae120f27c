use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use time::OffsetDateTime;

use crate::users::token::{FreshToken, TokenKind, TokenRow};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: String,
    pub email_confirmed: bool,
    pub date_joined: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrivacySettings {
    pub profile_id: i64,
    pub show_username: bool,
    pub show_email: bool,
    pub show_date_joined: bool,
}

const PROFILE_COLUMNS: &str =
    "id, username, email, password_hash, avatar, email_confirmed, date_joined";

impl Profile {
    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Case-insensitive lookup by username or email.
    pub async fn find_by_username_or_email(
        db: &PgPool,
        query: &str,
    ) -> sqlx::Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles \
             WHERE lower(username) = lower($1) OR lower(email) = lower($1)"
        ))
        .bind(query)
        .fetch_optional(db)
        .await
    }

    /// Registration write: the profile, its privacy settings and its
    /// email-verification token are created in one transaction.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        verification: &FreshToken,
    ) -> sqlx::Result<Profile> {
        let mut tx = db.begin().await?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (username, email, password_hash) \
             VALUES ($1, $2, $3) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO privacy_settings (profile_id) VALUES ($1)")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;

        insert_token(
            &mut *tx,
            TokenKind::EmailVerification,
            profile.id,
            verification,
        )
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    pub async fn update_password(db: &PgPool, id: i64, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE profiles SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn update_avatar(db: &PgPool, id: i64, avatar: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE profiles SET avatar = $2 WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Consume a verification token: confirm the email and delete the row
    /// as one unit.
    pub async fn confirm_email(db: &PgPool, id: i64) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;
        sqlx::query("UPDATE profiles SET email_confirmed = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        delete_token(&mut *tx, TokenKind::EmailVerification, id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Consume a recovery token: force-confirm the email if still pending,
    /// drop the recovery row and store the new hash, atomically. A reset
    /// must not leave the token consumed without the password changed.
    pub async fn apply_password_reset(
        db: &PgPool,
        id: i64,
        new_password_hash: &str,
    ) -> sqlx::Result<()> {
        let mut tx = db.begin().await?;
        sqlx::query("UPDATE profiles SET email_confirmed = TRUE, password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(new_password_hash)
            .execute(&mut *tx)
            .await?;
        delete_token(&mut *tx, TokenKind::EmailVerification, id).await?;
        delete_token(&mut *tx, TokenKind::PasswordRecovery, id).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl PrivacySettings {
    pub async fn for_profile(db: &PgPool, profile_id: i64) -> sqlx::Result<Option<PrivacySettings>> {
        sqlx::query_as::<_, PrivacySettings>(
            "SELECT profile_id, show_username, show_email, show_date_joined \
             FROM privacy_settings WHERE profile_id = $1",
        )
        .bind(profile_id)
        .fetch_optional(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        profile_id: i64,
        show_username: bool,
        show_email: bool,
        show_date_joined: bool,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE privacy_settings \
             SET show_username = $2, show_email = $3, show_date_joined = $4 \
             WHERE profile_id = $1",
        )
        .bind(profile_id)
        .bind(show_username)
        .bind(show_email)
        .bind(show_date_joined)
        .execute(db)
        .await?;
        Ok(())
    }
}

impl TokenKind {
    fn table(self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "email_verifications",
            TokenKind::PasswordRecovery => "password_recoveries",
        }
    }
}

pub async fn find_token_for_profile(
    db: &PgPool,
    kind: TokenKind,
    profile_id: i64,
) -> sqlx::Result<Option<TokenRow>> {
    sqlx::query_as::<_, TokenRow>(&format!(
        "SELECT profile_id, token, created_at, expires_at FROM {} WHERE profile_id = $1",
        kind.table()
    ))
    .bind(profile_id)
    .fetch_optional(db)
    .await
}

/// Lookup by exact token value.
pub async fn find_token_by_value(
    db: &PgPool,
    kind: TokenKind,
    value: &str,
) -> sqlx::Result<Option<TokenRow>> {
    sqlx::query_as::<_, TokenRow>(&format!(
        "SELECT profile_id, token, created_at, expires_at FROM {} WHERE token = $1",
        kind.table()
    ))
    .bind(value)
    .fetch_optional(db)
    .await
}

pub async fn insert_token<'e>(
    exec: impl PgExecutor<'e>,
    kind: TokenKind,
    profile_id: i64,
    fresh: &FreshToken,
) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (profile_id, token, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        kind.table()
    ))
    .bind(profile_id)
    .bind(&fresh.value)
    .bind(fresh.created_at)
    .bind(fresh.expires_at)
    .execute(exec)
    .await?;
    Ok(())
}

/// Re-issue an existing row in place: new value, restarted window.
pub async fn refresh_token(
    db: &PgPool,
    kind: TokenKind,
    profile_id: i64,
    fresh: &FreshToken,
) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "UPDATE {} SET token = $2, created_at = $3, expires_at = $4 WHERE profile_id = $1",
        kind.table()
    ))
    .bind(profile_id)
    .bind(&fresh.value)
    .bind(fresh.created_at)
    .bind(fresh.expires_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_token<'e>(
    exec: impl PgExecutor<'e>,
    kind: TokenKind,
    profile_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE profile_id = $1",
        kind.table()
    ))
    .bind(profile_id)
    .execute(exec)
    .await?;
    Ok(())
}
